//! # Marketing Agents
//!
//! The persona catalog used by the orchestrator and the per-agent chat.
//!
//! ```text
//! Strategist → Copywriter → Social Media Consultant → Email Editor → Lead Magnet Creator
//! ```
//!
//! Funnel Expert and Video Scripter are registered but sit outside the
//! automatic sequence.

pub mod prompts;
pub mod registry;

pub use registry::{AgentId, AgentProfile, AgentRegistry, UnknownAgentId};
