//! # Swarm Orchestration
//!
//! Coordinates the marketing team for MarketMind.
//!
//! ## Run Flow
//!
//! ```text
//! Goal → Strategist → Copywriter → Social Media → Email Editor → Lead Magnet
//! ```
//!
//! Each agent sees the goal plus everything produced before it. Chat and
//! regeneration reuse the same store and generator outside of a run.

pub mod chat;
pub mod context;
pub mod coordinator;
pub mod events;
pub mod pipeline;

pub use chat::{conversation, AgentChat, ChatError, ChatTurn};
pub use context::AccumulatedContext;
pub use coordinator::{CommandLog, Orchestrator, RunReport};
pub use events::{RunEvent, RunEventKind};
pub use pipeline::{Pipeline, RunState};
