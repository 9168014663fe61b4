//! # MarketMind Core
//!
//! The "Brain" of MarketMind - the agent catalog, the generation client,
//! project state and the orchestration that turns one marketing goal into a
//! full campaign.
//!
//! ## Architecture
//!
//! - `agents/` - Marketing personas and the fixed orchestration order
//! - `generation/` - Generation client contract and the Gemini implementation
//! - `models` - Model and sampling configuration
//! - `state/` - Projects, the persisted project store and export
//! - `swarm/` - Global command orchestration and per-agent chat
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marketmind_core::{agents::AgentRegistry, generation::GeminiClient, models::ModelConfig};
//! use marketmind_core::state::{MarketDb, ProjectStore};
//! use marketmind_core::swarm::Orchestrator;
//!
//! let store = Arc::new(ProjectStore::open(Arc::new(MarketDb::open()?)));
//! let orchestrator = Orchestrator::new(
//!     Arc::new(AgentRegistry::default()),
//!     Arc::new(GeminiClient::new(ModelConfig::from_env(), ModelConfig::api_key_from_env())),
//!     store,
//! );
//! let report = orchestrator.run_global_command("Launch eBook X").await;
//! ```

pub mod agents;
pub mod generation;
pub mod models;
pub mod state;
pub mod swarm;
