//! # Run Events
//!
//! Progress notifications streamed while a global command runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::AgentId;

/// Kind of run event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// A project was created or reused and the first step is about to start
    RunStarted,
    /// An agent was asked for its output
    AgentStarted,
    /// An agent's output was stored
    AgentCompleted,
    /// Every agent in the order contributed
    RunCompleted,
    /// Generation unavailable or no project could be created
    RunAborted,
    /// Cancelled between steps
    RunCancelled,
}

/// An event in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: RunEventKind,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub agent: Option<AgentId>,
    /// Human-readable log line matching the command log entry
    pub message: String,
}

impl RunEvent {
    pub fn new(kind: RunEventKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            project_id: None,
            agent: None,
            message: message.into(),
        }
    }

    pub fn with_project(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    pub fn with_agent(mut self, agent: AgentId) -> Self {
        self.agent = Some(agent);
        self
    }
}
