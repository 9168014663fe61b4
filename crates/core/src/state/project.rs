//! # Projects
//!
//! A project ties one marketing goal to the per-agent outputs and the chat
//! history produced for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::AgentId;

/// Characters of the goal kept in a project name
const NAME_GOAL_CHARS: usize = 30;

/// Lifecycle of a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Draft,
    InProgress,
    Completed,
    Error,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Who authored a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
    System,
}

/// An entry in a project's chat history or the global command log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4()),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            agent_id: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }

    pub fn agent(agent_id: AgentId, text: impl Into<String>) -> Self {
        Self::new(Sender::Agent, text).with_agent(agent_id)
    }

    pub fn with_agent(mut self, agent_id: AgentId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }
}

/// The latest artifact an agent produced for a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    pub agent_id: AgentId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A marketing campaign project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub goal: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// At most one entry per agent id
    #[serde(default)]
    pub outputs: Vec<AgentOutput>,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

impl Project {
    /// A fresh in-progress project whose history records the goal
    pub fn new(goal: &str) -> Self {
        let now = Utc::now();
        Self {
            id: format!("proj-{}", Uuid::now_v7()),
            name: project_name(goal),
            goal: goal.to_string(),
            status: ProjectStatus::InProgress,
            created_at: now,
            updated_at: now,
            outputs: Vec::new(),
            chat_history: vec![ChatMessage::user(format!("Global Command: {}", goal))],
        }
    }

    pub fn output(&self, agent_id: AgentId) -> Option<&AgentOutput> {
        self.outputs.iter().find(|o| o.agent_id == agent_id)
    }

    /// Replace the agent's output in place, or append it
    pub fn upsert_output(&mut self, agent_id: AgentId, content: impl Into<String>) {
        let content = content.into();
        let timestamp = Utc::now();
        match self.outputs.iter_mut().find(|o| o.agent_id == agent_id) {
            Some(existing) => {
                existing.content = content;
                existing.timestamp = timestamp;
            }
            None => self.outputs.push(AgentOutput {
                agent_id,
                content,
                timestamp,
            }),
        }
    }
}

/// `Campaign for "<first 30 chars>..."`
pub fn project_name(goal: &str) -> String {
    let truncated: String = goal.chars().take(NAME_GOAL_CHARS).collect();
    format!("Campaign for \"{}...\"", truncated)
}

/// Whether two goals name the same run.
///
/// Raw string equality. Whitespace or casing variants do not match.
pub fn goals_match(a: &str, b: &str) -> bool {
    a == b
}
