//! # HTTP API
//!
//! Route handlers grouped by resource. Each submodule exposes `routes()`
//! for nesting under `/api/v1`.

pub mod command;
pub mod projects;
pub mod settings;

use axum::{http::StatusCode, Json};
use marketmind_core::agents::{AgentId, AgentRegistry};
use marketmind_core::state::{ChatMessage, Sender};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Error body for non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

pub fn not_found(what: &str, id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("{} not found: {}", what, id))
}

/// Parse an agent id path segment, case-insensitively
pub fn parse_agent(raw: &str) -> Result<AgentId, ApiError> {
    raw.parse()
        .map_err(|e: marketmind_core::agents::UnknownAgentId| {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        })
}

/// A chat or command log entry
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    /// user, agent or system
    pub sender: String,
    pub text: String,
    pub timestamp: String,
    pub agent_id: Option<String>,
    pub agent_name: Option<String>,
}

impl MessageResponse {
    pub fn from_message(message: &ChatMessage, registry: &AgentRegistry) -> Self {
        let sender = match message.sender {
            Sender::User => "user",
            Sender::Agent => "agent",
            Sender::System => "system",
        };
        Self {
            id: message.id.clone(),
            sender: sender.to_string(),
            text: message.text.clone(),
            timestamp: message.timestamp.to_rfc3339(),
            agent_id: message.agent_id.map(|a| a.to_string()),
            agent_name: message
                .agent_id
                .and_then(|a| registry.lookup(a))
                .map(|p| p.name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent() {
        assert_eq!(parse_agent("email-editor").unwrap(), AgentId::EmailEditor);
        let (status, body) = parse_agent("HYPE_MAN").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("HYPE_MAN"));
    }

    #[test]
    fn test_message_response_names_agent() {
        let registry = AgentRegistry::default();
        let message = ChatMessage::agent(AgentId::Copywriter, "Ad Copywriter responded.");
        let response = MessageResponse::from_message(&message, &registry);
        assert_eq!(response.sender, "agent");
        assert_eq!(response.agent_id.as_deref(), Some("COPYWRITER"));
        assert_eq!(response.agent_name.as_deref(), Some("Ad Copywriter"));

        let system = MessageResponse::from_message(&ChatMessage::system("hi"), &registry);
        assert!(system.agent_id.is_none());
        assert!(system.agent_name.is_none());
    }
}
