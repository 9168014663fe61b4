//! # Command API
//!
//! Global command runs, the command log, the agent catalog and the live
//! event stream.

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::{api_error, ApiError, ApiResponse, MessageResponse};
use crate::state::{RunStatus, SharedState};

/// Heartbeat interval for idle SSE connections
const HEARTBEAT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommandRequest {
    /// The marketing goal to run through the team
    pub goal: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    /// Position in the orchestration order, if the agent is part of it
    pub order: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AgentsResponse {
    pub agents: Vec<AgentInfo>,
    pub orchestration_order: Vec<String>,
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/agents", get(list_agents))
        .route("/command", post(start_command))
        .route("/command/stop", post(stop_command))
        .route("/command/log", get(command_log))
        .route("/events", get(events))
}

/// Get run status and generation availability
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "command",
    responses(
        (status = 200, description = "Current run status", body = RunStatus)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<RunStatus> {
    let mut status = state.run_status.read().await.clone();
    status.generation_available = state.engine().await.is_available();
    Json(status)
}

/// List registered agents and the orchestration order
#[utoipa::path(
    get,
    path = "/api/v1/agents",
    tag = "command",
    responses(
        (status = 200, description = "Agent catalog", body = AgentsResponse)
    )
)]
pub async fn list_agents(State(state): State<SharedState>) -> Json<AgentsResponse> {
    let registry = &state.registry;
    let agents = registry
        .agents()
        .iter()
        .map(|p| AgentInfo {
            id: p.id.to_string(),
            name: p.name.to_string(),
            description: p.description.to_string(),
            color: p.color.to_string(),
            order: registry.position(p.id),
        })
        .collect();
    Json(AgentsResponse {
        agents,
        orchestration_order: registry
            .orchestration_order()
            .iter()
            .map(|id| id.to_string())
            .collect(),
    })
}

/// Start a global command in the background
#[utoipa::path(
    post,
    path = "/api/v1/command",
    tag = "command",
    request_body = CommandRequest,
    responses(
        (status = 202, description = "Run started", body = ApiResponse),
        (status = 400, description = "Empty goal", body = super::ErrorResponse),
        (status = 409, description = "A run is already in progress", body = super::ErrorResponse)
    )
)]
pub async fn start_command(
    State(state): State<SharedState>,
    Json(req): Json<CommandRequest>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let goal = req.goal.trim().to_string();
    if goal.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Goal must not be empty"));
    }

    let token = CancellationToken::new();
    {
        let mut slot = state.cancel.write().await;
        if slot.is_some() {
            return Err(api_error(
                StatusCode::CONFLICT,
                "A global command is already running",
            ));
        }
        *slot = Some(token.clone());
    }
    {
        let mut status = state.run_status.write().await;
        status.status = "running".to_string();
        status.active_agent = None;
    }

    tracing::info!(goal = %goal, "Starting global command");

    let engine = state.engine().await;
    let run_state = state.clone();
    let run_goal = goal.clone();
    tokio::spawn(async move {
        let report = engine
            .orchestrator
            .run_global_command_with(&run_goal, token)
            .await;
        tracing::info!(outcome = ?report.outcome, "Global command finished");
        *run_state.cancel.write().await = None;
    });

    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::ok(format!("Global command started: {}", goal)),
    ))
}

/// Cancel the in-flight run at the next step boundary
#[utoipa::path(
    post,
    path = "/api/v1/command/stop",
    tag = "command",
    responses(
        (status = 200, description = "Cancellation requested", body = ApiResponse)
    )
)]
pub async fn stop_command(State(state): State<SharedState>) -> Json<ApiResponse> {
    match state.cancel.read().await.as_ref() {
        Some(token) => {
            token.cancel();
            ApiResponse::ok("Cancellation requested")
        }
        None => Json(ApiResponse {
            success: false,
            message: "No global command is running".to_string(),
        }),
    }
}

/// The global command log, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/command/log",
    tag = "command",
    responses(
        (status = 200, description = "Command log entries", body = Vec<MessageResponse>)
    )
)]
pub async fn command_log(State(state): State<SharedState>) -> Json<Vec<MessageResponse>> {
    let entries = state
        .command_log
        .entries()
        .iter()
        .map(|m| MessageResponse::from_message(m, &state.registry))
        .collect();
    Json(entries)
}

/// SSE endpoint for run events with heartbeat
pub async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match tokio::time::timeout(HEARTBEAT, rx.recv()).await {
                Ok(Ok(event)) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    return Some((Ok(Event::default().event("run").data(json)), rx));
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "SSE subscriber lagged");
                    continue;
                }
                Ok(Err(RecvError::Closed)) => return None,
                Err(_) => return Some((Ok(Event::default().comment("heartbeat")), rx)),
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
