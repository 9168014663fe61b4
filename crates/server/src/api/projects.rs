//! # Projects API
//!
//! Browse, select and delete projects; edit, regenerate and chat about
//! individual agent outputs; export a project as text.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use marketmind_core::agents::AgentRegistry;
use marketmind_core::state::{export_file_name, export_text, ordered_outputs, Project};
use marketmind_core::swarm::{conversation, ChatError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{api_error, not_found, parse_agent, ApiError, ApiResponse, MessageResponse};
use crate::state::SharedState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub goal: String,
    pub status: String,
    pub updated_at: String,
    pub output_count: usize,
    pub active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OutputResponse {
    pub agent_id: String,
    pub agent_name: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub goal: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    /// In orchestration order
    pub outputs: Vec<OutputResponse>,
    pub chat_history: Vec<MessageResponse>,
}

impl ProjectResponse {
    pub fn from_project(project: &Project, registry: &AgentRegistry) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            goal: project.goal.clone(),
            status: project.status.as_str().to_string(),
            created_at: project.created_at.to_rfc3339(),
            updated_at: project.updated_at.to_rfc3339(),
            outputs: ordered_outputs(project, registry)
                .into_iter()
                .map(|o| OutputResponse {
                    agent_id: o.agent_id.to_string(),
                    agent_name: registry.display_name(o.agent_id, "Unknown Agent").to_string(),
                    content: o.content.clone(),
                    timestamp: o.timestamp.to_rfc3339(),
                })
                .collect(),
            chat_history: project
                .chat_history
                .iter()
                .map(|m| MessageResponse::from_message(m, registry))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    /// `null` clears the selection
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditOutputRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatTurnResponse {
    pub user_message: MessageResponse,
    pub reply: MessageResponse,
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_projects))
        .route("/active", get(get_active_project).put(set_active_project))
        .route("/:id", get(get_project).delete(delete_project))
        .route("/:id/outputs/:agent", put(edit_output))
        .route("/:id/outputs/:agent/regenerate", post(regenerate_output))
        .route("/:id/chat/:agent", get(get_conversation).post(send_chat))
        .route("/:id/export", get(export_project))
}

fn project_response(state: &SharedState, project: &Project) -> Json<ProjectResponse> {
    Json(ProjectResponse::from_project(project, &state.registry))
}

/// List projects, newest first
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "projects",
    responses(
        (status = 200, description = "All projects", body = Vec<ProjectSummary>)
    )
)]
pub async fn list_projects(State(state): State<SharedState>) -> Json<Vec<ProjectSummary>> {
    let active_id = state.store.active_project().map(|p| p.id);
    let projects = state
        .store
        .projects()
        .into_iter()
        .map(|p| ProjectSummary {
            active: active_id.as_deref() == Some(p.id.as_str()),
            id: p.id,
            name: p.name,
            goal: p.goal,
            status: p.status.as_str().to_string(),
            updated_at: p.updated_at.to_rfc3339(),
            output_count: p.outputs.len(),
        })
        .collect();
    Json(projects)
}

/// Get one project with its outputs and chat history
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project", body = ProjectResponse),
        (status = 404, description = "Project not found", body = super::ErrorResponse)
    )
)]
pub async fn get_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project = state.store.get(&id).ok_or_else(|| not_found("Project", &id))?;
    Ok(project_response(&state, &project))
}

/// Delete a project
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project deleted", body = ApiResponse),
        (status = 404, description = "Project not found", body = super::ErrorResponse)
    )
)]
pub async fn delete_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    if !state.store.delete_project(&id) {
        return Err(not_found("Project", &id));
    }
    Ok(ApiResponse::ok(format!("Deleted project {}", id)))
}

/// Get the active project
#[utoipa::path(
    get,
    path = "/api/v1/projects/active",
    tag = "projects",
    responses(
        (status = 200, description = "Active project", body = ProjectResponse),
        (status = 404, description = "No active project", body = super::ErrorResponse)
    )
)]
pub async fn get_active_project(
    State(state): State<SharedState>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project = state
        .store
        .active_project()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No active project"))?;
    Ok(project_response(&state, &project))
}

/// Select or clear the active project
#[utoipa::path(
    put,
    path = "/api/v1/projects/active",
    tag = "projects",
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Selection updated", body = ApiResponse),
        (status = 404, description = "Project not found", body = super::ErrorResponse)
    )
)]
pub async fn set_active_project(
    State(state): State<SharedState>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let id = req.project_id.as_deref();
    if !state.store.set_active(id) {
        return Err(not_found("Project", id.unwrap_or_default()));
    }
    Ok(ApiResponse::ok(match id {
        Some(id) => format!("Active project: {}", id),
        None => "Active project cleared".to_string(),
    }))
}

/// Replace an agent's output with edited content
#[utoipa::path(
    put,
    path = "/api/v1/projects/{id}/outputs/{agent}",
    tag = "projects",
    params(
        ("id" = String, Path, description = "Project ID"),
        ("agent" = String, Path, description = "Agent ID")
    ),
    request_body = EditOutputRequest,
    responses(
        (status = 200, description = "Updated project", body = ProjectResponse),
        (status = 400, description = "Unknown agent", body = super::ErrorResponse),
        (status = 404, description = "Project not found", body = super::ErrorResponse)
    )
)]
pub async fn edit_output(
    State(state): State<SharedState>,
    Path((id, agent)): Path<(String, String)>,
    Json(req): Json<EditOutputRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let agent_id = parse_agent(&agent)?;
    let engine = state.engine().await;
    let project = engine
        .orchestrator
        .edit_output(&id, agent_id, &req.content)
        .ok_or_else(|| not_found("Project", &id))?;
    Ok(project_response(&state, &project))
}

/// Regenerate one agent's output from the earlier agents' work
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/outputs/{agent}/regenerate",
    tag = "projects",
    params(
        ("id" = String, Path, description = "Project ID"),
        ("agent" = String, Path, description = "Agent ID")
    ),
    responses(
        (status = 200, description = "Updated project", body = ProjectResponse),
        (status = 404, description = "Project or agent not found", body = super::ErrorResponse),
        (status = 503, description = "Generation unavailable", body = super::ErrorResponse)
    )
)]
pub async fn regenerate_output(
    State(state): State<SharedState>,
    Path((id, agent)): Path<(String, String)>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let agent_id = parse_agent(&agent)?;
    let engine = state.engine().await;
    if !engine.is_available() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Gemini API is not available. Please check your API key setup.",
        ));
    }
    let project = engine
        .orchestrator
        .regenerate_output(&id, agent_id)
        .await
        .ok_or_else(|| not_found("Project or agent", &format!("{}/{}", id, agent_id)))?;
    Ok(project_response(&state, &project))
}

/// Conversation with one agent
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/chat/{agent}",
    tag = "projects",
    params(
        ("id" = String, Path, description = "Project ID"),
        ("agent" = String, Path, description = "Agent ID")
    ),
    responses(
        (status = 200, description = "Visible conversation", body = Vec<MessageResponse>),
        (status = 404, description = "Project not found", body = super::ErrorResponse)
    )
)]
pub async fn get_conversation(
    State(state): State<SharedState>,
    Path((id, agent)): Path<(String, String)>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let agent_id = parse_agent(&agent)?;
    let project = state.store.get(&id).ok_or_else(|| not_found("Project", &id))?;
    let messages = conversation(&project, agent_id)
        .iter()
        .map(|m| MessageResponse::from_message(m, &state.registry))
        .collect();
    Ok(Json(messages))
}

/// Send a chat message to one agent
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/chat/{agent}",
    tag = "projects",
    params(
        ("id" = String, Path, description = "Project ID"),
        ("agent" = String, Path, description = "Agent ID")
    ),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Agent reply", body = ChatTurnResponse),
        (status = 400, description = "Empty message", body = super::ErrorResponse),
        (status = 404, description = "Project or agent not found", body = super::ErrorResponse),
        (status = 503, description = "Generation unavailable", body = super::ErrorResponse)
    )
)]
pub async fn send_chat(
    State(state): State<SharedState>,
    Path((id, agent)): Path<(String, String)>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    let agent_id = parse_agent(&agent)?;
    let engine = state.engine().await;
    let turn = engine
        .chat
        .send_message(&id, agent_id, &req.text)
        .await
        .map_err(chat_error)?;
    Ok(Json(ChatTurnResponse {
        user_message: MessageResponse::from_message(&turn.user_message, &state.registry),
        reply: MessageResponse::from_message(&turn.reply, &state.registry),
    }))
}

fn chat_error(error: ChatError) -> ApiError {
    let status = match error {
        ChatError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ChatError::ProjectNotFound(_) | ChatError::AgentNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
    };
    api_error(status, error.to_string())
}

/// Download the project as a text document
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/export",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Text export", body = String, content_type = "text/plain"),
        (status = 404, description = "Project not found", body = super::ErrorResponse)
    )
)]
pub async fn export_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.store.get(&id).ok_or_else(|| not_found("Project", &id))?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(&project).replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export_text(&project, &state.registry),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketmind_core::agents::AgentId;

    #[test]
    fn test_project_response_orders_outputs() {
        let registry = AgentRegistry::default();
        let mut project = Project::new("Launch eBook X");
        project.upsert_output(AgentId::EmailEditor, "emails");
        project.upsert_output(AgentId::Strategist, "plan");

        let response = ProjectResponse::from_project(&project, &registry);
        assert_eq!(response.status, "in-progress");
        assert_eq!(response.outputs[0].agent_name, "Campaign Strategist");
        assert_eq!(response.outputs[1].agent_id, "EMAIL_EDITOR");
        assert_eq!(response.chat_history.len(), 1);
    }

    #[test]
    fn test_chat_error_status() {
        assert_eq!(chat_error(ChatError::Unavailable).0, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(chat_error(ChatError::EmptyMessage).0, StatusCode::BAD_REQUEST);
        assert_eq!(
            chat_error(ChatError::AgentNotFound(AgentId::VideoScripter)).0,
            StatusCode::NOT_FOUND
        );
    }
}
