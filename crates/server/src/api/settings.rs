//! # Settings API
//!
//! Model configuration and API key management. Both rebuild the generation
//! engine so changes apply to the next call.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use marketmind_core::models::ModelConfig;
use marketmind_core::state::io::write_runtime_file;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{api_error, ApiError, ApiResponse};
use crate::config::PersistedConfig;
use crate::state::SharedState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    pub config: PersistedConfig,
    pub defaults: ConfigDefaults,
    /// Settings in effect: defaults, environment and stored config combined
    pub effective_model: String,
    pub generation_available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigDefaults {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub timeout_secs: u64,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            model: model.model,
            base_url: model.base_url,
            temperature: model.temperature,
            top_p: model.top_p,
            top_k: model.top_k,
            timeout_secs: model.timeout_secs,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApiKeyRequest {
    pub api_key: String,
}

/// Config routes, nested at `/api/v1/config`
pub fn config_routes() -> Router<SharedState> {
    Router::new().route("/", get(get_config).patch(update_config))
}

/// Settings routes, nested at `/api/v1/settings`
pub fn settings_routes() -> Router<SharedState> {
    Router::new().route("/api-key", post(save_api_key))
}

async fn config_response(state: &SharedState, config: PersistedConfig) -> Json<ConfigResponse> {
    let engine = state.engine().await;
    Json(ConfigResponse {
        config,
        defaults: ConfigDefaults::default(),
        effective_model: engine.model.model.clone(),
        generation_available: engine.is_available(),
    })
}

/// Get current configuration
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Current configuration and defaults", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    let config = PersistedConfig::load().await;
    config_response(&state, config).await
}

/// Update configuration (partial merge)
#[utoipa::path(
    patch,
    path = "/api/v1/config",
    tag = "config",
    request_body = PersistedConfig,
    responses(
        (status = 200, description = "Updated configuration", body = ConfigResponse)
    )
)]
pub async fn update_config(
    State(state): State<SharedState>,
    Json(updates): Json<PersistedConfig>,
) -> Json<ConfigResponse> {
    let mut config = PersistedConfig::load().await;
    config.merge(updates);

    if let Err(e) = config.save().await {
        tracing::error!(error = %e, "Failed to save config");
    }

    state
        .rebuild_engine(config.apply(ModelConfig::from_env()))
        .await;
    config_response(&state, config).await
}

/// Trimmed key; inner whitespace or control characters would break the `.env` line
fn validate_api_key(raw: &str) -> Result<&str, ApiError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "API key must not be empty"));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "API key must not contain whitespace or control characters",
        ));
    }
    Ok(key)
}

/// Save the Gemini API key to `<runtime>/.env` and load it
#[utoipa::path(
    post,
    path = "/api/v1/settings/api-key",
    tag = "config",
    request_body = ApiKeyRequest,
    responses(
        (status = 200, description = "API key saved", body = ApiResponse),
        (status = 400, description = "Blank key or key with whitespace", body = super::ErrorResponse),
        (status = 500, description = "Key could not be written", body = super::ErrorResponse)
    )
)]
pub async fn save_api_key(
    State(state): State<SharedState>,
    Json(req): Json<ApiKeyRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let key = validate_api_key(&req.api_key)?;

    let gitignore = "# Never commit API keys\n.env\n*.env\n*.db\n";
    if let Err(e) = write_runtime_file(".gitignore", gitignore).await {
        tracing::warn!(error = %e, "Failed to write runtime .gitignore");
    }

    let env_content = format!(
        "# MarketMind API key - DO NOT COMMIT\n# Generated by MarketMind\n\nGEMINI_API_KEY={}\n",
        key
    );
    let env_path = write_runtime_file(".env", &env_content)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to write .env");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to write .env file: {}", e),
            )
        })?;

    // Replaces a key already present in the environment
    if let Err(e) = dotenvy::from_path_override(&env_path) {
        tracing::warn!(error = %e, "Failed to load .env");
    }

    let model = PersistedConfig::load().await.apply(ModelConfig::from_env());
    state.rebuild_engine(model).await;

    Ok(ApiResponse::ok("API key saved and loaded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key("  AIza-good_key \n").unwrap(), "AIza-good_key");
        assert_eq!(validate_api_key("   ").unwrap_err().0, StatusCode::BAD_REQUEST);

        let injected = "AIza\nMARKETMIND_RUNTIME_PATH=/tmp/elsewhere";
        let (status, body) = validate_api_key(injected).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("whitespace"));
        assert!(validate_api_key("AIza key").is_err());
        assert!(validate_api_key("AIza\u{0}key").is_err());
    }
}
