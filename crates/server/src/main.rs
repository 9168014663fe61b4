//! MarketMind Server
//!
//! Axum server exposing the marketing team over a JSON API with a live event
//! stream, plus a CLI for running global commands without the server.

mod api;
mod config;
mod state;

use anyhow::{bail, Context};
use axum::{
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::{Parser, Subcommand};
use marketmind_core::agents::AgentRegistry;
use marketmind_core::models::ModelConfig;
use marketmind_core::state::{export_file_name, export_text, io, MarketDb, ProjectStore};
use marketmind_core::swarm::{CommandLog, RunEvent, RunState};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use crate::config::PersistedConfig;
use crate::state::{AppState, Engine};

const DEFAULT_PORT: u16 = 8080;

#[derive(Parser, Clone)]
#[command(author, version, about = "MarketMind - AI marketing team orchestration")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the MarketMind server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Run a global command through the agent team (CLI mode, no server)
    Run {
        /// The marketing goal
        goal: String,
    },
    /// List stored projects
    List,
    /// Export a project as a text document
    Export {
        /// Project ID
        id: String,
        /// Output file (defaults to the project's export name)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show the agent team and the orchestration order
    Agents,
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MarketMind API",
        version = "1.0.0",
        description = "API for the MarketMind AI marketing team"
    ),
    paths(
        api::command::get_status,
        api::command::list_agents,
        api::command::start_command,
        api::command::stop_command,
        api::command::command_log,
        api::projects::list_projects,
        api::projects::get_project,
        api::projects::delete_project,
        api::projects::get_active_project,
        api::projects::set_active_project,
        api::projects::edit_output,
        api::projects::regenerate_output,
        api::projects::get_conversation,
        api::projects::send_chat,
        api::projects::export_project,
        api::settings::get_config,
        api::settings::update_config,
        api::settings::save_api_key
    ),
    components(
        schemas(
            api::ApiResponse,
            api::ErrorResponse,
            api::MessageResponse,
            api::command::CommandRequest,
            api::command::AgentInfo,
            api::command::AgentsResponse,
            api::projects::ProjectSummary,
            api::projects::ProjectResponse,
            api::projects::OutputResponse,
            api::projects::SetActiveRequest,
            api::projects::EditOutputRequest,
            api::projects::ChatRequest,
            api::projects::ChatTurnResponse,
            api::settings::ConfigResponse,
            api::settings::ConfigDefaults,
            api::settings::ApiKeyRequest,
            config::PersistedConfig,
            state::RunStatus
        )
    ),
    tags(
        (name = "command", description = "Global commands, run status and events"),
        (name = "projects", description = "Projects, outputs, chat and export"),
        (name = "config", description = "Model configuration and API key")
    )
)]
struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    match ApiDoc::openapi().to_json() {
        Ok(spec) => ([(header::CONTENT_TYPE, "application/json")], spec).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render OpenAPI document");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn build_router(state: state::SharedState) -> Router {
    let api_routes = Router::new()
        .merge(api::command::routes())
        .nest("/projects", api::projects::routes())
        .nest("/config", api::settings::config_routes())
        .nest("/settings", api::settings::settings_routes())
        .route("/openapi.json", get(serve_openapi));

    Router::new().nest("/api/v1", api_routes).with_state(state)
}

fn open_store() -> anyhow::Result<Arc<ProjectStore>> {
    let db = MarketDb::open().context("Failed to open the MarketMind database")?;
    Ok(Arc::new(ProjectStore::open(Arc::new(db))))
}

// === Server Entry ===

async fn run_server(registry: Arc<AgentRegistry>, port: u16) -> anyhow::Result<()> {
    let store = open_store()?;
    let state = AppState::start(registry, store).await;

    let engine = state.engine().await;
    if !engine.is_available() {
        tracing::warn!("No GEMINI_API_KEY configured; commands will be refused until one is saved");
    }
    tracing::info!(model = %engine.model.model, projects = state.store.len(), "Engine ready");

    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("MarketMind server running at http://{}", addr);
    tracing::info!("   Command:  /api/v1/command, /command/stop, /command/log, /events");
    tracing::info!("   Projects: /api/v1/projects, /projects/{{id}}/outputs, /chat, /export");
    tracing::info!("   Config:   /api/v1/config (GET, PATCH), /settings/api-key");
    tracing::info!("   OpenAPI:  /api/v1/openapi.json");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// === CLI Commands ===

async fn run_cli(registry: Arc<AgentRegistry>, goal: &str) -> anyhow::Result<()> {
    let store = open_store()?;
    let model = PersistedConfig::load().await.apply(ModelConfig::from_env());

    let (event_tx, mut event_rx) = mpsc::channel::<RunEvent>(100);
    let engine = Engine::build(
        registry,
        Arc::clone(&store),
        model,
        ModelConfig::api_key_from_env(),
        CommandLog::new(),
        Some(event_tx),
    );

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("   {}", event.message);
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Stopping after the current agent...");
            on_interrupt.cancel();
        }
    });

    println!("Running global command: {}", goal);
    let report = engine
        .orchestrator
        .run_global_command_with(goal, cancel)
        .await;
    drop(engine);
    let _ = printer.await;

    match (&report.outcome, &report.project) {
        (RunState::Completed, Some(project)) => {
            println!("Project {} completed with {} outputs", project.id, project.outputs.len());
            println!("Export it with: marketmind export {}", project.id);
        }
        (RunState::Cancelled, Some(project)) => {
            println!("Cancelled. Project {} is still in progress", project.id);
        }
        _ => {
            for entry in &report.log {
                println!("   {}", entry.text);
            }
            bail!("Global command did not run");
        }
    }
    Ok(())
}

fn list_projects() -> anyhow::Result<()> {
    let store = open_store()?;
    if store.is_empty() {
        println!("No projects yet. Start one with: marketmind run \"<goal>\"");
        return Ok(());
    }
    for project in store.projects() {
        println!(
            "{}  {:<12} {:>2} outputs  {}",
            project.id,
            project.status.as_str(),
            project.outputs.len(),
            project.name
        );
    }
    Ok(())
}

async fn export_project(registry: &AgentRegistry, id: &str, out: Option<PathBuf>) -> anyhow::Result<()> {
    let store = open_store()?;
    let Some(project) = store.get(id) else {
        bail!("Project not found: {}", id);
    };
    let path = out.unwrap_or_else(|| PathBuf::from(export_file_name(&project)));
    tokio::fs::write(&path, export_text(&project, registry))
        .await
        .with_context(|| format!("Failed to write export: {}", path.display()))?;
    println!("Exported {} to {}", project.id, path.display());
    Ok(())
}

fn print_agents(registry: &AgentRegistry) {
    for profile in registry.agents() {
        let marker = match registry.position(profile.id) {
            Some(i) => format!("{}.", i + 1),
            None => "-".to_string(),
        };
        println!("{:>3} {:<24} {}", marker, profile.name, profile.description);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketmind=info,marketmind_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Keys saved from the settings endpoint live next to the database
    let env_path = io::get_runtime_path().join(".env");
    if env_path.exists() {
        if let Err(e) = dotenvy::from_path(&env_path) {
            tracing::warn!(error = %e, "Failed to load {}", env_path.display());
        }
    }

    let args = Args::parse();
    let registry = Arc::new(AgentRegistry::default());

    match args.command.unwrap_or(CliCommand::Serve { port: DEFAULT_PORT }) {
        CliCommand::Serve { port } => run_server(registry, port).await,
        CliCommand::Run { goal } => run_cli(registry, &goal).await,
        CliCommand::List => list_projects(),
        CliCommand::Export { id, out } => export_project(&registry, &id, out).await,
        CliCommand::Agents => {
            print_agents(&registry);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use marketmind_core::state::{Project, STORAGE_KEY};
    use tower::ServiceExt;

    fn test_state(projects: &[Project]) -> state::SharedState {
        let db = MarketDb::open_in_memory().unwrap();
        db.put(STORAGE_KEY, &serde_json::to_string(projects).unwrap())
            .unwrap();
        AppState::with_model(
            Arc::new(AgentRegistry::default()),
            Arc::new(ProjectStore::open(Arc::new(db))),
            ModelConfig::default(),
            None,
        )
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_start_command_conflicts_while_running() {
        let state = test_state(&[]);
        *state.cancel.write().await = Some(CancellationToken::new());
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/command",
                serde_json::json!({"goal": "Launch eBook X"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["error"], "A global command is already running");

        let response = app
            .oneshot(post_json("/api/v1/command", serde_json::json!({"goal": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stop_command_cancels_running_token() {
        let state = test_state(&[]);
        let app = build_router(Arc::clone(&state));

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/command/stop", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], false);

        let token = CancellationToken::new();
        *state.cancel.write().await = Some(token.clone());
        let response = app
            .oneshot(post_json("/api/v1/command/stop", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_export_is_an_attachment() {
        let project = Project::new("Launch eBook X");
        let app = build_router(test_state(std::slice::from_ref(&project)));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/projects/{}/export", project.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Campaign_for_Launch_eBook_X..._export.txt\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Project: Campaign for \"Launch eBook X...\"\nGoal: Launch eBook X\n"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/projects/proj-missing/export")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_command_log_endpoint_reads_shared_log() {
        let state = test_state(&[]);
        let running = state.engine().await;
        state.rebuild_engine(ModelConfig::default()).await;
        running
            .orchestrator
            .run_global_command("Launch eBook X")
            .await;

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/command/log")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body[0]["text"], "Error: API key not configured.");
        assert_eq!(body[0]["sender"], "system");
    }
}
