//! Shared server state: the project store, the current generation engine and
//! the status of the in-flight run.

use marketmind_core::agents::AgentRegistry;
use marketmind_core::generation::{GeminiClient, GenerationClient};
use marketmind_core::models::ModelConfig;
use marketmind_core::state::ProjectStore;
use marketmind_core::swarm::{AgentChat, CommandLog, Orchestrator, RunEvent, RunEventKind};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::config::PersistedConfig;

/// Orchestrator and chat bound to one generation client.
///
/// Rebuilt whenever the API key or model settings change.
pub struct Engine {
    pub orchestrator: Orchestrator,
    pub chat: AgentChat,
    pub model: ModelConfig,
}

impl Engine {
    pub fn build(
        registry: Arc<AgentRegistry>,
        store: Arc<ProjectStore>,
        model: ModelConfig,
        api_key: Option<String>,
        command_log: CommandLog,
        events: Option<mpsc::Sender<RunEvent>>,
    ) -> Self {
        let generator: Arc<dyn GenerationClient> =
            Arc::new(GeminiClient::new(model.clone(), api_key));
        let mut orchestrator = Orchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&generator),
            Arc::clone(&store),
        )
        .with_command_log(command_log);
        if let Some(tx) = events {
            orchestrator = orchestrator.with_event_channel(tx);
        }
        let chat = AgentChat::new(registry, generator, store);
        Self {
            orchestrator,
            chat,
            model,
        }
    }

    pub fn is_available(&self) -> bool {
        self.orchestrator.generator().is_available()
    }
}

/// Run status as reported by `/api/v1/status`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunStatus {
    /// idle, running, completed, aborted or cancelled
    pub status: String,
    pub active_agent: Option<String>,
    pub project_id: Option<String>,
    pub generation_available: bool,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            status: "idle".to_string(),
            active_agent: None,
            project_id: None,
            generation_available: false,
        }
    }
}

impl RunStatus {
    /// Fold a run event into the status
    pub fn apply(&mut self, event: &RunEvent) {
        match event.kind {
            RunEventKind::RunStarted => {
                self.status = "running".to_string();
                self.project_id = event.project_id.clone();
                self.active_agent = None;
            }
            RunEventKind::AgentStarted => {
                self.active_agent = event.agent.map(|a| a.to_string());
            }
            RunEventKind::AgentCompleted => self.active_agent = None,
            RunEventKind::RunCompleted => self.finish("completed"),
            RunEventKind::RunAborted => self.finish("aborted"),
            RunEventKind::RunCancelled => self.finish("cancelled"),
        }
    }

    fn finish(&mut self, status: &str) {
        self.status = status.to_string();
        self.active_agent = None;
    }
}

/// Application state
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    pub store: Arc<ProjectStore>,
    /// Shared by every engine, including ones still finishing a run
    pub command_log: CommandLog,
    pub engine: RwLock<Arc<Engine>>,
    pub run_status: RwLock<RunStatus>,
    /// Token of the in-flight run, if any
    pub cancel: RwLock<Option<CancellationToken>>,
    pub event_tx: broadcast::Sender<RunEvent>,
    run_event_tx: mpsc::Sender<RunEvent>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build the state from stored settings and the environment
    pub async fn start(registry: Arc<AgentRegistry>, store: Arc<ProjectStore>) -> SharedState {
        let model = PersistedConfig::load().await.apply(ModelConfig::from_env());
        Self::with_model(registry, store, model, ModelConfig::api_key_from_env())
    }

    /// Build the state and spawn the task bridging run events to SSE
    /// subscribers
    pub fn with_model(
        registry: Arc<AgentRegistry>,
        store: Arc<ProjectStore>,
        model: ModelConfig,
        api_key: Option<String>,
    ) -> SharedState {
        let (event_tx, _) = broadcast::channel::<RunEvent>(100);
        let (run_event_tx, mut run_event_rx) = mpsc::channel::<RunEvent>(100);

        let command_log = CommandLog::new();
        let engine = Engine::build(
            Arc::clone(&registry),
            Arc::clone(&store),
            model,
            api_key,
            command_log.clone(),
            Some(run_event_tx.clone()),
        );

        let state = Arc::new(Self {
            registry,
            store,
            command_log,
            engine: RwLock::new(Arc::new(engine)),
            run_status: RwLock::new(RunStatus::default()),
            cancel: RwLock::new(None),
            event_tx,
            run_event_tx,
        });

        let bridge = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = run_event_rx.recv().await {
                bridge.run_status.write().await.apply(&event);
                let _ = bridge.event_tx.send(event);
            }
        });

        state
    }

    pub async fn engine(&self) -> Arc<Engine> {
        Arc::clone(&*self.engine.read().await)
    }

    /// Swap in an engine for `model` and the key in the environment
    pub async fn rebuild_engine(&self, model: ModelConfig) {
        let engine = Engine::build(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            model,
            ModelConfig::api_key_from_env(),
            self.command_log.clone(),
            Some(self.run_event_tx.clone()),
        );
        tracing::info!(
            model = %engine.model.model,
            available = engine.is_available(),
            "Generation engine rebuilt"
        );
        *self.engine.write().await = Arc::new(engine);
    }
}
