//! # Orchestrator
//!
//! Drives a global command through the fixed agent order: find or create the
//! project, ask each agent in turn with the context accumulated so far, and
//! store every answer as it arrives.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

use crate::agents::{AgentId, AgentRegistry};
use crate::generation::{GenerationClient, GenerationRequest};
use crate::state::{ChatMessage, Project, ProjectStatus, ProjectStore};

use super::context::{
    preceding_outputs, regenerate_prompt, step_prompt, uses_grounded_search, AccumulatedContext,
};
use super::events::{RunEvent, RunEventKind};
use super::pipeline::{Pipeline, RunState};

const UNAVAILABLE_ENTRY: &str = "Error: API key not configured.";
const CREATE_FAILED_ENTRY: &str = "Failed to create or find project for command.";
const CANCELLED_ENTRY: &str = "Orchestration cancelled.";
const COMPLETED_ENTRY: &str = "All agents have contributed. Project updated.";

/// Outcome of one global command
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunState,
    /// The project the run worked on, as last stored
    pub project: Option<Project>,
    /// Command log entries written by this run
    pub log: Vec<ChatMessage>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunState::Completed
    }
}

/// Append-only global command log. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    entries: Arc<Mutex<Vec<ChatMessage>>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: ChatMessage) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    /// Snapshot, oldest first
    pub fn entries(&self) -> Vec<ChatMessage> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Runs global commands and per-agent regeneration
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    generator: Arc<dyn GenerationClient>,
    store: Arc<ProjectStore>,
    command_log: CommandLog,
    event_tx: Option<mpsc::Sender<RunEvent>>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        generator: Arc<dyn GenerationClient>,
        store: Arc<ProjectStore>,
    ) -> Self {
        Self {
            registry,
            generator,
            store,
            command_log: CommandLog::new(),
            event_tx: None,
        }
    }

    /// Set event channel for streaming run progress
    pub fn with_event_channel(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Write to a log shared with other orchestrators
    pub fn with_command_log(mut self, log: CommandLog) -> Self {
        self.command_log = log;
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    pub fn generator(&self) -> &Arc<dyn GenerationClient> {
        &self.generator
    }

    /// Snapshot of the global command log, oldest first
    pub fn command_log(&self) -> Vec<ChatMessage> {
        self.command_log.entries()
    }

    fn record(&self, run_log: &mut Vec<ChatMessage>, entry: ChatMessage) {
        self.command_log.push(entry.clone());
        run_log.push(entry);
    }

    async fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Run `goal` through every agent in the orchestration order
    pub async fn run_global_command(&self, goal: &str) -> RunReport {
        self.run_global_command_with(goal, CancellationToken::new())
            .await
    }

    /// Like [`Self::run_global_command`], stopping at the next step boundary
    /// once `cancel` fires
    #[instrument(skip(self, cancel), fields(goal_preview = %goal.chars().take(50).collect::<String>()))]
    pub async fn run_global_command_with(&self, goal: &str, cancel: CancellationToken) -> RunReport {
        let order = self.registry.orchestration_order();
        let mut pipeline = Pipeline::new(order.len());
        let mut run_log = Vec::new();
        pipeline.start();

        if !self.generator.is_available() {
            warn!("Generation unavailable, aborting run");
            self.record(&mut run_log, ChatMessage::system(UNAVAILABLE_ENTRY));
            pipeline.abort();
            self.emit(RunEvent::new(RunEventKind::RunAborted, UNAVAILABLE_ENTRY))
                .await;
            return RunReport {
                outcome: pipeline.state,
                project: None,
                log: run_log,
            };
        }

        self.record(
            &mut run_log,
            ChatMessage::user(format!("Global Command: {}", goal)),
        );

        let mut project = match self.store.find_in_progress(goal) {
            Some(existing) => {
                info!(project_id = %existing.id, "Reusing in-progress project");
                self.store.set_active(Some(&existing.id));
                existing
            }
            None => match self.store.create_project(goal, self.generator.as_ref()) {
                Ok(created) => {
                    self.record(
                        &mut run_log,
                        ChatMessage::system(format!("New project initiated for goal: {}", goal)),
                    );
                    created
                }
                Err(e) => {
                    warn!(error = %e, "Project creation failed");
                    self.record(&mut run_log, ChatMessage::system(CREATE_FAILED_ENTRY));
                    pipeline.abort();
                    self.emit(RunEvent::new(RunEventKind::RunAborted, CREATE_FAILED_ENTRY))
                        .await;
                    return RunReport {
                        outcome: pipeline.state,
                        project: None,
                        log: run_log,
                    };
                }
            },
        };

        self.emit(
            RunEvent::new(RunEventKind::RunStarted, format!("Global Command: {}", goal))
                .with_project(&project.id),
        )
        .await;

        let mut context = AccumulatedContext::new(goal);

        for &agent_id in order {
            if cancel.is_cancelled() {
                info!(project_id = %project.id, "Run cancelled between steps");
                pipeline.cancel();
                self.record(&mut run_log, ChatMessage::system(CANCELLED_ENTRY));
                self.emit(
                    RunEvent::new(RunEventKind::RunCancelled, CANCELLED_ENTRY)
                        .with_project(&project.id),
                )
                .await;
                return RunReport {
                    outcome: pipeline.state,
                    project: self.store.get(&project.id).or(Some(project)),
                    log: run_log,
                };
            }
            pipeline.advance();

            let Some(profile) = self.registry.lookup(agent_id) else {
                warn!(agent = %agent_id, "Agent in orchestration order is not registered, skipping");
                continue;
            };
            let name = profile.name;

            let asking = format!("Asking {}...", name);
            self.record(
                &mut run_log,
                ChatMessage::system(asking.clone()).with_agent(agent_id),
            );
            self.emit(
                RunEvent::new(RunEventKind::AgentStarted, asking)
                    .with_project(&project.id)
                    .with_agent(agent_id),
            )
            .await;

            let prompt = step_prompt(goal, profile, &context);
            let request = GenerationRequest::new(profile, &prompt)
                .with_grounded_search(uses_grounded_search(agent_id));
            let generation = self
                .generator
                .generate(request)
                .instrument(info_span!("agent_step", agent = %agent_id))
                .await;
            if !generation.is_generated() {
                warn!(agent = %agent_id, "No content generated, storing placeholder");
            }
            let text = generation.text();

            // Re-read so chat turns appended meanwhile survive
            let mut working = self.store.get(&project.id).unwrap_or(project);
            working.upsert_output(agent_id, text.clone());
            project = self.store.update_project(working.clone()).unwrap_or(working);

            let responded = format!("{} responded.", name);
            self.record(&mut run_log, ChatMessage::agent(agent_id, responded.clone()));
            self.emit(
                RunEvent::new(RunEventKind::AgentCompleted, responded)
                    .with_project(&project.id)
                    .with_agent(agent_id),
            )
            .await;

            context.push_output(name, &text);
            context.push_sources(name, generation.citations());
            debug!(agent = %agent_id, chars = text.len(), "Step stored");
        }

        pipeline.advance();

        let mut working = self.store.get(&project.id).unwrap_or(project);
        working.status = ProjectStatus::Completed;
        project = self.store.update_project(working.clone()).unwrap_or(working);
        self.record(&mut run_log, ChatMessage::system(COMPLETED_ENTRY));
        self.store.set_active(Some(&project.id));
        self.emit(
            RunEvent::new(RunEventKind::RunCompleted, COMPLETED_ENTRY).with_project(&project.id),
        )
        .await;

        info!(project_id = %project.id, outputs = project.outputs.len(), "Run completed");
        RunReport {
            outcome: pipeline.state,
            project: Some(project),
            log: run_log,
        }
    }

    /// Ask one agent for an alternative to its stored output.
    ///
    /// Context is limited to agents strictly earlier in the order. The
    /// project goes back to in-progress. `None` when generation is
    /// unavailable or the project or agent is unknown.
    #[instrument(skip(self))]
    pub async fn regenerate_output(&self, project_id: &str, agent_id: AgentId) -> Option<Project> {
        if !self.generator.is_available() {
            warn!("Generation unavailable, cannot regenerate");
            return None;
        }
        let project = self.store.get(project_id)?;
        let Some(profile) = self.registry.lookup(agent_id) else {
            warn!(agent = %agent_id, "Cannot regenerate for unregistered agent");
            return None;
        };

        let prompt = regenerate_prompt(&project.goal, profile);
        let context = preceding_outputs(&project, &self.registry, agent_id);
        let request = GenerationRequest::new(profile, &prompt).with_prior_context(&context);
        let generation = self.generator.generate(request).await;

        let mut working = self.store.get(project_id)?;
        working.upsert_output(agent_id, generation.text());
        working.status = ProjectStatus::InProgress;
        let stored = self.store.update_project(working)?;

        info!(project_id = %project_id, "Output regenerated");
        Some(stored)
    }

    /// Replace an agent's output with hand-edited content
    pub fn edit_output(&self, project_id: &str, agent_id: AgentId, content: &str) -> Option<Project> {
        let mut project = self.store.get(project_id)?;
        project.upsert_output(agent_id, content);
        self.store.update_project(project)
    }
}
