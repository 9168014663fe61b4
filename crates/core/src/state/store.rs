//! # Project Store
//!
//! Owns the project collection and the active project. Every mutation goes
//! through here and rewrites the whole collection to the local database under
//! a single fixed key.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use super::db::MarketDb;
use super::project::{goals_match, ChatMessage, Project, ProjectStatus};
use crate::generation::GenerationClient;

/// Key the serialized collection lives under
pub const STORAGE_KEY: &str = "marketingMindProjects";

/// Reasons a project could not be created
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Gemini API is not available. Please check your API key setup.")]
    GenerationUnavailable,
    #[error("A project goal must not be empty")]
    EmptyGoal,
}

#[derive(Default)]
struct Inner {
    /// Newest first
    projects: Vec<Project>,
    active_id: Option<String>,
}

/// Single writer for all project state
pub struct ProjectStore {
    db: Option<Arc<MarketDb>>,
    inner: Mutex<Inner>,
}

impl ProjectStore {
    /// Load the collection from `db`; missing or unreadable data starts empty
    pub fn open(db: Arc<MarketDb>) -> Self {
        let projects = load_projects(&db);
        info!(count = projects.len(), "Loaded projects");
        Self {
            db: Some(db),
            inner: Mutex::new(Inner {
                projects,
                active_id: None,
            }),
        }
    }

    /// A store that never touches disk
    pub fn ephemeral() -> Self {
        Self {
            db: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rewrite the full collection. Failures are logged, never surfaced.
    fn persist(&self, projects: &[Project]) {
        let Some(db) = &self.db else {
            return;
        };
        let json = match serde_json::to_string(projects) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Failed to serialize projects");
                return;
            }
        };
        if let Err(e) = db.put(STORAGE_KEY, &json) {
            error!(error = %e, "Failed to persist projects");
        }
    }

    /// Snapshot of every project, newest first
    pub fn projects(&self) -> Vec<Project> {
        self.lock().projects.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().projects.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Project> {
        self.lock().projects.iter().find(|p| p.id == id).cloned()
    }

    /// An in-progress project started for the same goal, if any
    pub fn find_in_progress(&self, goal: &str) -> Option<Project> {
        self.lock()
            .projects
            .iter()
            .find(|p| p.status == ProjectStatus::InProgress && goals_match(&p.goal, goal))
            .cloned()
    }

    /// Create a project for `goal` and make it active.
    ///
    /// Refused when the generator has no credential, since nothing could
    /// ever fill the project.
    pub fn create_project(
        &self,
        goal: &str,
        generator: &dyn GenerationClient,
    ) -> Result<Project, StoreError> {
        if !generator.is_available() {
            warn!("{}", StoreError::GenerationUnavailable);
            return Err(StoreError::GenerationUnavailable);
        }
        if goal.trim().is_empty() {
            return Err(StoreError::EmptyGoal);
        }

        let project = Project::new(goal);
        let mut inner = self.lock();
        inner.projects.insert(0, project.clone());
        inner.active_id = Some(project.id.clone());
        self.persist(&inner.projects);

        info!(project_id = %project.id, goal = %goal, "Created project");
        Ok(project)
    }

    /// Replace the stored project with the same id, stamping `updated_at`.
    ///
    /// Returns the stored copy, or `None` when no project has that id.
    pub fn update_project(&self, mut project: Project) -> Option<Project> {
        project.updated_at = Utc::now();
        let mut inner = self.lock();
        let slot = inner.projects.iter_mut().find(|p| p.id == project.id)?;
        *slot = project.clone();
        self.persist(&inner.projects);

        debug!(project_id = %project.id, status = project.status.as_str(), "Updated project");
        Some(project)
    }

    /// Append to a project's chat history; `false` when the project is unknown
    pub fn append_chat_message(&self, project_id: &str, message: ChatMessage) -> bool {
        let mut inner = self.lock();
        let Some(project) = inner.projects.iter_mut().find(|p| p.id == project_id) else {
            return false;
        };
        project.chat_history.push(message);
        self.persist(&inner.projects);
        true
    }

    /// Remove a project; clears the active selection if it pointed there
    pub fn delete_project(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let before = inner.projects.len();
        inner.projects.retain(|p| p.id != id);
        if inner.projects.len() == before {
            return false;
        }
        if inner.active_id.as_deref() == Some(id) {
            inner.active_id = None;
        }
        self.persist(&inner.projects);
        info!(project_id = %id, "Deleted project");
        true
    }

    /// The active project, always read from the canonical collection
    pub fn active_project(&self) -> Option<Project> {
        let inner = self.lock();
        let id = inner.active_id.as_deref()?;
        inner.projects.iter().find(|p| p.id == id).cloned()
    }

    /// Select the active project, or clear it with `None`.
    ///
    /// Returns `false` (and leaves the selection alone) for an unknown id.
    pub fn set_active(&self, id: Option<&str>) -> bool {
        let mut inner = self.lock();
        match id {
            None => {
                inner.active_id = None;
                true
            }
            Some(id) if inner.projects.iter().any(|p| p.id == id) => {
                inner.active_id = Some(id.to_string());
                true
            }
            Some(_) => false,
        }
    }
}

fn load_projects(db: &MarketDb) -> Vec<Project> {
    let raw = match db.get(STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read stored projects, starting empty");
            return Vec::new();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "Stored projects are unreadable, starting empty");
        Vec::new()
    })
}
