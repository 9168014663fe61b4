//! # Run State Machine
//!
//! `Idle → Starting → Step(0..n) → Completed`, with `Aborted` reachable from
//! `Starting` and `Cancelled` from any step boundary.

use serde::{Deserialize, Serialize};

/// State of a global command run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "index")]
pub enum RunState {
    Idle,
    Starting,
    /// Working on the agent at this index of the orchestration order
    Step(usize),
    Completed,
    Aborted,
    Cancelled,
}

/// Tracks one run through the fixed agent order
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub state: RunState,
    /// Length of the orchestration order
    pub steps: usize,
}

impl Pipeline {
    pub fn new(steps: usize) -> Self {
        Self {
            state: RunState::Idle,
            steps,
        }
    }

    /// Leave `Idle`
    pub fn start(&mut self) {
        if self.state == RunState::Idle {
            self.state = RunState::Starting;
        }
    }

    /// Move to the next agent, or to `Completed` after the last one
    pub fn advance(&mut self) {
        self.state = match self.state {
            RunState::Starting if self.steps == 0 => RunState::Completed,
            RunState::Starting => RunState::Step(0),
            RunState::Step(i) if i + 1 < self.steps => RunState::Step(i + 1),
            RunState::Step(_) => RunState::Completed,
            other => other,
        };
    }

    /// Only a run that has not started its steps can abort
    pub fn abort(&mut self) {
        if matches!(self.state, RunState::Idle | RunState::Starting) {
            self.state = RunState::Aborted;
        }
    }

    pub fn cancel(&mut self) {
        if !self.is_finished() {
            self.state = RunState::Cancelled;
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            RunState::Completed | RunState::Aborted | RunState::Cancelled
        )
    }
}
