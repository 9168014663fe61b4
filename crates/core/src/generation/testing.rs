//! Scripted generation client for orchestrator, store and chat tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::client::{Generation, GenerationClient, GenerationRequest, GroundingChunk};
use crate::agents::AgentId;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub agent: AgentId,
    pub prompt: String,
    pub prior_context: Option<String>,
    pub grounded: bool,
}

/// Replies `"<AGENT_ID> output #<n>"` unless told otherwise
#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    unavailable: bool,
    failing: HashSet<AgentId>,
    citations: HashMap<AgentId, Vec<GroundingChunk>>,
    cancel_after: Option<(usize, CancellationToken)>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn failing_for(mut self, agent: AgentId) -> Self {
        self.failing.insert(agent);
        self
    }

    pub fn with_citations(mut self, agent: AgentId, citations: Vec<GroundingChunk>) -> Self {
        self.citations.insert(agent, citations);
        self
    }

    /// Cancel `token` once `calls` generations have completed
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedGenerator {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Generation {
        if self.unavailable {
            return Generation::Unavailable;
        }

        let agent = request.persona.id;
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                agent,
                prompt: request.prompt.to_string(),
                prior_context: request.prior_context.map(str::to_string),
                grounded: request.grounded_search,
            });
            calls.len()
        };

        if let Some((after, token)) = &self.cancel_after {
            if count >= *after {
                token.cancel();
            }
        }

        if self.failing.contains(&agent) {
            return Generation::failed("503 Service Unavailable");
        }

        Generation::Generated {
            text: format!("{} output #{}", agent, count),
            citations: self.citations.get(&agent).cloned().unwrap_or_default(),
        }
    }
}
