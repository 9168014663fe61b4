//! # Agent Chat
//!
//! One-on-one conversation with a single agent inside a project. Each turn
//! is grounded in the project goal, the other agents' outputs and the last
//! few messages exchanged with this agent. The reply also becomes the
//! agent's project output.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::agents::{AgentId, AgentProfile, AgentRegistry};
use crate::generation::{GenerationClient, GenerationRequest};
use crate::state::{ChatMessage, Project, ProjectStore, Sender};

/// Messages of this agent's conversation fed back as context
const RECENT_TURNS: usize = 5;

/// Why a chat turn was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Gemini API is not available. Please check your API key setup.")]
    Unavailable,
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("agent not registered: {0}")]
    AgentNotFound(AgentId),
    #[error("message must not be empty")]
    EmptyMessage,
}

/// Result of a completed turn
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub user_message: ChatMessage,
    pub reply: ChatMessage,
    /// The project after the reply was stored as the agent's output
    pub project: Project,
}

/// The part of a project's history shown when chatting with `agent_id`:
/// that agent's messages, every user message and general system notices
pub fn conversation(project: &Project, agent_id: AgentId) -> Vec<ChatMessage> {
    project
        .chat_history
        .iter()
        .filter(|m| {
            m.agent_id == Some(agent_id)
                || m.sender == Sender::User
                || (m.sender == Sender::System && m.agent_id.is_none())
        })
        .cloned()
        .collect()
}

/// Build the prior context for a turn from the project as it was before the
/// new user message
pub fn chat_context(project: &Project, registry: &AgentRegistry, profile: &AgentProfile) -> String {
    let mut context = format!("Current Project Goal: {}\n\n", project.goal);

    let other_outputs = project
        .outputs
        .iter()
        .filter(|o| o.agent_id != profile.id)
        .map(|o| {
            format!(
                "Output from {} in this project:\n{}",
                registry.display_name(o.agent_id, "Other Agent"),
                o.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    if !other_outputs.is_empty() {
        context.push_str(&format!(
            "Relevant outputs from other agents in this project:\n{}\n\n---\n\n",
            other_outputs
        ));
    }

    let history = conversation(project, profile.id);
    let direct: Vec<&ChatMessage> = history
        .iter()
        .filter(|m| m.sender == Sender::User || m.agent_id == Some(profile.id))
        .collect();
    let recent = direct[direct.len().saturating_sub(RECENT_TURNS)..]
        .iter()
        .map(|m| {
            let speaker = if m.sender == Sender::User {
                "User"
            } else {
                profile.name
            };
            format!("{}: {}", speaker, m.text)
        })
        .collect::<Vec<_>>()
        .join("\n");
    if !recent.is_empty() {
        context.push_str(&format!(
            "Recent conversation with you ({}):\n{}\n\n---\n\nYour task is to respond to the latest user message:",
            profile.name, recent
        ));
    }

    context
}

/// Chat front-end over the shared store and generator
pub struct AgentChat {
    registry: Arc<AgentRegistry>,
    generator: Arc<dyn GenerationClient>,
    store: Arc<ProjectStore>,
}

impl AgentChat {
    pub fn new(
        registry: Arc<AgentRegistry>,
        generator: Arc<dyn GenerationClient>,
        store: Arc<ProjectStore>,
    ) -> Self {
        Self {
            registry,
            generator,
            store,
        }
    }

    /// Send `text` to `agent_id` within `project_id` and store the reply
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn send_message(
        &self,
        project_id: &str,
        agent_id: AgentId,
        text: &str,
    ) -> Result<ChatTurn, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if !self.generator.is_available() {
            warn!("Generation unavailable, chat turn refused");
            return Err(ChatError::Unavailable);
        }
        let project = self
            .store
            .get(project_id)
            .ok_or_else(|| ChatError::ProjectNotFound(project_id.to_string()))?;
        let profile = self
            .registry
            .lookup(agent_id)
            .ok_or(ChatError::AgentNotFound(agent_id))?;

        let context = chat_context(&project, &self.registry, profile);

        let user_message = ChatMessage::user(text).with_agent(agent_id);
        self.store
            .append_chat_message(project_id, user_message.clone());

        let request = GenerationRequest::new(profile, text).with_prior_context(&context);
        let generation = self.generator.generate(request).await;
        let reply_text = generation.text();

        let reply = ChatMessage::agent(agent_id, reply_text.clone());
        self.store.append_chat_message(project_id, reply.clone());

        // Re-read so the two appended messages are kept
        let mut working = self
            .store
            .get(project_id)
            .ok_or_else(|| ChatError::ProjectNotFound(project_id.to_string()))?;
        working.upsert_output(agent_id, reply_text);
        let project = self.store.update_project(working.clone()).unwrap_or(working);

        info!(project_id = %project_id, agent = %agent_id, "Chat turn stored");
        Ok(ChatTurn {
            user_message,
            reply,
            project,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::ScriptedGenerator;

    fn setup(generator: ScriptedGenerator) -> (AgentChat, Arc<ScriptedGenerator>, Arc<ProjectStore>) {
        let generator = Arc::new(generator);
        let store = Arc::new(ProjectStore::ephemeral());
        let chat = AgentChat::new(
            Arc::new(AgentRegistry::default()),
            generator.clone(),
            Arc::clone(&store),
        );
        (chat, generator, store)
    }

    fn seeded_project(store: &ProjectStore) -> Project {
        let mut project = store
            .create_project("Launch eBook X", &ScriptedGenerator::new())
            .unwrap();
        project.upsert_output(AgentId::Strategist, "Target indie authors.");
        project.upsert_output(AgentId::Copywriter, "Old copy");
        store.update_project(project).unwrap()
    }

    #[tokio::test]
    async fn test_turn_appends_and_upserts() {
        let (chat, generator, store) = setup(ScriptedGenerator::new());
        let project = seeded_project(&store);

        let turn = chat
            .send_message(&project.id, AgentId::Copywriter, "Make it punchier")
            .await
            .unwrap();

        assert_eq!(turn.user_message.sender, Sender::User);
        assert_eq!(turn.user_message.agent_id, Some(AgentId::Copywriter));
        assert_eq!(turn.reply.text, "COPYWRITER output #1");

        let stored = store.get(&project.id).unwrap();
        assert_eq!(stored, turn.project);
        assert_eq!(stored.chat_history.len(), 3);
        assert_eq!(
            stored.output(AgentId::Copywriter).unwrap().content,
            "COPYWRITER output #1"
        );
        assert_eq!(stored.outputs.len(), 2);

        let call = &generator.calls()[0];
        assert_eq!(call.prompt, "Make it punchier");
        assert!(!call.grounded);
        let context = call.prior_context.as_deref().unwrap();
        assert!(context.starts_with("Current Project Goal: Launch eBook X\n\n"));
        assert!(context.contains(
            "Relevant outputs from other agents in this project:\nOutput from Campaign Strategist in this project:\nTarget indie authors."
        ));
        assert!(!context.contains("Old copy"));
        // The seeded command is the only prior user message
        assert!(context.contains(
            "Recent conversation with you (Ad Copywriter):\nUser: Global Command: Launch eBook X\n\n---\n\n"
        ));
        assert!(!context.contains("Make it punchier"));
    }

    #[tokio::test]
    async fn test_recent_turns_are_capped() {
        let (chat, generator, store) = setup(ScriptedGenerator::new());
        let project = seeded_project(&store);

        for i in 0..4 {
            chat.send_message(&project.id, AgentId::Copywriter, &format!("msg {}", i))
                .await
                .unwrap();
        }

        let context = generator.calls()[3].prior_context.clone().unwrap();
        let recent = context
            .split("Recent conversation with you (Ad Copywriter):\n")
            .nth(1)
            .unwrap()
            .split("\n\n---\n\n")
            .next()
            .unwrap();
        let lines: Vec<&str> = recent.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Ad Copywriter: COPYWRITER output #1");
        assert_eq!(lines[3], "User: msg 2");
        assert_eq!(lines[4], "Ad Copywriter: COPYWRITER output #3");
    }

    #[tokio::test]
    async fn test_conversation_filters_other_agents() {
        let (chat, _generator, store) = setup(ScriptedGenerator::new());
        let project = seeded_project(&store);
        store.append_chat_message(&project.id, ChatMessage::system("Project exported."));
        store.append_chat_message(
            &project.id,
            ChatMessage::system("Asking Ad Copywriter...").with_agent(AgentId::Copywriter),
        );

        chat.send_message(&project.id, AgentId::Strategist, "Refine the plan")
            .await
            .unwrap();
        chat.send_message(&project.id, AgentId::Copywriter, "New headline")
            .await
            .unwrap();

        let stored = store.get(&project.id).unwrap();
        let view = conversation(&stored, AgentId::Strategist);
        let texts: Vec<&str> = view.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Global Command: Launch eBook X",
                "Project exported.",
                "Refine the plan",
                "STRATEGIST output #1",
                "New headline",
            ]
        );
    }

    #[tokio::test]
    async fn test_refusals() {
        let (chat, generator, store) = setup(ScriptedGenerator::new());
        let project = seeded_project(&store);

        assert_eq!(
            chat.send_message(&project.id, AgentId::Copywriter, "  ").await.unwrap_err(),
            ChatError::EmptyMessage
        );
        assert_eq!(
            chat.send_message("proj-missing", AgentId::Copywriter, "hi").await.unwrap_err(),
            ChatError::ProjectNotFound("proj-missing".to_string())
        );
        assert!(generator.calls().is_empty());
        assert_eq!(store.get(&project.id).unwrap().chat_history.len(), 1);

        let (offline, _generator, offline_store) = setup(ScriptedGenerator::unavailable());
        let project = seeded_project(&offline_store);
        assert_eq!(
            offline.send_message(&project.id, AgentId::Copywriter, "hi").await.unwrap_err(),
            ChatError::Unavailable
        );
        assert_eq!(offline_store.get(&project.id).unwrap().chat_history.len(), 1);
    }
}
