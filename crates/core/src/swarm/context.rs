//! # Prompt Construction
//!
//! Per-agent prompt templates and the accumulated context that carries each
//! finished agent's output forward to the ones after it.

use crate::agents::{AgentId, AgentProfile, AgentRegistry};
use crate::generation::GroundingChunk;
use crate::state::Project;

const SECTION_BREAK: &str = "\n\n---\n\n";

/// Running context for one orchestration run
#[derive(Debug, Clone)]
pub struct AccumulatedContext {
    text: String,
    goal_chars: usize,
}

impl AccumulatedContext {
    /// Seeded with the original goal
    pub fn new(goal: &str) -> Self {
        Self {
            text: format!("Original User Goal: {}\n\n", goal),
            goal_chars: goal.chars().count(),
        }
    }

    /// Longer than the goal by more than 20 characters
    pub fn is_substantial(&self) -> bool {
        self.text.chars().count() > self.goal_chars + 20
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Fold an agent's output in
    pub fn push_output(&mut self, agent_name: &str, text: &str) {
        self.text
            .push_str(&format!("Output from {}:\n{}{}", agent_name, text, SECTION_BREAK));
    }

    /// Fold in the sources an agent's answer was grounded on
    pub fn push_sources(&mut self, agent_name: &str, citations: &[GroundingChunk]) {
        if citations.is_empty() {
            return;
        }
        let sources = citations
            .iter()
            .map(GroundingChunk::markdown_link)
            .collect::<Vec<_>>()
            .join(", ");
        self.text.push_str(&format!(
            "Sources considered by {}: {}{}",
            agent_name, sources, SECTION_BREAK
        ));
    }
}

/// Only the strategist is grounded in web search
pub fn uses_grounded_search(agent_id: AgentId) -> bool {
    agent_id == AgentId::Strategist
}

/// Prompt for one step of a global command
pub fn step_prompt(goal: &str, profile: &AgentProfile, context: &AccumulatedContext) -> String {
    if profile.id == AgentId::Strategist {
        return format!(
            "Develop a marketing strategy for the following goal: \"{}\". {}",
            goal, profile.system_instruction
        );
    }

    let mut prompt = format!("Based on the overall goal \"{}\"", goal);
    if context.is_substantial() {
        prompt.push_str(&format!(
            " and the following context from previous agents:\n{}",
            context.as_str()
        ));
    }
    prompt.push_str(&format!(
        "\n\nYour task as {}: {}. Please provide your output for this stage.",
        profile.name, profile.system_instruction
    ));
    prompt
}

/// Prompt asking an agent for an alternative to its stored output
pub fn regenerate_prompt(goal: &str, profile: &AgentProfile) -> String {
    format!(
        "Regenerate content for {} regarding the project: \"{}\". Original system instruction: {}. Focus on improving or providing an alternative to the previous output.",
        profile.name, goal, profile.system_instruction
    )
}

/// Stored outputs of agents strictly before `target` in the orchestration order.
///
/// Empty for the first agent and for agents outside the order.
pub fn preceding_outputs(project: &Project, registry: &AgentRegistry, target: AgentId) -> String {
    let Some(target_position) = registry.position(target) else {
        return String::new();
    };

    project
        .outputs
        .iter()
        .filter(|o| {
            registry
                .position(o.agent_id)
                .is_some_and(|p| p < target_position)
        })
        .map(|o| {
            format!(
                "Output from {}:\n{}",
                registry.display_name(o.agent_id, "Previous Agent"),
                o.content
            )
        })
        .collect::<Vec<_>>()
        .join(SECTION_BREAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_seed() {
        let context = AccumulatedContext::new("Launch eBook X");
        assert_eq!(context.as_str(), "Original User Goal: Launch eBook X\n\n");
        // The label alone already clears the threshold
        assert!(context.is_substantial());
    }

    #[test]
    fn test_context_folds_outputs_and_sources() {
        let mut context = AccumulatedContext::new("g");
        context.push_output("Campaign Strategist", "Plan");
        context.push_sources(
            "Campaign Strategist",
            &[
                GroundingChunk::web("https://a.example", "A"),
                GroundingChunk::web("https://b.example", ""),
            ],
        );
        context.push_sources("Ad Copywriter", &[]);

        assert!(context.is_substantial());
        assert_eq!(
            context.as_str(),
            "Original User Goal: g\n\n\
             Output from Campaign Strategist:\nPlan\n\n---\n\n\
             Sources considered by Campaign Strategist: [A](https://a.example), [Source](https://b.example)\n\n---\n\n"
        );
    }

    #[test]
    fn test_strategist_prompt_is_directive() {
        let registry = AgentRegistry::default();
        let strategist = registry.lookup(AgentId::Strategist).unwrap();
        let mut context = AccumulatedContext::new("Launch");
        context.push_output("x", "y");

        let prompt = step_prompt("Launch", strategist, &context);
        assert!(prompt.starts_with("Develop a marketing strategy for the following goal: \"Launch\". "));
        assert!(!prompt.contains("Output from"));
    }

    #[test]
    fn test_generic_prompt_layout() {
        let registry = AgentRegistry::default();
        let copywriter = registry.lookup(AgentId::Copywriter).unwrap();

        let mut context = AccumulatedContext::new("Launch");
        context.push_output("Campaign Strategist", "Plan");
        let rich = step_prompt("Launch", copywriter, &context);
        assert!(rich.contains(
            "and the following context from previous agents:\nOriginal User Goal: Launch"
        ));
        assert!(rich.starts_with("Based on the overall goal \"Launch\" and the following"));
        assert!(rich.contains("Output from Campaign Strategist:\nPlan"));
        assert!(rich.contains("\n\nYour task as Ad Copywriter: "));
        assert!(rich.ends_with(". Please provide your output for this stage."));
    }

    #[test]
    fn test_preceding_outputs_respects_order() {
        let registry = AgentRegistry::default();
        let mut project = Project::new("g");
        project.upsert_output(AgentId::EmailEditor, "emails");
        project.upsert_output(AgentId::Strategist, "plan");
        project.upsert_output(AgentId::Copywriter, "copy");
        project.upsert_output(AgentId::FunnelExpert, "funnel");

        assert_eq!(preceding_outputs(&project, &registry, AgentId::Strategist), "");
        assert_eq!(
            preceding_outputs(&project, &registry, AgentId::SocialMediaConsultant),
            "Output from Campaign Strategist:\nplan\n\n---\n\nOutput from Ad Copywriter:\ncopy"
        );
        assert_eq!(preceding_outputs(&project, &registry, AgentId::VideoScripter), "");
        assert_eq!(preceding_outputs(&project, &registry, AgentId::FunnelExpert), "");
    }

    #[test]
    fn test_grounding_only_for_strategist() {
        assert!(uses_grounded_search(AgentId::Strategist));
        assert!(!uses_grounded_search(AgentId::Copywriter));
    }
}
