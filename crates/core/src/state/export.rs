//! # Project Export
//!
//! Flat, human-readable text rendering of a project and its agent outputs.

use crate::agents::AgentRegistry;

use super::project::{AgentOutput, Project};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render the header followed by one section per stored output
pub fn export_text(project: &Project, registry: &AgentRegistry) -> String {
    let mut content = format!(
        "Project: {}\nGoal: {}\nStatus: {}\nCreated: {}\nUpdated: {}\n\n",
        project.name,
        project.goal,
        project.status.as_str(),
        project.created_at.format(TIMESTAMP_FORMAT),
        project.updated_at.format(TIMESTAMP_FORMAT),
    );

    for output in &project.outputs {
        let agent_name = registry.display_name(output.agent_id, "Unknown Agent");
        content.push_str(&format!("--- {} ---\n{}\n\n", agent_name, output.content));
    }

    content
}

/// Download name: whitespace runs become `_`, suffixed `_export.txt`
pub fn export_file_name(project: &Project) -> String {
    let stem = project.name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{}_export.txt", stem)
}

/// Outputs in orchestration order; agents outside the order come last
pub fn ordered_outputs<'a>(project: &'a Project, registry: &AgentRegistry) -> Vec<&'a AgentOutput> {
    let mut outputs: Vec<&AgentOutput> = project.outputs.iter().collect();
    outputs.sort_by_key(|o| registry.position(o.agent_id).unwrap_or(usize::MAX));
    outputs
}
