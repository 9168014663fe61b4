//! # Generation Client Contract
//!
//! One call in, one `Generation` out. Failures are values, never errors, so
//! the orchestrator can fold them into project output like any other text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::AgentProfile;

/// Placeholder returned when no credential is configured
pub const UNAVAILABLE_TEXT: &str = "Gemini API not initialized. Please check API key.";

/// Prefix of every failure placeholder
pub const FAILURE_PREFIX: &str = "Error generating content.";

/// Where a citation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationOrigin {
    Web,
    Retrieved,
}

/// A source the service drew on during grounded generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub uri: String,
    pub title: String,
    pub origin: CitationOrigin,
}

impl GroundingChunk {
    pub fn web(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            origin: CitationOrigin::Web,
        }
    }

    pub fn retrieved(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            origin: CitationOrigin::Retrieved,
        }
    }

    /// `[title](uri)`, with `Source` standing in for a blank title
    pub fn markdown_link(&self) -> String {
        let title = if self.title.trim().is_empty() {
            "Source"
        } else {
            self.title.as_str()
        };
        format!("[{}]({})", title, self.uri)
    }
}

/// A single generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub persona: &'a AgentProfile,
    pub prompt: &'a str,
    /// Labeled block placed ahead of the prompt
    pub prior_context: Option<&'a str>,
    /// Ask the service to ground the answer in web search
    pub grounded_search: bool,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(persona: &'a AgentProfile, prompt: &'a str) -> Self {
        Self {
            persona,
            prompt,
            prior_context: None,
            grounded_search: false,
        }
    }

    pub fn with_prior_context(mut self, context: &'a str) -> Self {
        self.prior_context = Some(context);
        self
    }

    pub fn with_grounded_search(mut self, enabled: bool) -> Self {
        self.grounded_search = enabled;
        self
    }

    /// User-turn text parts in send order.
    ///
    /// An empty prior context is treated as absent.
    pub fn prompt_parts(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(2);
        if let Some(context) = self.prior_context.filter(|c| !c.is_empty()) {
            parts.push(format!(
                "Previous context from other agents:\n{}\n\n---\n\nYour current task based on this context and the user's request:",
                context
            ));
        }
        parts.push(self.prompt.to_string());
        parts
    }
}

/// Outcome of one generation call
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Generated {
        text: String,
        citations: Vec<GroundingChunk>,
    },
    /// No credential; nothing was sent
    Unavailable,
    /// Transport or service failure
    Failed { message: String },
}

impl Generation {
    pub fn generated(text: impl Into<String>) -> Self {
        Self::Generated {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Text to show as the agent's output, placeholders included
    pub fn text(&self) -> String {
        match self {
            Self::Generated { text, .. } => text.clone(),
            Self::Unavailable => UNAVAILABLE_TEXT.to_string(),
            Self::Failed { message } if message.is_empty() => FAILURE_PREFIX.to_string(),
            Self::Failed { message } => format!("{} Details: {}", FAILURE_PREFIX, message),
        }
    }

    pub fn citations(&self) -> &[GroundingChunk] {
        match self {
            Self::Generated { citations, .. } => citations,
            _ => &[],
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

/// The external text generation service
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Whether a credential is configured; checked before any call
    fn is_available(&self) -> bool;

    /// Perform exactly one attempt. Never panics or returns an error.
    async fn generate(&self, request: GenerationRequest<'_>) -> Generation;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentId, AgentRegistry};

    #[test]
    fn test_placeholder_texts() {
        assert_eq!(Generation::Unavailable.text(), UNAVAILABLE_TEXT);
        assert_eq!(
            Generation::failed("timeout").text(),
            "Error generating content. Details: timeout"
        );
        assert_eq!(Generation::failed("").text(), "Error generating content.");
        assert!(Generation::failed("x").citations().is_empty());
    }

    #[test]
    fn test_prompt_parts_with_context() {
        let registry = AgentRegistry::default();
        let persona = registry.lookup(AgentId::Copywriter).unwrap();
        let request = GenerationRequest::new(persona, "Write ads").with_prior_context("Strategy");
        let parts = request.prompt_parts();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("Previous context from other agents:\nStrategy"));
        assert_eq!(parts[1], "Write ads");
    }

    #[test]
    fn test_empty_context_is_absent() {
        let registry = AgentRegistry::default();
        let persona = registry.lookup(AgentId::Strategist).unwrap();
        let request = GenerationRequest::new(persona, "Plan").with_prior_context("");
        assert_eq!(request.prompt_parts(), vec!["Plan".to_string()]);
    }

    #[test]
    fn test_markdown_link_fallback_title() {
        let chunk = GroundingChunk::retrieved("https://example.com/a", " ");
        assert_eq!(chunk.markdown_link(), "[Source](https://example.com/a)");
        let chunk = GroundingChunk::web("https://example.com/b", "Guide");
        assert_eq!(chunk.markdown_link(), "[Guide](https://example.com/b)");
    }
}
