//! # MarketMind Models
//!
//! Generation model configuration shared by the Gemini client and the server's
//! settings endpoints.

use serde::{Deserialize, Serialize};

/// Default Gemini text model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Default Gemini REST endpoint (model name is appended)
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Configuration for the generation model
///
/// ## Example
/// ```rust,ignore
/// use marketmind_core::models::ModelConfig;
///
/// let config = ModelConfig::default().with_model("gemini-2.5-pro");
/// let client = GeminiClient::new(config, ModelConfig::api_key_from_env());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name (e.g., "gemini-2.5-flash")
    pub model: String,
    /// REST endpoint the model name is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: default_base_url(),
            temperature: 0.7,
            top_p: 0.95,
            top_k: 64,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelConfig {
    /// Defaults, with the model overridable through `MARKETMIND_MODEL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("MARKETMIND_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }
        config
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set base URL (for proxies and test servers)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// First non-blank API key found in the environment
    pub fn api_key_from_env() -> Option<String> {
        API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert!(config.model.starts_with("gemini"));
        assert_eq!(config.top_k, 64);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_model_config_serialization() {
        let config = ModelConfig::default().with_model("gemini-2.5-pro");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("gemini-2.5-pro"));

        let parsed: ModelConfig =
            serde_json::from_str(r#"{"model":"m","temperature":0.1,"top_p":0.5,"top_k":8}"#)
                .unwrap();
        assert_eq!(parsed.base_url, DEFAULT_BASE_URL);
        assert_eq!(parsed.timeout_secs, 120);
    }
}
