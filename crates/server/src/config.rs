//! Persisted settings for the generation model, stored as
//! `<runtime>/config.json` and merged field by field on update.

use marketmind_core::models::ModelConfig;
use marketmind_core::state::io::{read_runtime_file, write_runtime_file};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const CONFIG_FILE: &str = "config.json";

/// Settings exposed to front-ends; unset fields keep the built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, ToSchema)]
pub struct PersistedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl PersistedConfig {
    /// Missing or unreadable files load as empty
    pub async fn load() -> Self {
        match read_runtime_file(CONFIG_FILE).await {
            Ok(Some(content)) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable config.json");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read config.json");
                Self::default()
            }
        }
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_runtime_file(CONFIG_FILE, &content).await?;
        Ok(())
    }

    /// Overwrite only the fields `other` sets
    pub fn merge(&mut self, other: PersistedConfig) {
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.top_p.is_some() {
            self.top_p = other.top_p;
        }
        if other.top_k.is_some() {
            self.top_k = other.top_k;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
    }

    /// Layer the stored settings over `base`
    pub fn apply(&self, mut base: ModelConfig) -> ModelConfig {
        if let Some(model) = self.model.as_ref().filter(|m| !m.trim().is_empty()) {
            base.model = model.trim().to_string();
        }
        if let Some(url) = self.base_url.as_ref().filter(|u| !u.trim().is_empty()) {
            base.base_url = url.trim().to_string();
        }
        if let Some(temperature) = self.temperature {
            base.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            base.top_p = top_p;
        }
        if let Some(top_k) = self.top_k {
            base.top_k = top_k;
        }
        if let Some(timeout) = self.timeout_secs {
            base.timeout_secs = timeout;
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut config = PersistedConfig {
            model: Some("gemini-2.5-pro".to_string()),
            temperature: Some(0.2),
            ..Default::default()
        };
        config.merge(PersistedConfig {
            temperature: Some(0.9),
            top_k: Some(32),
            ..Default::default()
        });

        assert_eq!(config.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(config.temperature, Some(0.9));
        assert_eq!(config.top_k, Some(32));
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_apply_over_defaults() {
        let config = PersistedConfig {
            model: Some("  gemini-2.5-pro ".to_string()),
            base_url: Some(String::new()),
            top_p: Some(0.5),
            ..Default::default()
        };
        let applied = config.apply(ModelConfig::default());
        let defaults = ModelConfig::default();

        assert_eq!(applied.model, "gemini-2.5-pro");
        assert_eq!(applied.base_url, defaults.base_url);
        assert_eq!(applied.top_p, 0.5);
        assert_eq!(applied.temperature, defaults.temperature);
    }

    #[test]
    fn test_unset_fields_are_not_serialized() {
        let config = PersistedConfig {
            top_k: Some(40),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&config).unwrap(), r#"{"top_k":40}"#);
        let parsed: PersistedConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, PersistedConfig::default());
    }
}
