//! # Gemini Client
//!
//! Calls the Gemini `generateContent` REST endpoint directly.
//! Search grounding is requested through the `googleSearch` tool.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::client::{Generation, GenerationClient, GenerationRequest, GroundingChunk};
use crate::models::ModelConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, thiserror::Error)]
enum GeminiError {
    #[error("Gemini API request failed: {0}")]
    Transport(reqwest::Error),
    #[error("{0}")]
    Http(String),
    #[error("Failed to parse Gemini response: {0}")]
    Parse(reqwest::Error),
    #[error("Gemini API returned no text in the response candidates")]
    EmptyResponse,
}

/// Generation client backed by the Gemini HTTP API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: ModelConfig,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Create a client; a missing or blank key leaves it unavailable
    pub fn new(config: ModelConfig, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!("Gemini API key not found. Set GEMINI_API_KEY; generation features are disabled.");
        }
        Self {
            client,
            config,
            api_key,
        }
    }

    fn build_request(&self, request: &GenerationRequest<'_>) -> GenerateContentRequest {
        let parts = request
            .prompt_parts()
            .into_iter()
            .map(|text| Part { text })
            .collect();

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: request.persona.system_instruction.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
            },
            tools: request
                .grounded_search
                .then(|| vec![Tool { google_search: GoogleSearch {} }]),
        }
    }

    async fn send_request(
        &self,
        api_key: &str,
        body: &GenerateContentRequest,
    ) -> Result<(String, Vec<GroundingChunk>), GeminiError> {
        let url = format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::Transport(e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(GeminiError::Http(map_http_error(status, &body_text)));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| GeminiError::Parse(e.without_url()))?;
        extract_generation(parsed)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Generation {
        let Some(api_key) = self.api_key.as_deref() else {
            return Generation::Unavailable;
        };

        let body = self.build_request(&request);
        debug!(
            agent = %request.persona.id,
            grounded = request.grounded_search,
            model = %self.config.model,
            "Calling Gemini"
        );

        match self.send_request(api_key, &body).await {
            Ok((text, citations)) => Generation::Generated { text, citations },
            Err(e) => {
                warn!(agent = %request.persona.id, error = %e, "Gemini call failed");
                Generation::failed(e.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<ChunkResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkResponse {
    web: Option<SourceResponse>,
    retrieved_context: Option<SourceResponse>,
}

#[derive(Debug, Deserialize)]
struct SourceResponse {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_generation(
    response: GenerateContentResponse,
) -> Result<(String, Vec<GroundingChunk>), GeminiError> {
    let candidate = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or(GeminiError::EmptyResponse)?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GeminiError::EmptyResponse);
    }

    let citations = candidate
        .grounding_metadata
        .map(|metadata| {
            metadata
                .grounding_chunks
                .into_iter()
                .filter_map(to_grounding_chunk)
                .collect()
        })
        .unwrap_or_default();

    Ok((text, citations))
}

fn to_grounding_chunk(chunk: ChunkResponse) -> Option<GroundingChunk> {
    let source_uri = |source: &SourceResponse| source.uri.clone().filter(|uri| !uri.is_empty());

    if let Some(web) = chunk.web {
        if let Some(uri) = source_uri(&web) {
            return Some(GroundingChunk::web(uri, web.title.unwrap_or_default()));
        }
    }
    let retrieved = chunk.retrieved_context?;
    let uri = source_uri(&retrieved)?;
    Some(GroundingChunk::retrieved(
        uri,
        retrieved.title.unwrap_or_default(),
    ))
}

fn map_http_error(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| format!("HTTP {}: {}", status.as_u16(), body))
}
