use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::credentials::Credential;
use crate::error::ProviderError;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_THINKING_BUDGET: u32 = 1000;

/// Text generation backend: prompt in, text out. `Ok(None)` means the call
/// succeeded but produced no text.
#[async_trait]
pub trait TextProvider: Send + Sync {
    async fn generate_text(
        &self,
        credential: &Credential,
        prompt: &str,
        thinking_budget: u32,
    ) -> Result<Option<String>, ProviderError>;
}

pub struct GeminiProvider {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn generate_text(
        &self,
        credential: &Credential,
        prompt: &str,
        thinking_budget: u32,
    ) -> Result<Option<String>, ProviderError> {
        let body = json!({
            "contents": [
                { "role": "user", "parts": [{ "text": prompt }] }
            ],
            "generationConfig": {
                "thinkingConfig": { "thinkingBudget": thinking_budget }
            }
        });

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", credential.secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Api { status, body: text });
        }

        extract_text(&text)
    }
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Joins the non-thought text parts of the first candidate.
fn extract_text(raw: &str) -> Result<Option<String>, ProviderError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(raw).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Ok(None);
    };

    let text: String = candidate
        .content
        .parts
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}
