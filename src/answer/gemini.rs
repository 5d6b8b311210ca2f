use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::GenerationSettings;
use crate::core::errors::ApiError;

/// Sampling parameters applied to every generation attempt.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generates text for a prompt with one specific model. Any failure
    /// (transport, timeout, unsupported model, quota) surfaces as an error
    /// so the caller can move on to the next model.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: SamplingParams,
    ) -> Result<String, ApiError>;
}

/// Gemini REST client (`models/{model}:generateContent`).
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(settings: &GenerationSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: SamplingParams,
    ) -> Result<String, ApiError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_output_tokens,
            },
        });

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "generation request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if text.is_empty() {
            return Err(ApiError::Upstream(
                "generation response contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}
