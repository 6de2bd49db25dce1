use super::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Ollama provider implementation
pub struct OllamaProvider {
    base_url: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the given base URL and model
    pub fn new(base_url: String, model: String, max_tokens: u32, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build Ollama HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
            client,
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl QuestionGenerator for OllamaProvider {
    async fn generate(&self, categories: &[String]) -> LlmResult<GeneratedQuestion> {
        let start = Instant::now();

        let body = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: build_prompt(categories),
            stream: false,
            options: OllamaOptions {
                num_predict: self.max_tokens,
                temperature: 0.7,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiError(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LlmError::ApiError(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let reply: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        tracing::debug!(
            "Ollama {} replied in {}ms",
            self.model,
            start.elapsed().as_millis()
        );

        parse_generated_question(&reply.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
