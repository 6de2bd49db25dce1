use super::*;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use std::time::Instant;

const SYSTEM_PROMPT: &str = "You write questions for a bluffing trivia party game. \
    Answers must be short, unambiguous facts. Follow the requested output format exactly.";

/// OpenAI provider implementation
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider with the given API key and model
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(config);

        Self {
            client,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl QuestionGenerator for OpenAiProvider {
    async fn generate(&self, categories: &[String]) -> LlmResult<GeneratedQuestion> {
        let start = Instant::now();

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(self.max_tokens)
            .temperature(0.7)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| LlmError::ApiError(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(build_prompt(categories))
                    .build()
                    .map_err(|e| LlmError::ApiError(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        // Timeout is enforced by QuestionSource
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::ParseError("No content in response".to_string()))?;

        tracing::debug!(
            "OpenAI {} replied in {}ms",
            self.model,
            start.elapsed().as_millis()
        );

        parse_generated_question(&text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Only run with actual API key
    async fn test_openai_generate() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let provider = OpenAiProvider::new(api_key, "gpt-4o-mini".to_string(), 250);

        let question = provider.generate(&["geography".to_string()]).await.unwrap();

        assert!(!question.question.is_empty());
        assert!(question.answer.chars().count() >= 2);
        println!("Generated: {:?}", question);
    }
}
