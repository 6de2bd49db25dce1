mod fallback;
mod ollama;
mod openai;

use async_trait::async_trait;
use std::time::Duration;

pub use fallback::fallback_question;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur during question generation
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),

    #[error("Degenerate answer: {0:?}")]
    DegenerateAnswer(String),
}

/// A trivia question with its answer and decoys
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    pub question: String,
    pub answer: String,
    pub alternatives: Vec<String>,
    pub alternate_spellings: Vec<String>,
}

/// Trait that all question providers must implement
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Generate a question about any of the given categories (empty = general knowledge)
    async fn generate(&self, categories: &[String]) -> LlmResult<GeneratedQuestion>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// Prompt shared by all providers; the reply is parsed by [`parse_generated_question`]
pub fn build_prompt(categories: &[String]) -> String {
    let topic = if categories.is_empty() {
        "about any general knowledge topic".to_string()
    } else {
        format!("about {}", categories.join(", "))
    };

    format!(
        "Generate a trivia question {topic}. The question should be challenging but have a definite correct answer.\n\
         The answer should be concise (preferably one word or a short phrase).\n\n\
         Also generate 3 plausible but incorrect alternative answers that players might believe.\n\n\
         Provide the output in this format:\n\
         Question: [your question here]\n\
         CorrectAnswer: [the correct answer here]\n\
         AlternateSpellings: [other accepted spellings of the correct answer, comma separated, or empty]\n\
         Alternative1: [plausible wrong answer 1]\n\
         Alternative2: [plausible wrong answer 2]\n\
         Alternative3: [plausible wrong answer 3]\n\n\
         Make sure the correct answer is specific and definitive - never say \"No answer\" or similar."
    )
}

fn field<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        line.trim()
            .strip_prefix(label)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}

/// Parse the line-oriented reply of a provider
pub fn parse_generated_question(text: &str) -> LlmResult<GeneratedQuestion> {
    let question = field(text, "Question")
        .filter(|q| !q.is_empty())
        .ok_or_else(|| LlmError::ParseError("missing Question line".to_string()))?;
    let answer = field(text, "CorrectAnswer")
        .ok_or_else(|| LlmError::ParseError("missing CorrectAnswer line".to_string()))?;

    if answer.chars().count() < 2 || answer.to_lowercase().contains("no answer") {
        return Err(LlmError::DegenerateAnswer(answer.to_string()));
    }

    let alternatives = (1..=3)
        .filter_map(|i| field(text, &format!("Alternative{i}")))
        .filter(|alt| !alt.is_empty() && !alt.eq_ignore_ascii_case(answer))
        .map(str::to_string)
        .collect();

    let alternate_spellings = field(text, "AlternateSpellings")
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(GeneratedQuestion {
        question: question.to_string(),
        answer: answer.to_string(),
        alternatives,
        alternate_spellings,
    })
}

/// Question generation with a local fallback bank.
///
/// Never fails: provider errors, timeouts and degenerate answers all end in a
/// fallback question.
pub struct QuestionSource {
    generator: Option<Box<dyn QuestionGenerator>>,
    timeout: Duration,
}

impl QuestionSource {
    pub fn new(generator: Option<Box<dyn QuestionGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Only ever serve fallback questions
    pub fn fallback_only() -> Self {
        Self::new(None, Duration::from_secs(30))
    }

    pub async fn next_question(&self, categories: &[String]) -> GeneratedQuestion {
        let Some(generator) = &self.generator else {
            return fallback_question(categories);
        };

        let result = tokio::time::timeout(self.timeout, generator.generate(categories))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))
            .and_then(|r| r);

        match result {
            Ok(question) if question.answer.trim().chars().count() >= 2 => {
                tracing::info!(
                    "Question generated by {}: {:?}",
                    generator.name(),
                    question.question
                );
                question
            }
            Ok(question) => {
                tracing::warn!(
                    "Provider {} returned degenerate answer {:?}, using fallback",
                    generator.name(),
                    question.answer
                );
                fallback_question(categories)
            }
            Err(e) => {
                tracing::warn!(
                    "Provider {} failed: {}, using fallback question",
                    generator.name(),
                    e
                );
                fallback_question(categories)
            }
        }
    }
}

/// Configuration for question providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// OpenAI model to use
    pub openai_model: String,
    /// Ollama base URL
    pub ollama_base_url: Option<String>,
    /// Ollama model to use
    pub ollama_model: String,
    /// Timeout for one generation request
    pub default_timeout: Duration,
    /// Max tokens for one reply
    pub default_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            ollama_base_url: None,
            ollama_model: "llama3.2".to_string(),
            default_timeout: Duration::from_secs(15),
            default_max_tokens: 250,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl LlmConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai_api_key: env_string("OPENAI_API_KEY"),
            openai_model: env_string("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            ollama_base_url: env_string("OLLAMA_BASE_URL"),
            ollama_model: env_string("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            default_timeout: std::env::var("LLM_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_timeout),
            default_max_tokens: std::env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_max_tokens),
        }
    }

    /// Build the configured provider, preferring OpenAI over Ollama
    pub fn build_generator(&self) -> LlmResult<Box<dyn QuestionGenerator>> {
        if let Some(api_key) = &self.openai_api_key {
            return Ok(Box::new(OpenAiProvider::new(
                api_key.clone(),
                self.openai_model.clone(),
                self.default_max_tokens,
            )));
        }

        if let Some(base_url) = &self.ollama_base_url {
            return Ok(Box::new(OllamaProvider::new(
                base_url.clone(),
                self.ollama_model.clone(),
                self.default_max_tokens,
                self.default_timeout,
            )));
        }

        Err(LlmError::ConfigError(
            "No question provider configured. Set OPENAI_API_KEY or OLLAMA_BASE_URL".to_string(),
        ))
    }

    /// A question source for this config; falls back to the static bank if no provider is set
    pub fn build_source(&self) -> QuestionSource {
        match self.build_generator() {
            Ok(generator) => {
                tracing::info!("Question provider {} initialized", generator.name());
                QuestionSource::new(Some(generator), self.default_timeout)
            }
            Err(e) => {
                tracing::warn!("{}. Using fallback questions only.", e);
                QuestionSource::new(None, self.default_timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct Scripted(LlmResult<GeneratedQuestion>);

    #[async_trait]
    impl QuestionGenerator for Scripted {
        async fn generate(&self, _categories: &[String]) -> LlmResult<GeneratedQuestion> {
            match &self.0 {
                Ok(q) => Ok(q.clone()),
                Err(e) => Err(LlmError::ApiError(e.to_string())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct Stalled;

    #[async_trait]
    impl QuestionGenerator for Stalled {
        async fn generate(&self, _categories: &[String]) -> LlmResult<GeneratedQuestion> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(LlmError::ApiError("unreachable".to_string()))
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    fn generated(answer: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            question: "Which metal has the symbol Au?".to_string(),
            answer: answer.to_string(),
            alternatives: vec!["Silver".to_string()],
            alternate_spellings: vec![],
        }
    }

    #[test]
    fn test_parse_full_reply() {
        let reply = "Question: What is the largest ocean?\n\
                     CorrectAnswer: Pacific\n\
                     AlternateSpellings: Pacific Ocean, the Pacific\n\
                     Alternative1: Atlantic\n\
                     Alternative2: Indian\n\
                     Alternative3: Arctic\n";
        let parsed = parse_generated_question(reply).unwrap();
        assert_eq!(parsed.question, "What is the largest ocean?");
        assert_eq!(parsed.answer, "Pacific");
        assert_eq!(parsed.alternatives, vec!["Atlantic", "Indian", "Arctic"]);
        assert_eq!(parsed.alternate_spellings, vec!["Pacific Ocean", "the Pacific"]);
    }

    #[test]
    fn test_parse_tolerates_missing_alternatives() {
        let reply = "  Question: Who wrote Hamlet?\nCorrectAnswer: Shakespeare\nAlternative2: Marlowe";
        let parsed = parse_generated_question(reply).unwrap();
        assert_eq!(parsed.alternatives, vec!["Marlowe"]);
        assert!(parsed.alternate_spellings.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_question() {
        let result = parse_generated_question("CorrectAnswer: Paris");
        assert!(matches!(result, Err(LlmError::ParseError(_))));
    }

    #[test]
    fn test_parse_rejects_degenerate_answers() {
        for answer in ["", "X", "No answer", "There is no answer"] {
            let reply = format!("Question: Anything?\nCorrectAnswer: {answer}");
            let result = parse_generated_question(&reply);
            assert!(
                matches!(result, Err(LlmError::DegenerateAnswer(_))),
                "{answer:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_drops_alternatives_equal_to_answer() {
        let reply = "Question: Capital of Italy?\nCorrectAnswer: Rome\nAlternative1: rome\nAlternative2: Milan";
        let parsed = parse_generated_question(reply).unwrap();
        assert_eq!(parsed.alternatives, vec!["Milan"]);
    }

    #[test]
    fn test_prompt_mentions_categories() {
        let prompt = build_prompt(&["science".to_string(), "history".to_string()]);
        assert!(prompt.contains("about science, history"));
        assert!(build_prompt(&[]).contains("general knowledge"));
    }

    #[tokio::test]
    async fn test_source_uses_generator() {
        let source = QuestionSource::new(
            Some(Box::new(Scripted(Ok(generated("Gold"))))),
            Duration::from_secs(1),
        );
        let question = source.next_question(&[]).await;
        assert_eq!(question.answer, "Gold");
    }

    #[tokio::test]
    async fn test_source_falls_back_on_error() {
        let source = QuestionSource::new(
            Some(Box::new(Scripted(Err(LlmError::ApiError("500".to_string()))))),
            Duration::from_secs(1),
        );
        let question = source.next_question(&[]).await;
        assert!(!question.question.is_empty());
        assert!(question.answer.chars().count() >= 2);
    }

    #[tokio::test]
    async fn test_source_falls_back_on_degenerate_answer() {
        let source = QuestionSource::new(
            Some(Box::new(Scripted(Ok(generated(" "))))),
            Duration::from_secs(1),
        );
        let question = source.next_question(&[]).await;
        assert_ne!(question.answer.trim(), "");
    }

    #[tokio::test]
    async fn test_source_falls_back_on_timeout() {
        let source = QuestionSource::new(Some(Box::new(Stalled)), Duration::from_millis(20));
        let question = source.next_question(&[]).await;
        assert!(!question.answer.is_empty());
    }

    #[test]
    #[serial]
    fn test_default_config() {
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("OLLAMA_BASE_URL");
        let config = LlmConfig::from_env();
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.ollama_model, "llama3.2");
        assert!(config.build_generator().is_err());
    }

    #[test]
    #[serial]
    fn test_blank_api_key_is_ignored() {
        std::env::set_var("OPENAI_API_KEY", "   ");
        let config = LlmConfig::from_env();
        assert!(config.openai_api_key.is_none());
        std::env::remove_var("OPENAI_API_KEY");
    }
}
