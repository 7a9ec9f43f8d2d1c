// src/interview/generator.rs — Timeout-bound text generation for the interview

use std::sync::Arc;
use std::time::Duration;

use super::prompts;
use super::session::Turn;
use super::topics;
use crate::infra::errors::WinearError;
use crate::provider::{ChatRequest, ModelProvider};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Produces questions and summaries from the text oracle.
///
/// Every call is one completion bounded by `timeout`. Nothing is retried here;
/// failures surface as `GenerationTimeout` / `GenerationFailure`.
pub struct QuestionGenerator {
    provider: Arc<dyn ModelProvider>,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl QuestionGenerator {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: Some(DEFAULT_TEMPERATURE),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Next interview question for the given history.
    pub async fn generate_question(&self, history: &[Turn]) -> Result<String, WinearError> {
        self.complete(topics::question_context(history), "question")
            .await
    }

    pub async fn draft_summary(&self, history: &[Turn]) -> Result<String, WinearError> {
        self.complete(prompts::draft_summary_prompt(history), "draft_summary")
            .await
    }

    pub async fn final_summary(&self, history: &[Turn]) -> Result<String, WinearError> {
        self.complete(prompts::final_summary_prompt(history), "final_summary")
            .await
    }

    async fn complete(&self, prompt: String, purpose: &'static str) -> Result<String, WinearError> {
        let mut request = ChatRequest::prompt(self.model.clone(), prompt);
        request.temperature = self.temperature;

        let started = std::time::Instant::now();
        let response = match tokio::time::timeout(self.timeout, self.provider.chat(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(provider = self.provider.id(), purpose, "Generation failed: {}", e);
                return Err(WinearError::GenerationFailure {
                    message: e.to_string(),
                });
            }
            Err(_) => {
                tracing::warn!(
                    provider = self.provider.id(),
                    purpose,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Generation timed out"
                );
                return Err(WinearError::GenerationTimeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let content = response.content.trim();
        if content.is_empty() {
            return Err(WinearError::GenerationFailure {
                message: format!("{} returned an empty completion", self.provider.id()),
            });
        }

        tracing::debug!(
            purpose,
            tokens = response.usage.total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(content.to_string())
    }
}
