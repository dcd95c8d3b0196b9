//! Completion capability used by the concept-map pipeline
//!
//! The pipeline only ever needs "prompt in, text out". Keeping that behind a
//! trait lets tests script responses and lets hosts plug in an on-device model.

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;

use super::client::LlmClient;
use super::types::Message;

const COMPLETION_SYSTEM_PROMPT: &str = "You are a concise study assistant. \
Follow the requested output format exactly and do not add commentary.";

/// Opaque text-completion capability
///
/// Implementations must be reentrant: the pipeline may issue several
/// requests concurrently against one instance.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `prompt`, producing at most `max_tokens` tokens
    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String>;
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let messages = vec![
            Message::system(COMPLETION_SYSTEM_PROMPT),
            Message::user(prompt),
        ];

        let completion = self.complete_with_fallback(messages, Some(max_tokens)).await?;
        if completion.is_truncated() {
            warn!(model = %completion.model, max_tokens, "Completion hit the token limit");
        }
        Ok(completion.text)
    }
}
