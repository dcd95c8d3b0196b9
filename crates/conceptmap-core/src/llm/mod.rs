//! LLM integration
//!
//! This module provides:
//! - The `CompletionService` capability consumed by the concept-map pipeline
//! - An OpenAI-compatible HTTP client (OpenRouter by default)
//! - Model fallback with automatic retry

mod client;
mod service;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use service::CompletionService;
pub use types::{
    ChatRequest, ChatResponse, Choice, Completion, FinishReason, Message, MessageRole, Usage,
};
