//! Conceptmap Core Library
//!
//! This crate turns study text into a concept map, including:
//! - Entity extraction over a pluggable text tagger
//! - Concept definitions and relationship inference via an LLM
//! - Importance scoring and force-directed layout
//! - LLM integration (OpenRouter API)
//! - Configuration

pub mod concept;
pub mod config;
pub mod error;
pub mod llm;
pub mod tagging;

#[cfg(test)]
mod test_log;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::concept::{
        ConceptEdge, ConceptMap, ConceptMapBuilder, ConceptNode, EntityType, Flashcard,
        SourceDocument,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::llm::{CompletionService, LlmClient};
    pub use crate::tagging::{HeuristicTagger, Tag, TextTagger};
}
