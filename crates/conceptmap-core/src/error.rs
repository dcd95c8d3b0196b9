//! Error types for Conceptmap

use thiserror::Error;

/// Result type alias using Conceptmap's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Conceptmap error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Completion request failed: {0}")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("No suitable model available: {0}")]
    NoSuitableModel(String),

    // Tagging errors (E200-E299)
    #[error("Text tagging failed: {0}")]
    TaggingFailed(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Serialization errors (E900-E999)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::NoSuitableModel(_) => "E103",
            Self::TaggingFailed(_) => "E200",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Serialization(_) => "E900",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("conceptmap config get llm.api_key".to_string()),
            Self::NoSuitableModel(_) => {
                Some("conceptmap config set llm.fallback_models <models>".to_string())
            }
            Self::ConfigError(_) => Some("conceptmap config list".to_string()),
            _ => None,
        }
    }

    /// Whether the failure came from an upstream capability (tagger or completion service)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_)
                | Self::LLMError(_)
                | Self::RateLimited(_)
                | Self::NoSuitableModel(_)
                | Self::TaggingFailed(_)
        )
    }
}
