//! Error types for Finn.

use thiserror::Error;

/// Library-level error type for Finn operations.
#[derive(Error, Debug)]
pub enum FinnError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("No indexed transcripts found in {0}")]
    EmptyCorpus(String),

    #[error("Caption parse failure: {0}")]
    ParseFailure(String),

    #[error("Malformed embedding for document {id}: {reason}")]
    MalformedEmbedding { id: String, reason: String },

    #[error("Caption source error: {0}")]
    CaptionSource(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FinnError {
    /// Whether this error means a collaborator could not be reached,
    /// which callers answer with a degraded response instead of failing.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            FinnError::ProviderUnavailable(_)
                | FinnError::Embedding(_)
                | FinnError::OpenAI(_)
                | FinnError::Http(_)
                | FinnError::Timeout(_)
        )
    }
}

/// Result type alias for Finn operations.
pub type Result<T> = std::result::Result<T, FinnError>;
