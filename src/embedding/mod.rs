//! Embedding generation for semantic search.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Truncate text to at most `max_chars` characters, on a char boundary.
pub fn truncate_input(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the configured embedder, or `None` when embeddings are disabled or no
/// API key is available.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Option<Arc<dyn Embedder>>> {
    if !settings.is_enabled() {
        info!("Embedding provider disabled; using lexical search only");
        return Ok(None);
    }
    if !crate::openai::api_key_present() {
        info!("{} not set; using lexical search only", crate::openai::API_KEY_ENV);
        return Ok(None);
    }

    match settings.provider.to_lowercase().as_str() {
        "openai" => Ok(Some(Arc::new(OpenAIEmbedder::from_settings(settings)?))),
        other => Err(crate::error::FinnError::Config(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}
