//! OpenAI embeddings implementation.

use super::{truncate_input, Embedder};
use crate::config::EmbeddingSettings;
use crate::error::{FinnError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::error::OpenAIError;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// OpenAI caps the number of inputs per request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    max_input_chars: usize,
    max_retries: u32,
}

impl OpenAIEmbedder {
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let client =
            create_client_with_timeout(Duration::from_secs(settings.request_timeout_secs))?;
        Ok(Self {
            client,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
            max_input_chars: settings.max_input_chars,
            max_retries: settings.max_retries,
        })
    }

    async fn request(&self, input: Vec<String>) -> std::result::Result<Vec<Vec<f32>>, OpenAIError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(input))
            .dimensions(self.dimensions as u32)
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }

    /// Send one batch, retrying transient failures with exponential backoff.
    async fn request_with_retry(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0;
        loop {
            match self.request(input.clone()).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(err) if is_retryable(&err) && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = retry_backoff(attempt);
                    warn!("Embedding request failed ({}), retrying in {:?}", err, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(FinnError::OpenAI(format!("Embedding API error: {}", err)));
                }
            }
        }
    }
}

fn is_retryable(err: &OpenAIError) -> bool {
    match err {
        OpenAIError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        OpenAIError::ApiError(api) => {
            api.r#type.as_deref() == Some("server_error")
                || api.code.as_deref() == Some("rate_limit_exceeded")
        }
        _ => false,
    }
}

fn retry_backoff(attempt: u32) -> Duration {
    let capped = attempt.min(5);
    Duration::from_millis(500 * (1 << capped))
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| FinnError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let input: Vec<String> = chunk
                .iter()
                .map(|t| truncate_input(t, self.max_input_chars).to_string())
                .collect();

            let embeddings = self.request_with_retry(input).await?;
            if embeddings.len() != chunk.len() {
                return Err(FinnError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    embeddings.len()
                )));
            }
            all_embeddings.extend(embeddings);
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
