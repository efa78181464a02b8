//! OpenAI client configuration.

use crate::error::{FinnError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Whether an API key is available in the environment.
pub fn api_key_present() -> bool {
    std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty())
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| FinnError::ProviderUnavailable(format!("HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}
