//! OpenAI client configuration with sensible defaults.

use crate::config::OpenAISettings;
use crate::error::{Result, TubechatError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Shared client type for embeddings and chat completions.
pub type OpenAIClient = Client<OpenAIConfig>;

/// Create an OpenAI client from settings.
///
/// The API key is read from `OPENAI_API_KEY`; `api_base` points the client at
/// an OpenAI-compatible server instead.
pub fn create_client(settings: &OpenAISettings) -> Result<OpenAIClient> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| TubechatError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::default();
    if let Some(base) = settings.api_base.as_deref().filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
