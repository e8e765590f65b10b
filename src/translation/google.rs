//! Google Translate web endpoint.

use super::Translator;
use crate::error::{Result, TubechatError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Translator backed by the public `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: Url,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self> {
        Self::with_base_url("https://translate.googleapis.com")
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            TubechatError::Config(format!("Invalid translation base URL '{}': {}", base_url, e))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    /// Concatenate the translated sentences of a response.
    ///
    /// The response is a nested array whose first element lists
    /// `[translated, original, ...]` entries, one per sentence.
    fn parse_response(body: &Value) -> Result<String> {
        let sentences = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| TubechatError::Translation("Unexpected response format".to_string()))?;

        let text: String = sentences
            .iter()
            .filter_map(|s| s.get(0).and_then(Value::as_str))
            .collect();

        if text.is_empty() {
            return Err(TubechatError::Translation("Empty translation".to_string()));
        }

        Ok(text)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let url = self
            .base_url
            .join("translate_a/single")
            .map_err(|e| TubechatError::Translation(format!("Invalid endpoint: {}", e)))?;

        debug!("Translating {} chars {} -> {}", text.chars().count(), source, target);

        let response = self
            .client
            .post(url)
            .query(&[("client", "gtx"), ("sl", source), ("tl", target), ("dt", "t")])
            .form(&[("q", text)])
            .send()
            .await
            .map_err(|e| TubechatError::Translation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TubechatError::Translation(format!(
                "Translation endpoint returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TubechatError::Translation(format!("Invalid response: {}", e)))?;

        Self::parse_response(&body)
    }
}
