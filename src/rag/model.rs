//! Language model used to generate answers.

use crate::error::{Result, TubechatError};
use crate::openai::OpenAIClient;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Trait for text completion backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a fully rendered prompt and return the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier for display.
    fn name(&self) -> &str;
}

/// OpenAI chat completion model.
pub struct OpenAIChatModel {
    client: OpenAIClient,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIChatModel {
    pub fn new(client: OpenAIClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| TubechatError::Rag(e.to_string()))?
            .into()];

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(messages);
        if let Some(temperature) = self.temperature {
            request.temperature(temperature);
        }
        let request = request.build().map_err(|e| TubechatError::Rag(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| TubechatError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| TubechatError::Rag("Empty response from LLM".to_string()))?;

        debug!("Model returned {} chars", answer.len());
        Ok(answer)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
