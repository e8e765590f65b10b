//! RAG response generation.

use super::context::format_context_for_prompt;
use super::{ContextBuilder, ContextChunk, LanguageModel, RetrievalConfig};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::VectorStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// RAG engine for question answering.
pub struct RagEngine {
    context_builder: ContextBuilder,
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(embedder: Arc<dyn Embedder>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            context_builder: ContextBuilder::new(embedder),
            model,
            prompts: Prompts::default(),
        }
    }

    pub fn with_retrieval(mut self, config: RetrievalConfig) -> Self {
        self.context_builder = self.context_builder.with_config(config);
        self
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Retrieval settings used for every question.
    pub fn retrieval(&self) -> &RetrievalConfig {
        self.context_builder.config()
    }

    /// Answer a question from the given index.
    #[instrument(skip(self, store), fields(question = %question))]
    pub async fn ask(&self, store: &dyn VectorStore, question: &str) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        let sources = self.context_builder.build(store, question).await?;
        let context = format_context_for_prompt(&sources);
        let prompt = self.prompts.render_rag(&context, question);

        let answer = self.model.complete(&prompt).await?;

        debug!("Generated response with {} sources", sources.len());

        Ok(RagResponse { answer, sources })
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Source chunks used for the answer.
    pub sources: Vec<ContextChunk>,
}
