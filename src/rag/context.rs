//! Context retrieval for RAG responses.

use super::ContextChunk;
use crate::config::{RetrievalSettings, SearchType};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::debug;

/// How many chunks to retrieve and how.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    pub search_type: SearchType,
    pub k: usize,
    pub fetch_k: usize,
    pub lambda_mult: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_type: SearchType::Similarity,
            k: 4,
            fetch_k: 20,
            lambda_mult: 0.5,
        }
    }
}

impl From<&RetrievalSettings> for RetrievalConfig {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            search_type: settings.search_type,
            k: settings.k,
            fetch_k: settings.fetch_k,
            lambda_mult: settings.lambda_mult,
        }
    }
}

/// Builds context for a question from a video index.
pub struct ContextBuilder {
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            config: RetrievalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve context chunks for a query.
    pub async fn build(&self, store: &dyn VectorStore, query: &str) -> Result<Vec<ContextChunk>> {
        let query_embedding = self.embedder.embed(query).await?;

        let results = match self.config.search_type {
            SearchType::Similarity => store.search(&query_embedding, self.config.k).await?,
            SearchType::Mmr => {
                store
                    .max_marginal_relevance_search(
                        &query_embedding,
                        self.config.k,
                        self.config.fetch_k,
                        self.config.lambda_mult,
                    )
                    .await?
            }
        };

        debug!(
            "Retrieved {} chunks with {} search",
            results.len(),
            self.config.search_type
        );

        Ok(results.into_iter().map(ContextChunk::from).collect())
    }
}

/// Join chunk contents for insertion into the prompt.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
