//! In-memory vector store implementation.

use super::{cosine_similarity, Document, SearchResult, VectorStore};
use crate::error::{Result, TubechatError};
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

fn poisoned<T>(_: PoisonError<T>) -> TubechatError {
    TubechatError::VectorStore("Vector store lock poisoned".to_string())
}

/// In-memory vector store. Documents are kept in insertion order so that
/// equal scores rank earlier chunks first.
pub struct MemoryVectorStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_batch(&self, docs: &[Document]) -> Result<usize> {
        self.documents.write().map_err(poisoned)?.extend_from_slice(docs);
        Ok(docs.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let docs = self.documents.read().map_err(poisoned)?;

        let mut results: Vec<SearchResult> = docs
            .iter()
            .map(|doc| SearchResult {
                document: doc.clone(),
                score: cosine_similarity(query_embedding, &doc.embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

}
