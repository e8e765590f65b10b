//! Vector store abstraction for transcript chunks.
//!
//! Provides a trait-based interface for similarity and max-marginal-relevance
//! search over embedded chunks.

mod memory;

pub use memory::MemoryVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Video ID this document belongs to.
    pub video_id: String,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Order of this chunk in the transcript.
    pub chunk_order: usize,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document.
    pub fn new(video_id: String, content: String, embedding: Vec<f32>, chunk_order: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id,
            content,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append documents to the index.
    async fn add_batch(&self, docs: &[Document]) -> Result<usize>;

    /// Search for similar documents.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Select `k` documents out of the `fetch_k` most similar, trading
    /// relevance against redundancy with `lambda_mult` (1.0 = pure relevance).
    async fn max_marginal_relevance_search(
        &self,
        query_embedding: &[f32],
        k: usize,
        fetch_k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<SearchResult>> {
        let candidates = self.search(query_embedding, fetch_k.max(k)).await?;
        let embeddings: Vec<&[f32]> = candidates.iter().map(|c| c.document.embedding.as_slice()).collect();
        let selected = maximal_marginal_relevance(query_embedding, &embeddings, k, lambda_mult);

        let mut candidates: Vec<Option<SearchResult>> = candidates.into_iter().map(Some).collect();
        Ok(selected
            .into_iter()
            .filter_map(|idx| candidates.get_mut(idx).and_then(Option::take))
            .collect())
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Greedy max-marginal-relevance selection.
///
/// Returns indices into `candidates`, in selection order. The first pick is
/// always the candidate most similar to the query; each following pick
/// maximises `lambda * sim(query, d) - (1 - lambda) * max sim(d, selected)`.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[&[f32]],
    k: usize,
    lambda_mult: f32,
) -> Vec<usize> {
    let k = k.min(candidates.len());
    if k == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates.iter().map(|c| cosine_similarity(query, c)).collect();

    let mut selected: Vec<usize> = Vec::with_capacity(k);
    // Highest similarity to any selected candidate, per candidate.
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;

        for (idx, rel) in relevance.iter().enumerate() {
            if selected.contains(&idx) {
                continue;
            }
            let score = if selected.is_empty() {
                *rel
            } else {
                lambda_mult * rel - (1.0 - lambda_mult) * redundancy[idx]
            };
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
        }

        let Some((pick, _)) = best else { break };
        selected.push(pick);

        for (idx, candidate) in candidates.iter().enumerate() {
            let sim = cosine_similarity(candidates[pick], candidate);
            if sim > redundancy[idx] {
                redundancy[idx] = sim;
            }
        }
    }

    selected
}
