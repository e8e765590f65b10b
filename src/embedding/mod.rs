//! Embedding generation for transcript chunks and questions.
//!
//! Chunks and questions must be embedded by the same [`Embedder`] so that
//! their vectors are comparable.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text, typically a question.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of the vectors this embedder produces.
    fn dimensions(&self) -> usize;
}
