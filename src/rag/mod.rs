//! RAG (Retrieval-Augmented Generation) for answering questions about a video.
//!
//! A question is embedded, the most relevant transcript chunks are retrieved
//! from the video's index, and a language model answers from that context.

pub mod context;
mod model;
mod response;

pub use context::{ContextBuilder, RetrievalConfig};
pub use model::{LanguageModel, OpenAIChatModel};
pub use response::{RagEngine, RagResponse};

use crate::vector_store::SearchResult;
use serde::Serialize;

/// A retrieved transcript chunk used as answer context.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    /// Video ID.
    pub video_id: String,
    /// Position of the chunk in the transcript.
    pub chunk_order: usize,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            video_id: result.document.video_id,
            chunk_order: result.document.chunk_order,
            content: result.document.content,
            score: result.score,
        }
    }
}

impl ContextChunk {
    /// Leading part of the content for compact display.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}
