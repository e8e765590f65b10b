//! Splitting transcripts into overlapping, size-bounded chunks for indexing.

mod recursive;

pub use recursive::RecursiveChunker;

use crate::config::ChunkingSettings;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A chunk of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Position of this chunk in the transcript.
    pub order: usize,
}

impl TextChunk {
    pub fn new(content: impl Into<String>, order: usize) -> Self {
        Self {
            content: content.into(),
            order,
        }
    }

    /// Length in characters.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

/// Trait for chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split text into ordered chunks.
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>>;
}
