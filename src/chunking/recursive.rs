//! Recursive separator-based chunking.
//!
//! Text is split on the coarsest separator present (paragraphs, then lines,
//! then sentences, then words, then characters). Pieces that are still too
//! large are split again with the next finer separator, and small pieces are
//! greedily merged back up to the chunk size. Each new chunk starts with the
//! last words of the previous one, up to the overlap size.

use super::{Chunker, ChunkingConfig, TextChunk};
use crate::error::{Result, TubechatError};
use tracing::debug;

const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "? ", "! ", " ", ""];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Recursive character chunker.
pub struct RecursiveChunker {
    separators: Vec<String>,
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursiveChunker {
    pub fn new() -> Self {
        Self {
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Split on `separator`, leaving it attached to the end of each piece.
    fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
        if separator.is_empty() {
            return text.chars().map(String::from).collect();
        }

        text.split_inclusive(separator)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Split `text` into pieces small enough to be merged into chunks, using
    /// finer separators only where a piece is too large.
    fn split_pieces(&self, text: &str, separators: &[String], config: &ChunkingConfig) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];

        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.as_str();
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut pieces = Vec::new();
        for piece in Self::split_keeping_separator(text, separator) {
            // Leave room for the overlap carried into the chunk holding this piece.
            if char_len(&piece) + config.chunk_overlap <= config.chunk_size || finer.is_empty() {
                pieces.push(piece);
            } else {
                pieces.extend(self.split_pieces(&piece, finer, config));
            }
        }

        pieces
    }

    /// Greedily merge small pieces into chunks of at most `chunk_size`
    /// characters. Every chunk after the first is seeded with the tail of the
    /// previous one from [`overlap_tail`].
    fn merge(pieces: &[String], config: &ChunkingConfig) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if !current.is_empty() && total + len > config.chunk_size {
                let chunk = current.trim();
                if !chunk.is_empty() {
                    chunks.push(chunk.to_string());
                }

                current = overlap_tail(&current, config.chunk_overlap);
                total = char_len(&current);
            }

            current.push_str(piece);
            total += len;
        }

        let chunk = current.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        chunks
    }
}

/// The longest run of whole words at the end of `text` that fits in `limit`
/// characters. Falls back to the last `limit` characters when the final word
/// alone is longer than that.
fn overlap_tail(text: &str, limit: usize) -> String {
    let body = text.trim_end();
    if limit == 0 || body.is_empty() {
        return String::new();
    }

    let mut remaining = char_len(text);
    let mut after_space = true;
    for (i, c) in text.char_indices() {
        if after_space && !c.is_whitespace() && remaining <= limit {
            return text[i..].to_string();
        }
        after_space = c.is_whitespace();
        remaining -= 1;
    }

    let skip = char_len(body).saturating_sub(limit);
    body.chars().skip(skip).collect()
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>> {
        if config.chunk_size == 0 {
            return Err(TubechatError::InvalidInput("chunk_size must be positive".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(TubechatError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        let pieces = self.split_pieces(text, &self.separators, config);
        let chunks: Vec<TextChunk> = Self::merge(&pieces, config)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .enumerate()
            .map(|(order, content)| TextChunk::new(content, order))
            .collect();

        debug!(
            "Split {} chars into {} chunks (size {}, overlap {})",
            char_len(text),
            chunks.len(),
            config.chunk_size,
            config.chunk_overlap
        );

        Ok(chunks)
    }
}
