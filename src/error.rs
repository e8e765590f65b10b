//! Error types for tubechat.

use thiserror::Error;

/// Message shown when no video identifier can be found in the input.
pub const VIDEO_ID_NOT_FOUND: &str = "No YouTube video ID found for this URL! Please check the URL";

/// Library-level error type for tubechat operations.
#[derive(Error, Debug)]
pub enum TubechatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{}", VIDEO_ID_NOT_FOUND)]
    VideoIdNotFound,

    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript found for video {video_id} in languages {languages:?}")]
    NoTranscriptFound {
        video_id: String,
        languages: Vec<String>,
    },

    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("Failed to fetch transcript in {languages}. Error: {error}")]
    TranscriptFetchFailed { languages: String, error: String },

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TubechatError {
    /// Whether the error came from caption retrieval (as opposed to indexing or answering).
    pub fn is_caption_error(&self) -> bool {
        matches!(
            self,
            TubechatError::TranscriptsDisabled(_)
                | TubechatError::NoTranscriptFound { .. }
                | TubechatError::TranscriptUnavailable(_)
                | TubechatError::TranscriptFetchFailed { .. }
        )
    }
}

/// Result type alias for tubechat operations.
pub type Result<T> = std::result::Result<T, TubechatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_not_found_message() {
        assert_eq!(TubechatError::VideoIdNotFound.to_string(), VIDEO_ID_NOT_FOUND);
    }

    #[test]
    fn test_caption_error_classification() {
        assert!(TubechatError::TranscriptsDisabled("abc".into()).is_caption_error());
        assert!(TubechatError::TranscriptFetchFailed {
            languages: "English or Hindi".into(),
            error: "x".into(),
        }
        .is_caption_error());
        assert!(!TubechatError::Embedding("x".into()).is_caption_error());
    }
}
