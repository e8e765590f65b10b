//! Transcript acquisition for YouTube videos.
//!
//! A [`CaptionSource`] returns timed caption records for a video in one of a
//! set of languages. The [`TranscriptFetcher`] layers the English-first,
//! Hindi-fallback policy on top and routes fallback captions through the
//! translator.

mod fetcher;
mod youtube;

pub use fetcher::{TranscriptFetcher, TranscriptOutcome};
pub use youtube::YoutubeCaptionSource;

use crate::error::{Result, TubechatError};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11}).*").expect("Invalid regex"));

/// Extract the 11-character video identifier from a YouTube URL.
///
/// Accepts `watch?v=`, `youtu.be/`, `embed/` and `shorts/` forms. A bare id
/// is not a URL and is rejected.
pub fn extract_video_id(url: &str) -> Result<String> {
    VIDEO_ID_REGEX
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(TubechatError::VideoIdNotFound)
}

/// A single timed caption record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// Caption text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl CaptionSegment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// The full text of a processed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Video this transcript belongs to.
    pub video_id: String,
    /// Caption text joined with single spaces.
    pub text: String,
    /// Language code of `text`.
    pub language: String,
    /// Original caption language when `text` is a translation.
    pub translated_from: Option<String>,
    /// Number of caption records the text was built from.
    pub segment_count: usize,
}

impl Transcript {
    /// Build a transcript from caption records.
    pub fn from_segments(video_id: &str, language: &str, segments: &[CaptionSegment]) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            video_id: video_id.to_string(),
            text,
            language: language.to_string(),
            translated_from: None,
            segment_count: segments.len(),
        }
    }

    /// Length of the text in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Trait for caption providers.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch captions for a video in the first available of `languages`.
    ///
    /// Fails with [`TubechatError::TranscriptsDisabled`] when the video has no
    /// captions at all and [`TubechatError::NoTranscriptFound`] when none of the
    /// requested languages exists.
    async fn fetch(&self, video_id: &str, languages: &[&str]) -> Result<Vec<CaptionSegment>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VIDEO_ID_NOT_FOUND;

    #[test]
    fn test_extract_video_id() {
        let id = Some("dQw4w9WgXcQ".to_string());

        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ").ok(), id);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").ok(), id);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s&list=PL123").ok(),
            id
        );
        assert_eq!(extract_video_id("https://youtube.com/embed/dQw4w9WgXcQ").ok(), id);
        assert_eq!(extract_video_id("https://youtube.com/shorts/dQw4w9WgXcQ").ok(), id);
        assert_eq!(extract_video_id("  https://youtu.be/dQw4w9WgXcQ?si=abc  ").ok(), id);
    }

    #[test]
    fn test_extract_video_id_not_found() {
        for input in ["", "not a url", "dQw4w9WgXcQ", "https://youtu.be/short", "https://example.com"] {
            let err = extract_video_id(input).unwrap_err();
            assert_eq!(err.to_string(), VIDEO_ID_NOT_FOUND, "input: {:?}", input);
        }
    }

    #[test]
    fn test_transcript_from_segments() {
        let segments = vec![
            CaptionSegment::new("Hello world", 0.0, 2.0),
            CaptionSegment::new("  ", 2.0, 1.0),
            CaptionSegment::new(" this is a test ", 3.0, 2.5),
        ];

        let transcript = Transcript::from_segments("abc", "en", &segments);
        assert_eq!(transcript.text, "Hello world this is a test");
        assert_eq!(transcript.segment_count, 3);
        assert_eq!(transcript.char_count(), 26);
        assert!(transcript.translated_from.is_none());
    }
}
