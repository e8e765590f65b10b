//! English-first transcript retrieval with a translated fallback.

use super::{CaptionSource, Transcript};
use crate::error::{Result, TubechatError};
use crate::translation::{language_name, ParallelTranslator};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of one transcript retrieval attempt.
#[derive(Debug, Clone)]
pub enum TranscriptOutcome {
    /// Captions in the primary language.
    Primary(Transcript),
    /// Primary captions failed; fallback captions were translated.
    Fallback {
        transcript: Transcript,
        primary_error: String,
    },
    /// Neither language could be fetched.
    Failed {
        /// The languages tried, e.g. `English or Hindi`.
        languages: String,
        primary_error: String,
        fallback_error: String,
    },
}

impl TranscriptOutcome {
    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            TranscriptOutcome::Primary(t) | TranscriptOutcome::Fallback { transcript: t, .. } => Some(t),
            TranscriptOutcome::Failed { .. } => None,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, TranscriptOutcome::Fallback { .. })
    }

    /// Convert into a transcript, reporting the fallback error when both attempts failed.
    pub fn into_result(self) -> Result<Transcript> {
        match self {
            TranscriptOutcome::Primary(t) | TranscriptOutcome::Fallback { transcript: t, .. } => Ok(t),
            TranscriptOutcome::Failed {
                languages,
                fallback_error,
                ..
            } => Err(TubechatError::TranscriptFetchFailed {
                languages,
                error: fallback_error,
            }),
        }
    }
}

fn display_language(code: &str) -> &str {
    language_name(code).unwrap_or(code)
}

/// Fetches a transcript in the primary language, falling back to another
/// caption language and translating it into the target language.
pub struct TranscriptFetcher {
    source: Arc<dyn CaptionSource>,
    translator: Arc<ParallelTranslator>,
    primary_language: String,
    fallback_language: String,
    target_language: String,
}

impl TranscriptFetcher {
    /// Create a fetcher with English primary, Hindi fallback and English target.
    pub fn new(source: Arc<dyn CaptionSource>, translator: Arc<ParallelTranslator>) -> Self {
        Self {
            source,
            translator,
            primary_language: "en".to_string(),
            fallback_language: "hi".to_string(),
            target_language: "en".to_string(),
        }
    }

    pub fn with_languages(
        mut self,
        primary: impl Into<String>,
        fallback: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.primary_language = primary.into();
        self.fallback_language = fallback.into();
        self.target_language = target.into();
        self
    }

    /// Fetch the transcript for a video id. Never fails: failures are reported
    /// through [`TranscriptOutcome::Failed`].
    #[instrument(skip(self))]
    pub async fn fetch(&self, video_id: &str) -> TranscriptOutcome {
        let primary_error = match self.source.fetch(video_id, &[self.primary_language.as_str()]).await {
            Ok(segments) => {
                let transcript = Transcript::from_segments(video_id, &self.primary_language, &segments);
                info!(
                    "Fetched {} transcript for {} ({} chars)",
                    self.primary_language,
                    video_id,
                    transcript.char_count()
                );
                return TranscriptOutcome::Primary(transcript);
            }
            Err(e) => e.to_string(),
        };

        warn!(
            "{} transcript unavailable for {}: {}; trying {}",
            self.primary_language, video_id, primary_error, self.fallback_language
        );

        match self.source.fetch(video_id, &[self.fallback_language.as_str()]).await {
            Ok(segments) => {
                let original = Transcript::from_segments(video_id, &self.fallback_language, &segments);
                info!(
                    "Fetched {} transcript for {} ({} chars), translating to {}",
                    self.fallback_language,
                    video_id,
                    original.char_count(),
                    self.target_language
                );

                let text = self
                    .translator
                    .translate_text(&original.text, &self.target_language)
                    .await;

                TranscriptOutcome::Fallback {
                    transcript: Transcript {
                        text,
                        language: self.target_language.clone(),
                        translated_from: Some(self.fallback_language.clone()),
                        ..original
                    },
                    primary_error,
                }
            }
            Err(e) => {
                warn!("{} transcript unavailable for {}: {}", self.fallback_language, video_id, e);
                TranscriptOutcome::Failed {
                    languages: format!(
                        "{} or {}",
                        display_language(&self.primary_language),
                        display_language(&self.fallback_language)
                    ),
                    primary_error,
                    fallback_error: e.to_string(),
                }
            }
        }
    }
}
