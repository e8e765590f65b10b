//! Translation of fallback transcripts into the target language.
//!
//! Long text is word-wrapped into pieces no longer than `max_chars`, each piece
//! is language-detected and translated independently with bounded concurrency,
//! and the results are re-joined in their original order.

mod detect;
mod google;

pub use detect::{language_name, WhatlangDetector};
pub use google::GoogleTranslator;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Source language passed to the translator when detection fails.
pub const AUTO_DETECT: &str = "auto";

/// Trait for translation backends.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` (or [`AUTO_DETECT`]) into `target`.
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

/// Trait for language identification.
pub trait LanguageDetector: Send + Sync {
    /// Detect the language of `text` as a lowercase language code.
    fn detect(&self, text: &str) -> Option<String>;
}

/// Split text into whitespace-delimited pieces of at most `max_chars` characters.
///
/// Words are never split unless a single word is longer than `max_chars`, in
/// which case it is broken into `max_chars`-sized parts.
pub fn split_into_pieces(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            let mut parts: Vec<String> = chars.chunks(max_chars).map(|c| c.iter().collect()).collect();
            current = parts.pop().unwrap_or_default();
            current_len = current.chars().count();
            pieces.extend(parts);
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len > max_chars {
            pieces.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

/// Translates long text piece by piece with a bounded number of requests in flight.
pub struct ParallelTranslator {
    translator: Arc<dyn Translator>,
    detector: Arc<dyn LanguageDetector>,
    max_chars: usize,
    max_workers: usize,
}

impl ParallelTranslator {
    pub fn new(translator: Arc<dyn Translator>, detector: Arc<dyn LanguageDetector>) -> Self {
        Self {
            translator,
            detector,
            max_chars: 1500,
            max_workers: 5,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Translate one piece. Never fails: on any translation error the piece is
    /// returned unchanged.
    pub async fn translate_piece(&self, piece: &str, target: &str) -> String {
        let source = match self.detector.detect(piece) {
            Some(lang) => lang.to_lowercase(),
            None => {
                debug!("Language detection failed, letting the translator detect it");
                AUTO_DETECT.to_string()
            }
        };

        if source == target {
            return piece.to_string();
        }

        match self.translator.translate(piece, &source, target).await {
            Ok(translated) if !translated.trim().is_empty() => translated,
            Ok(_) => {
                warn!("Translator returned empty text, keeping original piece");
                piece.to_string()
            }
            Err(e) => {
                warn!("Translation failed, keeping original piece: {}", e);
                piece.to_string()
            }
        }
    }

    /// Translate arbitrarily long text into `target`, preserving piece order.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn translate_text(&self, text: &str, target: &str) -> String {
        let pieces = split_into_pieces(text, self.max_chars);
        if pieces.is_empty() {
            return String::new();
        }

        debug!(
            "Translating {} pieces with up to {} workers",
            pieces.len(),
            self.max_workers
        );

        let mut results: Vec<(usize, String)> = stream::iter(pieces.into_iter().enumerate())
            .map(|(idx, piece)| async move {
                let translated = self.translate_piece(&piece, target).await;
                (idx, translated)
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);

        results
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedDetector, TaggingTranslator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_split_respects_limit_and_words() {
        let text = "the quick brown fox jumps over the lazy dog";
        let pieces = split_into_pieces(text, 10);

        assert_eq!(pieces, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(pieces.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(pieces.join(" "), text);
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        let text = "नमस्ते दुनिया नमस्ते";
        let pieces = split_into_pieces(text, 13);
        assert_eq!(pieces, vec!["नमस्ते दुनिया", "नमस्ते"]);
    }

    #[test]
    fn test_split_breaks_long_words() {
        let pieces = split_into_pieces("ab abcdefghij cd", 4);
        assert_eq!(pieces, vec!["ab", "abcd", "efgh", "ij", "cd"]);
        assert!(pieces.iter().all(|p| p.chars().count() <= 4));
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_into_pieces("", 100).is_empty());
        assert!(split_into_pieces("   \n\t ", 100).is_empty());
    }

    #[test]
    fn test_piece_in_target_language_is_not_sent() {
        let translator = Arc::new(TaggingTranslator::default());
        let parallel = ParallelTranslator::new(translator.clone(), Arc::new(FixedDetector::new(Some("en"))));

        let out = tokio_test::block_on(parallel.translate_piece("already english", "en"));
        assert_eq!(out, "already english");
        assert_eq!(translator.calls(), 0);
    }

    #[tokio::test]
    async fn test_detection_failure_uses_auto() {
        let parallel = ParallelTranslator::new(
            Arc::new(TaggingTranslator::default()),
            Arc::new(FixedDetector::new(None)),
        );

        let out = parallel.translate_piece("???", "en").await;
        assert_eq!(out, "<auto:en>???");
    }

    #[tokio::test]
    async fn test_failed_piece_is_kept() {
        let parallel = ParallelTranslator::new(
            Arc::new(TaggingTranslator::default()),
            Arc::new(FixedDetector::new(Some("hi"))),
        )
        .with_max_chars(8);

        let out = parallel.translate_text("एक दो FAIL तीन", "en").await;
        assert_eq!(out, "<hi:en>एक दो FAIL तीन");

        let out = parallel.translate_text("एक FAIL तीन चार", "en").await;
        assert_eq!(out, "एक FAIL <hi:en>तीन चार");
    }

    /// Translator whose latency decreases with piece index, so completion
    /// order is the reverse of submission order.
    struct SlowFirstTranslator {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Translator for SlowFirstTranslator {
        async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let idx: u64 = text.trim_start_matches('w').parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(60u64.saturating_sub(idx * 10))).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(text.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_order_preserved_and_workers_bounded() {
        let translator = Arc::new(SlowFirstTranslator {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let parallel = ParallelTranslator::new(translator.clone(), Arc::new(FixedDetector::new(Some("hi"))))
            .with_max_chars(2)
            .with_max_workers(3);

        let out = parallel.translate_text("w0 w1 w2 w3 w4 w5", "en").await;

        assert_eq!(out, "W0 W1 W2 W3 W4 W5");
        assert!(translator.peak.load(Ordering::SeqCst) <= 3);
    }
}
