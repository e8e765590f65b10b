//! In-process fakes for the external services, shared by unit tests.

use crate::embedding::Embedder;
use crate::error::{Result, TubechatError};
use crate::rag::LanguageModel;
use crate::transcript::{CaptionSegment, CaptionSource};
use crate::translation::{LanguageDetector, Translator};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const VOCABULARY: &[&str] = &[
    "rust", "ownership", "borrowing", "traits", "pasta", "cooking", "weather", "video", "never",
    "gonna", "give", "up", "let", "down", "love", "rules",
];

/// Embeds text as keyword counts over a fixed vocabulary.
pub struct KeywordEmbedder {
    fail: bool,
    calls: AtomicUsize,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

impl KeywordEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
        VOCABULARY
            .iter()
            .map(|keyword| words.iter().filter(|w| *w == keyword).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| TubechatError::Embedding("empty batch".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TubechatError::Embedding("embedding service unavailable".to_string()));
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Returns a fixed answer and records every prompt it receives.
pub struct ScriptedModel {
    answer: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
            .clone()
            .ok_or_else(|| TubechatError::OpenAI("model unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Serves canned caption tracks per language.
#[derive(Default)]
pub struct StaticCaptionSource {
    tracks: HashMap<String, Vec<CaptionSegment>>,
    disabled: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl StaticCaptionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, language: &str, lines: &[&str]) -> Self {
        let segments = lines
            .iter()
            .enumerate()
            .map(|(i, line)| CaptionSegment::new(*line, i as f64 * 2.0, 2.0))
            .collect();
        self.tracks.insert(language.to_string(), segments);
        self
    }

    /// Report captions as disabled when this language is requested.
    pub fn disable_language(mut self, language: &str) -> Self {
        self.disabled.insert(language.to_string());
        self
    }

    /// Languages requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionSource for StaticCaptionSource {
    async fn fetch(&self, video_id: &str, languages: &[&str]) -> Result<Vec<CaptionSegment>> {
        self.requests
            .lock()
            .unwrap()
            .extend(languages.iter().map(|l| l.to_string()));

        for language in languages {
            if self.disabled.contains(*language) {
                return Err(TubechatError::TranscriptsDisabled(video_id.to_string()));
            }
            if let Some(segments) = self.tracks.get(*language) {
                return Ok(segments.clone());
            }
        }

        Err(TubechatError::NoTranscriptFound {
            video_id: video_id.to_string(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
        })
    }
}

/// Marks text as translated with `<source:target>` and fails on pieces containing `FAIL`.
#[derive(Default)]
pub struct TaggingTranslator {
    calls: AtomicUsize,
}

impl TaggingTranslator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for TaggingTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("FAIL") {
            return Err(TubechatError::Translation("scripted failure".to_string()));
        }
        Ok(format!("<{}:{}>{}", source, target, text))
    }
}

/// Detector that always reports the same language.
pub struct FixedDetector(Option<String>);

impl FixedDetector {
    pub fn new(language: Option<&str>) -> Self {
        Self(language.map(str::to_string))
    }
}

impl LanguageDetector for FixedDetector {
    fn detect(&self, _text: &str) -> Option<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_vector_counts_whole_words() {
        let embedder = KeywordEmbedder::default();
        let vector = embedder.vector("Rust, rust and RUSTY traits");

        assert_eq!(vector.len(), VOCABULARY.len());
        assert_eq!(vector[0], 2.0);
        assert_eq!(vector[3], 1.0);
        assert_eq!(vector.iter().sum::<f32>(), 3.0);
    }
}
