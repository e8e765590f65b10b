//! Per-session chat state.
//!
//! A [`ChatSession`] owns the conversation, the URL being worked on and the
//! index of the processed video. At most one video is active at a time.

use crate::error::{Result, TubechatError};
use crate::orchestrator::{Orchestrator, ProcessStage, ProcessedVideo};
use crate::rag::RagResponse;
use crate::transcript::extract_video_id;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const GREETING: &str = "Hi! Enter a YouTube URL to get started.";
pub const PROCESSED: &str = "I've processed the video. Ask me anything about it!";
pub const NO_ACTIVE_VIDEO: &str = "Please process a YouTube video first.";
pub const EMPTY_URL: &str = "Please enter a YouTube URL.";

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Processing,
    Ready,
    Querying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Result of asking a question.
#[derive(Debug, Clone)]
pub enum AskOutcome {
    Answered(RagResponse),
    /// Nothing has been processed yet; the conversation is unchanged.
    NoActiveVideo,
}

/// A chat session bound to at most one processed video.
pub struct ChatSession {
    id: Uuid,
    state: SessionState,
    messages: Vec<ChatMessage>,
    current_url: Option<String>,
    active: Option<ProcessedVideo>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            messages: vec![ChatMessage::assistant(GREETING)],
            current_url: None,
            active: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// The processed video, if any.
    pub fn active(&self) -> Option<&ProcessedVideo> {
        self.active.as_ref()
    }

    /// Process a video URL, replacing any previously active video.
    #[instrument(skip(self, orchestrator, on_stage), fields(session = %self.id))]
    pub async fn process_video<F>(&mut self, orchestrator: &Orchestrator, url: &str, on_stage: F) -> Result<()>
    where
        F: Fn(ProcessStage) + Send + Sync,
    {
        let url = url.trim();
        if url.is_empty() {
            return Err(TubechatError::InvalidInput(EMPTY_URL.to_string()));
        }
        extract_video_id(url)?;

        self.reset();
        self.current_url = Some(url.to_string());
        self.state = SessionState::Processing;

        match orchestrator.process_video(url, on_stage).await {
            Ok(video) => {
                info!("Session ready for {}", video.video_id);
                self.active = Some(video);
                self.messages = vec![ChatMessage::assistant(PROCESSED)];
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("Processing failed: {}", e);
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Ask a question about the active video.
    #[instrument(skip(self, orchestrator), fields(session = %self.id))]
    pub async fn ask(&mut self, orchestrator: &Orchestrator, question: &str) -> Result<AskOutcome> {
        let store = match &self.active {
            Some(video) => video.store.clone(),
            None => return Ok(AskOutcome::NoActiveVideo),
        };

        self.messages.push(ChatMessage::user(question));
        self.state = SessionState::Querying;

        let result = orchestrator.answer(store.as_ref(), question).await;
        self.state = SessionState::Ready;

        let response = result?;
        self.messages.push(ChatMessage::assistant(response.answer.clone()));
        Ok(AskOutcome::Answered(response))
    }

    /// Drop the active video and reset the conversation to the greeting.
    pub fn clear(&mut self) {
        self.reset();
        self.state = SessionState::Idle;
    }

    fn reset(&mut self) {
        self.messages = vec![ChatMessage::assistant(GREETING)];
        self.current_url = None;
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Prompts, Settings};
    use crate::testing::{FixedDetector, KeywordEmbedder, ScriptedModel, StaticCaptionSource, TaggingTranslator};
    use crate::translation::ParallelTranslator;
    use std::sync::Arc;

    const URL: &str = "https://youtu.be/dQw4w9WgXcQ";

    fn lyrics() -> StaticCaptionSource {
        StaticCaptionSource::new().with_track(
            "en",
            &[
                "We're no strangers to love",
                "You know the rules and so do I",
                "Never gonna give you up",
                "Never gonna let you down",
            ],
        )
    }

    fn orchestrator(source: StaticCaptionSource, model: ScriptedModel) -> Orchestrator {
        let mut settings = Settings::default();
        settings.chunking.chunk_size = 40;
        settings.chunking.chunk_overlap = 10;

        Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(source),
            Arc::new(ParallelTranslator::new(
                Arc::new(TaggingTranslator::default()),
                Arc::new(FixedDetector::new(Some("hi"))),
            )),
            Arc::new(KeywordEmbedder::default()),
            Arc::new(model),
        )
    }

    #[test]
    fn test_new_session_greets() {
        let session = ChatSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Assistant);
        assert_eq!(session.messages()[0].content, GREETING);
        assert!(session.active().is_none());
    }

    #[tokio::test]
    async fn test_end_to_end_question() {
        let orchestrator = orchestrator(lyrics(), ScriptedModel::answering("It is a song about commitment."));
        let mut session = ChatSession::new();

        session.process_video(&orchestrator, URL, |_| {}).await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.current_url(), Some(URL));
        assert_eq!(session.active().unwrap().video_id, "dQw4w9WgXcQ");
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, PROCESSED);

        let outcome = session.ask(&orchestrator, "What is this video about?").await.unwrap();
        let response = match outcome {
            AskOutcome::Answered(response) => response,
            AskOutcome::NoActiveVideo => panic!("expected an answer"),
        };
        assert!(!response.answer.is_empty());
        assert!(!response.sources.is_empty());

        assert_eq!(session.state(), SessionState::Ready);
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "What is this video about?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, "It is a song about commitment.");
    }

    #[tokio::test]
    async fn test_ask_without_video_appends_nothing() {
        let orchestrator = orchestrator(lyrics(), ScriptedModel::answering("unused"));
        let mut session = ChatSession::new();

        let outcome = session.ask(&orchestrator, "anything?").await.unwrap();
        assert!(matches!(outcome, AskOutcome::NoActiveVideo));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_malformed_url_leaves_state_alone() {
        let orchestrator = orchestrator(lyrics(), ScriptedModel::answering("ok"));
        let mut session = ChatSession::new();
        session.process_video(&orchestrator, URL, |_| {}).await.unwrap();

        let err = session
            .process_video(&orchestrator, "not a url", |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), crate::error::VIDEO_ID_NOT_FOUND);
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.active().is_some());

        let err = session.process_video(&orchestrator, "  ", |_| {}).await.unwrap_err();
        assert!(err.to_string().contains(EMPTY_URL));
        assert!(session.active().is_some());
    }

    #[tokio::test]
    async fn test_failed_processing_returns_to_idle() {
        let orchestrator = orchestrator(StaticCaptionSource::new(), ScriptedModel::answering("ok"));
        let mut session = ChatSession::new();

        let err = session.process_video(&orchestrator, URL, |_| {}).await.unwrap_err();
        assert!(err.is_caption_error());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.active().is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_answer_keeps_user_turn() {
        let orchestrator = orchestrator(lyrics(), ScriptedModel::failing());
        let mut session = ChatSession::new();
        session.process_video(&orchestrator, URL, |_| {}).await.unwrap();

        assert!(session.ask(&orchestrator, "Who sings?").await.is_err());
        assert_eq!(session.state(), SessionState::Ready);

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let orchestrator = orchestrator(lyrics(), ScriptedModel::answering("ok"));
        let mut session = ChatSession::new();
        session.process_video(&orchestrator, URL, |_| {}).await.unwrap();
        session.ask(&orchestrator, "What is this video about?").await.unwrap();

        session.clear();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.active().is_none());
        assert!(session.current_url().is_none());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, GREETING);

        let outcome = session.ask(&orchestrator, "still there?").await.unwrap();
        assert!(matches!(outcome, AskOutcome::NoActiveVideo));
    }
}
