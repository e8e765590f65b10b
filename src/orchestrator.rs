//! Pipeline orchestrator for tubechat.
//!
//! Coordinates transcript retrieval, chunking, embedding and indexing of a
//! video, and answering questions against the resulting index.

use crate::chunking::{Chunker, ChunkingConfig, RecursiveChunker, TextChunk};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, TubechatError};
use crate::openai::create_client;
use crate::rag::{LanguageModel, OpenAIChatModel, RagEngine, RagResponse, RetrievalConfig};
use crate::transcript::{
    extract_video_id, CaptionSource, Transcript, TranscriptFetcher, TranscriptOutcome, YoutubeCaptionSource,
};
use crate::translation::{GoogleTranslator, ParallelTranslator, WhatlangDetector};
use crate::vector_store::{Document, MemoryVectorStore, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Progress stages reported while a video is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStage {
    FetchingTranscript,
    SplittingTranscript,
    CreatingVectorStore,
    Complete,
}

impl ProcessStage {
    pub fn message(&self) -> &'static str {
        match self {
            ProcessStage::FetchingTranscript => "Fetching transcript...",
            ProcessStage::SplittingTranscript => "Splitting transcript...",
            ProcessStage::CreatingVectorStore => "Creating vector store...",
            ProcessStage::Complete => "Processing complete!",
        }
    }

    /// Overall progress when this stage starts.
    pub fn percent(&self) -> u64 {
        match self {
            ProcessStage::FetchingTranscript => 25,
            ProcessStage::SplittingTranscript => 50,
            ProcessStage::CreatingVectorStore => 75,
            ProcessStage::Complete => 100,
        }
    }
}

/// A processed video ready for questions.
#[derive(Clone)]
pub struct ProcessedVideo {
    pub video_id: String,
    pub transcript: Transcript,
    /// Whether the transcript was translated from the fallback language.
    pub used_fallback: bool,
    pub chunk_count: usize,
    pub store: Arc<MemoryVectorStore>,
}

/// The main orchestrator for the tubechat pipeline.
pub struct Orchestrator {
    settings: Settings,
    fetcher: TranscriptFetcher,
    chunker: Box<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    rag: RagEngine,
}

impl Orchestrator {
    /// Create an orchestrator talking to YouTube, Google Translate and OpenAI.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts_dir().as_deref(), Some(&settings.prompts.variables))?;

        let client = create_client(&settings.openai)?;

        let source: Arc<dyn CaptionSource> = Arc::new(YoutubeCaptionSource::with_base_url(&settings.youtube.base_url)?);

        let translator = ParallelTranslator::new(
            Arc::new(GoogleTranslator::with_base_url(&settings.translation.base_url)?),
            Arc::new(WhatlangDetector::new()),
        )
        .with_max_chars(settings.translation.max_chars)
        .with_max_workers(settings.translation.max_workers);

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(client.clone(), &settings.embedding));

        let model: Arc<dyn LanguageModel> = Arc::new(
            OpenAIChatModel::new(client, &settings.rag.model).with_temperature(settings.rag.temperature),
        );

        info!(
            "Using {} for answers and {} for embeddings",
            settings.rag.model, settings.embedding.model
        );

        Ok(Self::with_components(
            settings,
            prompts,
            source,
            Arc::new(translator),
            embedder,
            model,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        source: Arc<dyn CaptionSource>,
        translator: Arc<ParallelTranslator>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let fetcher = TranscriptFetcher::new(source, translator).with_languages(
            settings.youtube.primary_language.clone(),
            settings.youtube.fallback_language.clone(),
            settings.translation.target_language.clone(),
        );

        let rag = RagEngine::new(embedder.clone(), model)
            .with_retrieval(RetrievalConfig::from(&settings.retrieval))
            .with_prompts(prompts);

        Self {
            settings,
            fetcher,
            chunker: Box::new(RecursiveChunker::new()),
            embedder,
            rag,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn rag(&self) -> &RagEngine {
        &self.rag
    }

    /// Fetch the transcript for a video, with fallback and translation.
    pub async fn fetch_transcript(&self, video_id: &str) -> TranscriptOutcome {
        self.fetcher.fetch(video_id).await
    }

    /// Split a transcript into chunks.
    pub fn chunk(&self, transcript: &Transcript) -> Result<Vec<TextChunk>> {
        let config = ChunkingConfig::from(&self.settings.chunking);
        self.chunker.chunk(&transcript.text, &config)
    }

    /// Embed chunks and build a fresh index. Either every chunk is indexed or
    /// an error is returned.
    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub async fn build_index(&self, video_id: &str, chunks: &[TextChunk]) -> Result<MemoryVectorStore> {
        if chunks.is_empty() {
            return Err(TubechatError::VectorStore("No chunks to index".to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        debug!(
            "Embedding {} chunks ({} dimensions)",
            texts.len(),
            self.embedder.dimensions()
        );
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(TubechatError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let documents: Vec<Document> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                Document::new(video_id.to_string(), chunk.content.clone(), embedding, chunk.order)
            })
            .collect();

        let store = MemoryVectorStore::new();
        let count = store.add_batch(&documents).await?;
        info!("Indexed {} chunks for {}", count, video_id);

        Ok(store)
    }

    /// Process a video URL: fetch the transcript, chunk it and build its index.
    #[instrument(skip(self, on_stage))]
    pub async fn process_video<F>(&self, url: &str, on_stage: F) -> Result<ProcessedVideo>
    where
        F: Fn(ProcessStage) + Send + Sync,
    {
        let video_id = extract_video_id(url)?;

        on_stage(ProcessStage::FetchingTranscript);
        let outcome = self.fetch_transcript(&video_id).await;
        let used_fallback = outcome.used_fallback();
        let transcript = outcome.into_result()?;

        if transcript.text.trim().is_empty() {
            return Err(TubechatError::TranscriptUnavailable(format!(
                "Transcript for {} is empty",
                video_id
            )));
        }

        on_stage(ProcessStage::SplittingTranscript);
        let chunks = self.chunk(&transcript)?;

        on_stage(ProcessStage::CreatingVectorStore);
        let store = self.build_index(&video_id, &chunks).await?;

        on_stage(ProcessStage::Complete);
        info!(
            "Processed {} ({} chars, {} chunks{})",
            video_id,
            transcript.char_count(),
            chunks.len(),
            if used_fallback { ", translated" } else { "" }
        );

        Ok(ProcessedVideo {
            video_id,
            transcript,
            used_fallback,
            chunk_count: chunks.len(),
            store: Arc::new(store),
        })
    }

    /// Answer a question against a processed video's index.
    pub async fn answer(&self, store: &dyn VectorStore, question: &str) -> Result<RagResponse> {
        self.rag.ask(store, question).await
    }
}
