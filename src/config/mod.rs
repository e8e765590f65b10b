//! Configuration module for tubechat.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, OpenAISettings, PromptSettings,
    RagSettings, RetrievalSettings, SearchType, ServerSettings, Settings, TranslationSettings,
    YoutubeSettings,
};
