//! Configuration settings for tubechat.

use crate::error::{Result, TubechatError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub youtube: YoutubeSettings,
    pub translation: TranslationSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub rag: RagSettings,
    pub openai: OpenAISettings,
    pub prompts: PromptSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when neither RUST_LOG nor -v is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Minutes a session may sit unused before the server drops it and its
    /// index. 0 keeps sessions until they are deleted.
    pub session_idle_minutes: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            session_idle_minutes: 60,
        }
    }
}

impl ServerSettings {
    pub fn session_idle_timeout(&self) -> Option<std::time::Duration> {
        match self.session_idle_minutes {
            0 => None,
            minutes => Some(std::time::Duration::from_secs(minutes * 60)),
        }
    }
}

/// Caption retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Base URL for the watch page and the innertube player API.
    pub base_url: String,
    /// Caption language tried first.
    pub primary_language: String,
    /// Caption language tried when the primary one fails; translated afterwards.
    pub fallback_language: String,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            primary_language: "en".to_string(),
            fallback_language: "hi".to_string(),
        }
    }
}

/// Fallback translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    /// Base URL of the translation endpoint.
    pub base_url: String,
    /// Language the transcript is translated into.
    pub target_language: String,
    /// Maximum characters sent per translation request.
    pub max_chars: usize,
    /// Maximum translation requests in flight.
    pub max_workers: usize,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://translate.googleapis.com".to_string(),
            target_language: "en".to_string(),
            max_chars: 1500,
            max_workers: 5,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// How chunks are selected for a question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Plain top-k cosine similarity.
    #[default]
    Similarity,
    /// Max-marginal-relevance: relevance balanced against diversity.
    Mmr,
}

impl std::str::FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "similarity" => Ok(SearchType::Similarity),
            "mmr" => Ok(SearchType::Mmr),
            _ => Err(format!("Unknown search type: {}", s)),
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchType::Similarity => write!(f, "similarity"),
            SearchType::Mmr => write!(f, "mmr"),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Retrieval strategy.
    pub search_type: SearchType,
    /// Number of chunks passed to the model.
    pub k: usize,
    /// Candidates considered by MMR before diversification.
    pub fetch_k: usize,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure diversity.
    pub lambda_mult: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            search_type: SearchType::Similarity,
            k: 4,
            fetch_k: 20,
            lambda_mult: 0.5,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Sampling temperature (model default when unset).
    pub temperature: Option<f32>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-nano".to_string(),
            temperature: None,
        }
    }
}

/// OpenAI client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// Alternative API base (OpenAI-compatible servers).
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_base: None,
            timeout_secs: 300,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TubechatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(TubechatError::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(TubechatError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.translation.max_chars == 0 {
            return Err(TubechatError::Config("translation.max_chars must be positive".into()));
        }
        if self.translation.max_workers == 0 {
            return Err(TubechatError::Config("translation.max_workers must be at least 1".into()));
        }
        if self.retrieval.k == 0 {
            return Err(TubechatError::Config("retrieval.k must be at least 1".into()));
        }
        if self.retrieval.fetch_k < self.retrieval.k {
            return Err(TubechatError::Config(format!(
                "retrieval.fetch_k ({}) must not be smaller than retrieval.k ({})",
                self.retrieval.fetch_k, self.retrieval.k
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.lambda_mult) {
            return Err(TubechatError::Config("retrieval.lambda_mult must be within 0.0..=1.0".into()));
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubechat")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded custom prompts directory, if configured.
    pub fn prompts_dir(&self) -> Option<PathBuf> {
        self.prompts.custom_dir.as_deref().map(Self::expand_path)
    }
}
