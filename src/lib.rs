//! tubechat - Chat with YouTube videos
//!
//! Fetches a video's captions, indexes them and answers questions about the
//! video with retrieval-augmented generation.
//!
//! # Overview
//!
//! Processing a video:
//! - extracts the 11-character video id from the URL
//! - fetches English captions, falling back to Hindi captions translated to English
//! - splits the transcript into overlapping chunks
//! - embeds every chunk into an in-memory vector index
//!
//! Each question is then answered from the chunks most relevant to it.
//!
//! # Architecture
//!
//! - `config` - Configuration management and prompt templates
//! - `transcript` - Video id extraction and caption retrieval with fallback
//! - `translation` - Parallel piecewise translation of fallback captions
//! - `chunking` - Recursive transcript chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - In-memory vector index with similarity and MMR search
//! - `rag` - Retrieval and answer generation
//! - `orchestrator` - Pipeline coordination
//! - `session` - Per-session chat state
//!
//! # Example
//!
//! ```rust,no_run
//! use tubechat::config::Settings;
//! use tubechat::orchestrator::Orchestrator;
//! use tubechat::session::{AskOutcome, ChatSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = Orchestrator::new(Settings::load()?)?;
//!     let mut session = ChatSession::new();
//!
//!     session
//!         .process_video(&orchestrator, "https://youtu.be/dQw4w9WgXcQ", |stage| {
//!             println!("{}", stage.message())
//!         })
//!         .await?;
//!
//!     if let AskOutcome::Answered(response) =
//!         session.ask(&orchestrator, "What is this video about?").await?
//!     {
//!         println!("{}", response.answer);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod session;
pub mod transcript;
pub mod translation;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, TubechatError};
