//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::{Result, TubechatError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Processing a video embeds its chunks.
    Process,
    /// Answering embeds the question and calls the model.
    Ask,
    /// Fetching a transcript only talks to YouTube and the translator.
    Transcript,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Process | Operation::Ask => check_api_key(std::env::var("OPENAI_API_KEY").ok())?,
        Operation::Transcript => {}
    }
    Ok(())
}

fn check_api_key(key: Option<String>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(TubechatError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(TubechatError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_transcript_no_requirements() {
        assert!(check(Operation::Transcript).is_ok());
    }

    #[test]
    fn test_api_key_values() {
        assert!(check_api_key(Some("sk-test".to_string())).is_ok());
        assert!(check_api_key(Some("  ".to_string())).is_err());
        assert!(check_api_key(None).is_err());
    }
}
