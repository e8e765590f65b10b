//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{SearchType, Settings};
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command: process one video and answer one question about it.
pub async fn run_ask(
    url: &str,
    question: &str,
    model: Option<String>,
    k: Option<usize>,
    mmr: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubechat doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.rag.model = model;
    }
    if let Some(k) = k {
        settings.retrieval.k = k;
        settings.retrieval.fetch_k = settings.retrieval.fetch_k.max(k);
    }
    if mmr {
        settings.retrieval.search_type = SearchType::Mmr;
    }
    settings.validate()?;

    let orchestrator = Orchestrator::new(settings)?;

    let pb = Output::stage_bar();
    let video = match orchestrator.process_video(url, |stage| Output::stage(&pb, stage)).await {
        Ok(video) => {
            pb.finish_and_clear();
            video
        }
        Err(e) => {
            pb.finish_and_clear();
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    if video.used_fallback {
        Output::info("No English captions; answering from the translated transcript.");
    }

    let spinner = Output::spinner("Thinking...");
    match orchestrator.answer(video.store.as_ref(), question).await {
        Ok(response) => {
            spinner.finish_and_clear();
            Output::answer(&response);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
