//! Transcript command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, TranscriptFormat};
use crate::config::Settings;
use crate::transcript::{
    extract_video_id, Transcript, TranscriptFetcher, TranscriptOutcome, YoutubeCaptionSource,
};
use crate::translation::{GoogleTranslator, ParallelTranslator, WhatlangDetector};
use anyhow::Result;
use std::sync::Arc;

/// Run the transcript command.
pub async fn run_transcript(
    url: &str,
    output: Option<String>,
    format: TranscriptFormat,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Transcript)?;

    let video_id = extract_video_id(url)?;

    let translator = ParallelTranslator::new(
        Arc::new(GoogleTranslator::with_base_url(&settings.translation.base_url)?),
        Arc::new(WhatlangDetector::new()),
    )
    .with_max_chars(settings.translation.max_chars)
    .with_max_workers(settings.translation.max_workers);

    let fetcher = TranscriptFetcher::new(
        Arc::new(YoutubeCaptionSource::with_base_url(&settings.youtube.base_url)?),
        Arc::new(translator),
    )
    .with_languages(
        settings.youtube.primary_language.clone(),
        settings.youtube.fallback_language.clone(),
        settings.translation.target_language.clone(),
    );

    let spinner = Output::spinner("Fetching transcript...");
    let outcome = fetcher.fetch(&video_id).await;
    spinner.finish_and_clear();

    if let TranscriptOutcome::Fallback { primary_error, .. } = &outcome {
        Output::warning(&format!("Primary captions unavailable ({}), translated fallback used", primary_error));
    }

    let transcript = match outcome.into_result() {
        Ok(t) => t,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let rendered = render(&transcript, format)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered)?;
            Output::success(&format!(
                "Wrote {} transcript ({} chars) to {}",
                transcript.video_id,
                transcript.char_count(),
                path
            ));
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn render(transcript: &Transcript, format: TranscriptFormat) -> Result<String> {
    Ok(match format {
        TranscriptFormat::Text => transcript.text.clone(),
        TranscriptFormat::Json => serde_json::to_string_pretty(transcript)?,
    })
}
