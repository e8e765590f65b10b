//! CLI output formatting utilities.

use crate::orchestrator::ProcessStage;
use crate::rag::RagResponse;
use crate::session::{ChatMessage, Role};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one conversation turn.
    pub fn message(message: &ChatMessage) {
        match message.role {
            Role::Assistant => println!("{} {}", style("assistant>").green().bold(), message.content),
            Role::User => println!("{} {}", style("you>").cyan().bold(), message.content),
        }
    }

    /// Print an answer followed by its sources.
    pub fn answer(response: &RagResponse) {
        println!("\n{}", response.answer);

        if !response.sources.is_empty() {
            println!("\n{}", style("Sources:").dim());
            for source in &response.sources {
                println!(
                    "  {} {} (score: {:.2}) {}",
                    style("*").cyan(),
                    style(format!("chunk {}", source.chunk_order + 1)).bold(),
                    source.score,
                    style(source.preview(120).replace('\n', " ")).dim()
                );
            }
        }
        println!();
    }

    /// Create a progress bar that follows the processing stages.
    pub fn stage_bar() -> ProgressBar {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Advance a stage bar.
    pub fn stage(pb: &ProgressBar, stage: ProcessStage) {
        pb.set_position(stage.percent());
        pb.set_message(stage.message());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
