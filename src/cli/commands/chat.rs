//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::session::{AskOutcome, ChatSession, NO_ACTIVE_VIDEO};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

const HELP: &[(&str, &str)] = &[
    ("/process <url>", "fetch, index and switch to a video"),
    ("/clear", "drop the video and reset the conversation"),
    ("/transcript", "print the active transcript"),
    ("/history", "print the conversation so far"),
    ("/help", "show this help"),
    ("exit, quit", "leave the chat"),
];

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Process(&'a str),
    Clear,
    Transcript,
    History,
    Help,
    Exit,
    Question(&'a str),
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Option<Input<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Some(Input::Exit);
    }

    let Some(command) = line.strip_prefix('/') else {
        return Some(Input::Question(line));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    Some(match name {
        "process" => Input::Process(arg),
        "clear" => Input::Clear,
        "transcript" => Input::Transcript,
        "history" => Input::History,
        "help" => Input::Help,
        other => Input::Unknown(other),
    })
}

/// Run the interactive chat command.
pub async fn run_chat(url: Option<String>, model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubechat doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.rag.model = model;
    }

    let orchestrator = Orchestrator::new(settings)?;
    let mut session = ChatSession::new();
    debug!("Started chat session {}", session.id());

    println!("\n{}", style("tubechat").bold().cyan());
    let retrieval = orchestrator.rag().retrieval();
    Output::kv("Model", orchestrator.rag().model_name());
    Output::kv("Retrieval", &format!("{} (k = {})", retrieval.search_type, retrieval.k));
    println!(
        "{}\n",
        style("Type a question, /process <url> to load a video, /help for commands, or 'exit' to quit.").dim()
    );
    for message in session.messages() {
        Output::message(message);
    }

    if let Some(url) = url {
        process(&mut session, &orchestrator, &url).await;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let Some(input) = parse_input(&line) else {
            continue;
        };

        match input {
            Input::Exit => {
                Output::info("Goodbye!");
                break;
            }
            Input::Process(url) => process(&mut session, &orchestrator, url).await,
            Input::Clear => {
                session.clear();
                for message in session.messages() {
                    Output::message(message);
                }
            }
            Input::Transcript => match session.active() {
                Some(video) => println!("\n{}\n", video.transcript.text),
                None => Output::warning(NO_ACTIVE_VIDEO),
            },
            Input::History => {
                for message in session.messages() {
                    Output::message(message);
                }
            }
            Input::Help => {
                for (command, description) in HELP {
                    Output::kv(command, description);
                }
            }
            Input::Unknown(name) => Output::warning(&format!("Unknown command '/{}'. Try /help.", name)),
            Input::Question(question) => {
                let spinner = Output::spinner("Thinking...");
                let result = session.ask(&orchestrator, question).await;
                spinner.finish_and_clear();

                match result {
                    Ok(AskOutcome::Answered(response)) => Output::answer(&response),
                    Ok(AskOutcome::NoActiveVideo) => Output::warning(NO_ACTIVE_VIDEO),
                    Err(e) => Output::error(&format!("Error: {}", e)),
                }
            }
        }
    }

    Ok(())
}

async fn process(session: &mut ChatSession, orchestrator: &Orchestrator, url: &str) {
    let pb = Output::stage_bar();
    let result = session
        .process_video(orchestrator, url, |stage| Output::stage(&pb, stage))
        .await;
    pb.finish_and_clear();

    match result {
        Ok(()) => {
            if let Some(video) = session.active() {
                let translated = match &video.transcript.translated_from {
                    Some(lang) => format!(", translated from '{}' captions", lang),
                    None => String::new(),
                };
                Output::success(&format!(
                    "Indexed {} ({} chunks{})",
                    video.video_id, video.chunk_count, translated
                ));
            }
            for message in session.messages() {
                Output::message(message);
            }
        }
        Err(e) => Output::error(&format!("{}", e)),
    }
}
