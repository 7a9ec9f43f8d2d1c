// src/cli/chat.rs — Interactive interview in the terminal

use crate::interview::finalizer::RecommendationOutcome;
use crate::interview::machine::InterviewMachine;

/// One line of user input, classified.
#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Answer(String),
    /// Answer and ask for the draft summary in the same turn.
    Draft(String),
    End,
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_command(input: &str) -> ChatCommand {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ChatCommand::Empty;
    }
    if trimmed == "quit" || trimmed == "exit" {
        return ChatCommand::Quit;
    }
    if !trimmed.starts_with('/') {
        return ChatCommand::Answer(trimmed.to_string());
    }

    let mut parts = trimmed.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let arg = parts.next().map(str::trim).unwrap_or("");
    match cmd {
        "/draft" => ChatCommand::Draft(arg.to_string()),
        "/end" => ChatCommand::End,
        "/status" => ChatCommand::Status,
        "/help" => ChatCommand::Help,
        "/quit" => ChatCommand::Quit,
        other => ChatCommand::Unknown(other.to_string()),
    }
}

fn print_help() {
    eprintln!("  <answer>          reply to the question");
    eprintln!("  /draft <answer>   reply and get a summary to confirm");
    eprintln!("  /end              finish the interview");
    eprintln!("  /status           show session progress");
    eprintln!("  /quit             leave without finishing");
}

/// Run the interview REPL for one user until `/end` or EOF.
pub async fn run_chat(machine: &InterviewMachine, user_id: &str) -> anyhow::Result<()> {
    eprintln!("winear v{} | user: {}\n", env!("CARGO_PKG_VERSION"), user_id);

    let started = machine.start(user_id).await?;
    let session_id = started.session_id;
    println!("{}\n", started.assistant);

    while let Some(input) = read_input() {
        match parse_command(&input) {
            ChatCommand::Empty => continue,
            ChatCommand::Quit => {
                eprintln!("  Session {} left open; it expires on its own.", session_id);
                break;
            }
            ChatCommand::Help => print_help(),
            ChatCommand::Unknown(cmd) => {
                eprintln!("  Unknown command: {}. Type /help for commands.", cmd)
            }
            ChatCommand::Status => match machine.session(&session_id).await {
                Ok(session) => eprintln!(
                    "  Phase: {} | answers: {} | draft: {}",
                    session.phase(),
                    session.user_turn_count(),
                    if session.draft_summary().is_some() { "yes" } else { "no" },
                ),
                Err(e) => eprintln!("[error] {}", e),
            },
            ChatCommand::Draft(answer) if answer.is_empty() => {
                eprintln!("  Usage: /draft <answer>");
            }
            ChatCommand::Answer(answer) => send_reply(machine, &session_id, &answer, false).await,
            ChatCommand::Draft(answer) => send_reply(machine, &session_id, &answer, true).await,
            ChatCommand::End => match machine.end(&session_id).await {
                Ok(ended) => {
                    println!("{}\n", ended.assistant);
                    println!("Summary: {}", ended.final_summary);
                    print_recommendation(ended.recommendation.as_ref());
                    return Ok(());
                }
                Err(e) => eprintln!("[error] {}", e),
            },
        }
    }
    Ok(())
}

async fn send_reply(machine: &InterviewMachine, session_id: &str, answer: &str, draft: bool) {
    match machine.reply(session_id, answer, draft).await {
        Ok(reply) => {
            println!("{}\n", reply.assistant);
            if reply.draft_summary.is_some() {
                eprintln!("  Add anything you like, or type /end to confirm.");
            }
        }
        Err(e) => eprintln!("[error] {}", e),
    }
}

fn print_recommendation(outcome: Option<&RecommendationOutcome>) {
    match outcome {
        Some(RecommendationOutcome::Delivered { recommendation }) => {
            if !recommendation.rec_people.is_empty() {
                println!("Travel mates: {}", recommendation.rec_people.join(", "));
            }
            if !recommendation.rec_travel.is_empty() {
                println!("Destinations: {}", recommendation.rec_travel.join(", "));
            }
        }
        Some(RecommendationOutcome::Degraded { message }) => {
            eprintln!("  Recommendations unavailable right now: {}", message);
        }
        Some(RecommendationOutcome::Disabled) | None => {}
    }
}

fn read_input() -> Option<String> {
    use std::io::{self, BufRead, Write};

    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) => None, // EOF
        Ok(_) => Some(line),
        Err(_) => None,
    }
}
