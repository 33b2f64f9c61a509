//! Interactive chat loop
//!
//! Plain lines are submitted as prompts; lines starting with `/` are
//! commands. Submitting returns as soon as the job exists, so `/cancel`
//! stays available while an answer is being polled.

use anyhow::Result;
use crossterm::style::Stylize;
use jobchat_core::ChatClient;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render::Renderer;

const HELP: &str = "\
Commands:
  /cancel          Cancel the running job
  /new             Start a new chat
  /open <chat_id>  Open a chat and follow its running job
  /chats           List chats
  /agent on|off    Toggle agent mode
  /attach <id>     Attach a knowledge-base file to the next prompt
  /detach          Remove the attachment
  /help            Show this help
  /quit            Exit";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Prompt(String),
    Cancel,
    New,
    Open(String),
    Chats,
    Agent(bool),
    Attach(String),
    Detach,
    Help,
    Quit,
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Input::Prompt(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        let parsed = match (name, arg) {
            ("cancel", None) => Input::Cancel,
            ("new", None) => Input::New,
            ("open", Some(id)) => Input::Open(id.to_string()),
            ("chats", None) => Input::Chats,
            ("agent", Some("on")) => Input::Agent(true),
            ("agent", Some("off")) => Input::Agent(false),
            ("attach", Some(id)) => Input::Attach(id.to_string()),
            ("detach", None) => Input::Detach,
            ("help", _) => Input::Help,
            ("quit" | "exit", _) => Input::Quit,
            _ => Input::Invalid(line.to_string()),
        };
        Some(parsed)
    }
}

fn report(e: impl std::fmt::Display) {
    eprintln!("{}", format!("error: {e}").red());
}

pub async fn run(client: &ChatClient) -> Result<()> {
    println!("{}", "jobchat - type a message, or /help".bold());
    let renderer = Renderer::spawn(client.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(input) = Input::parse(&line) else {
            continue;
        };
        tracing::debug!(?input, "REPL input");

        match input {
            Input::Prompt(text) => match client.submit(&text).await {
                Ok(Some(_)) => {}
                Ok(None) => println!("A job is still running; /cancel to stop it."),
                Err(e) => report(e),
            },
            Input::Cancel => match client.cancel_job().await {
                Ok(Some(job_id)) => println!("Cancelled {job_id}."),
                Ok(None) => println!("Nothing to cancel."),
                Err(e) => report(e),
            },
            Input::New => {
                client.new_chat();
                println!("Started a new chat.");
            }
            Input::Open(chat_id) => {
                if let Err(e) = client.select_chat(&chat_id).await {
                    report(e);
                }
            }
            Input::Chats => match client.refresh_chats().await {
                Ok(()) => {
                    for chat in client.state().chats {
                        println!("  {}  {}", chat.id, chat.title);
                    }
                }
                Err(e) => report(e),
            },
            Input::Agent(enabled) => {
                client.set_agent_mode(enabled);
                println!("Agent mode {}.", if enabled { "on" } else { "off" });
            }
            Input::Attach(id) => {
                println!("Attached {id} to the next prompt.");
                client.select_attachment(Some(id));
            }
            Input::Detach => client.select_attachment(None),
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
            Input::Invalid(line) => println!("Unknown command: {line} (try /help)"),
        }
    }

    renderer.finish().await;
    Ok(())
}
