//! Incremental terminal renderer
//!
//! Follows the chat state and prints only what is new since the last
//! change: message headers, thoughts as they arrive, and answer text as the
//! reveal animator exposes it.

use std::collections::HashMap;
use std::io::{self, Write};

use crossterm::style::Stylize;
use jobchat_core::{ChatState, Message, Role};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Default)]
struct Progress {
    text: String,
    thoughts: usize,
}

/// Prints state changes as a growing transcript
pub struct Printer<W: Write> {
    out: W,
    seen: HashMap<String, Progress>,
    /// Message whose text line is still open
    open: Option<String>,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            seen: HashMap::new(),
            open: None,
        }
    }

    /// Print whatever changed since the previous call
    pub fn render(&mut self, state: &ChatState) -> io::Result<()> {
        for msg in &state.messages {
            // Local user messages echo what was just typed
            if msg.role == Role::User && msg.id.starts_with("local-") {
                continue;
            }
            self.render_message(msg)?;
        }
        self.out.flush()
    }

    fn render_message(&mut self, msg: &Message) -> io::Result<()> {
        if !self.seen.contains_key(&msg.id) {
            self.close_line()?;
            writeln!(self.out, "{}", header(msg.role))?;
            self.seen.insert(msg.id.clone(), Progress::default());
        }

        let new_thoughts: Vec<String> = match self.seen.get(&msg.id) {
            Some(progress) if msg.thinking_steps.len() > progress.thoughts => msg.thinking_steps
                [progress.thoughts..]
                .iter()
                .map(|t| t.content.clone())
                .collect(),
            _ => Vec::new(),
        };
        if !new_thoughts.is_empty() {
            self.close_line()?;
            for thought in &new_thoughts {
                writeln!(self.out, "  {}", format!("· {thought}").dark_grey())?;
            }
        }

        let Some(progress) = self.seen.get_mut(&msg.id) else {
            return Ok(());
        };
        progress.thoughts = progress.thoughts.max(msg.thinking_steps.len());

        let shown = &msg.displayed_content;
        let fresh = if shown.starts_with(&progress.text) {
            shown[progress.text.len()..].to_string()
        } else {
            // Text was replaced; print it again from the start
            shown.clone()
        };
        progress.text = shown.clone();

        if !fresh.is_empty() {
            if self.open.as_deref() != Some(msg.id.as_str()) {
                self.close_line()?;
                self.open = Some(msg.id.clone());
            }
            write!(self.out, "{fresh}")?;
        }

        let done = msg.job_id.is_none() && shown.len() == msg.content.len();
        if done && self.open.as_deref() == Some(msg.id.as_str()) {
            self.close_line()?;
        }
        Ok(())
    }

    fn close_line(&mut self) -> io::Result<()> {
        if self.open.take().is_some() {
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// Forget everything printed so far
    pub fn reset(&mut self) -> io::Result<()> {
        self.close_line()?;
        self.seen.clear();
        Ok(())
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }
}

fn header(role: Role) -> String {
    match role {
        Role::User => "you".green().bold().to_string(),
        Role::Model => "agent".cyan().bold().to_string(),
        Role::Error => "error".red().bold().to_string(),
    }
}

/// Background task printing every state change to stdout
pub struct Renderer {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

impl Renderer {
    pub fn spawn(rx: watch::Receiver<ChatState>) -> Self {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(follow(rx, shutdown_rx));
        Self { handle, shutdown }
    }

    /// Print the final state and stop
    pub async fn finish(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Renderer task failed");
        }
    }
}

async fn follow(mut rx: watch::Receiver<ChatState>, mut shutdown: oneshot::Receiver<()>) {
    let mut printer = Printer::new(io::stdout());
    let mut chat_id = None;
    loop {
        let state = rx.borrow_and_update().clone();
        if state.chat_id != chat_id {
            chat_id = state.chat_id.clone();
            let _ = printer.reset();
        }
        if let Err(e) = printer.render(&state) {
            tracing::warn!(error = %e, "Failed to write to terminal");
            return;
        }

        tokio::select! {
            _ = &mut shutdown => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    let state = rx.borrow().clone();
    let _ = printer.render(&state);
    let _ = printer.close_line();
    let _ = printer.out.flush();
}
