//! Chat state container
//!
//! All client state lives in one `ChatState` behind a `watch` channel. The
//! poll task, the reveal animator and the client facade only ever change it
//! through whole-state closures, and renderers observe it by subscribing.

use std::sync::Arc;

use tokio::sync::watch;

use super::types::{Chat, JobId, Message};

/// Everything the UI needs to render a chat
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    /// Chat the messages belong to; `None` until the first submission
    pub chat_id: Option<String>,
    /// Ordered message list
    pub messages: Vec<Message>,
    /// Text in the input box
    pub input: String,
    /// True while a submission, a chat load or a job is in progress
    pub in_progress: bool,
    /// Job the client is currently following
    pub active_job: Option<JobId>,
    /// Generation of the poll session allowed to write; `None` when no poll runs
    pub poll_generation: Option<u64>,
    /// Knowledge-base file attached to the next submission
    pub attachment: Option<String>,
    /// Submit jobs in agent mode
    pub agent_mode: bool,
    /// Cached chat list for the sidebar
    pub chats: Vec<Chat>,
    /// Bumped on every chat switch; work started under an older value is
    /// discarded instead of written
    pub selection: u64,
}

impl ChatState {
    /// Whether any message still has hidden characters
    pub fn needs_reveal(&self) -> bool {
        self.messages.iter().any(Message::needs_reveal)
    }

    /// Nothing in flight and everything on screen
    pub fn is_idle(&self) -> bool {
        !self.in_progress && !self.needs_reveal()
    }

    /// Switch to `chat_id` (or to no chat) and return the new selection
    pub fn select(&mut self, chat_id: Option<String>) -> u64 {
        self.selection += 1;
        self.chat_id = chat_id;
        self.messages.clear();
        self.active_job = None;
        self.poll_generation = None;
        self.selection
    }

    /// Drop the job reference and the in-progress flag
    pub fn finish_job(&mut self) {
        self.in_progress = false;
        self.active_job = None;
        self.poll_generation = None;
    }
}

/// Shared handle to the chat state
#[derive(Clone)]
pub struct ChatStore {
    tx: Arc<watch::Sender<ChatState>>,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(ChatState::default())
    }
}

impl ChatStore {
    pub fn new(state: ChatState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> ChatState {
        self.tx.borrow().clone()
    }

    /// Read a value out of the current state without cloning all of it
    pub fn read<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Receiver notified after every change
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.tx.subscribe()
    }

    /// Apply a transition and notify subscribers
    pub fn update<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let mut out = None;
        self.tx.send_modify(|state| out = Some(f(state)));
        match out {
            Some(r) => r,
            None => unreachable!("send_modify runs the closure exactly once"),
        }
    }

    /// Apply a transition that reports whether it changed anything; only
    /// notifies when it did
    pub fn update_if(&self, f: impl FnOnce(&mut ChatState) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    /// Replace the message list wholesale
    pub fn replace_messages(&self, messages: Vec<Message>) {
        self.update(|state| state.messages = messages);
    }

    pub fn messages(&self) -> Vec<Message> {
        self.read(|state| state.messages.clone())
    }

    pub fn is_in_progress(&self) -> bool {
        self.read(|state| state.in_progress)
    }

    pub fn active_job(&self) -> Option<JobId> {
        self.read(|state| state.active_job.clone())
    }

    pub fn chat_id(&self) -> Option<String> {
        self.read(|state| state.chat_id.clone())
    }

    /// Wait until no job is in progress and all text is revealed
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so this only ends once idle.
        let _ = rx.wait_for(ChatState::is_idle).await;
    }
}
