//! Chat client facade
//!
//! `ChatClient` ties the pieces together: one shared `ChatStore`, one
//! `PollController` and one `RevealAnimator`. Front ends drive it with user
//! actions and render by subscribing to the store.
//!
//! Must be constructed inside a tokio runtime; the animator task starts
//! immediately and stops when the client is dropped.

mod resume;
mod submit;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::JobBackend;
use crate::chat::{ChatState, ChatStore, JobId, RevealAnimator};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::jobs::PollController;

pub use submit::chat_title;

pub struct ChatClient {
    backend: Arc<dyn JobBackend>,
    store: ChatStore,
    poller: PollController,
    _animator: RevealAnimator,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn JobBackend>, config: &ClientConfig) -> Self {
        let store = ChatStore::default();
        let poller = PollController::new(backend.clone(), store.clone(), config.poll_interval);
        let animator = RevealAnimator::spawn(
            store.clone(),
            config.reveal_tick,
            config.reveal_units_per_tick,
        );
        Self {
            backend,
            store,
            poller,
            _animator: animator,
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Clone of the current state
    pub fn state(&self) -> ChatState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.store.subscribe()
    }

    pub fn set_input(&self, text: &str) {
        self.store.update(|state| state.input = text.to_string());
    }

    /// Attach a knowledge-base file to the next submission, or clear it
    pub fn select_attachment(&self, attachment_id: Option<String>) {
        self.store.update(|state| state.attachment = attachment_id);
    }

    pub fn set_agent_mode(&self, enabled: bool) {
        self.store.update(|state| state.agent_mode = enabled);
    }

    /// Leave the current chat; the next submission creates a new one
    pub fn new_chat(&self) {
        self.poller.stop();
        self.store.update(|state| {
            state.select(None);
            state.attachment = None;
            state.finish_job();
        });
        debug!("Started a new chat");
    }

    /// Reload the cached chat list
    pub async fn refresh_chats(&self) -> Result<()> {
        let chats = self.backend.list_chats().await?;
        debug!(count = chats.len(), "Refreshed chat list");
        self.store.update(|state| state.chats = chats);
        Ok(())
    }

    /// Cancel the active job, then reload the current chat from the backend
    ///
    /// When the remote cancel fails the job keeps being polled and the error
    /// is returned.
    pub async fn cancel_job(&self) -> Result<Option<JobId>> {
        let Some(job_id) = self.poller.cancel().await? else {
            return Ok(None);
        };
        info!(job_id = %job_id, "Cancelled job, reloading chat");
        if let Some(chat_id) = self.store.chat_id() {
            self.select_chat(&chat_id).await?;
        }
        Ok(Some(job_id))
    }

    /// Whether a poll session is running
    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    /// Job followed by the running poll session
    pub fn polled_job(&self) -> Option<JobId> {
        self.poller.polled_job()
    }

    /// Wait until no job is in progress and all text is revealed
    pub async fn wait_idle(&self) {
        self.store.wait_idle().await;
    }
}
