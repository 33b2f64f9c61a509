//! Session resume
//!
//! Selecting a chat loads its history and reattaches to a job the backend
//! still has running for it. A job that already finished is rendered from
//! the one snapshot fetched here, without starting a poll session.

use tracing::{debug, info, warn};

use super::ChatClient;
use crate::chat::{reconcile, Message};
use crate::constants::messages;
use crate::error::Result;

impl ChatClient {
    /// Switch to `chat_id`, replacing the message list with its history
    ///
    /// On failure the chat shows a single error message and nothing is left
    /// in progress. If another chat is selected before this load finishes,
    /// the load's results are dropped.
    pub async fn select_chat(&self, chat_id: &str) -> Result<()> {
        self.poller.stop();
        let selection = self.store.update(|state| {
            let selection = state.select(Some(chat_id.to_string()));
            state.in_progress = true;
            selection
        });

        if let Err(e) = self.load_chat(chat_id, selection).await {
            warn!(chat_id, error = %e, "Failed to load chat");
            self.store.update_if(|state| {
                if state.selection != selection {
                    return false;
                }
                state.messages = vec![Message::error(messages::CHAT_LOAD_FAILED)];
                state.finish_job();
                true
            });
            return Err(e);
        }
        Ok(())
    }

    async fn load_chat(&self, chat_id: &str, selection: u64) -> Result<()> {
        let (history, active_job) = tokio::try_join!(
            self.backend.chat_history(chat_id),
            self.backend.active_job(chat_id),
        )?;
        let mut loaded: Vec<Message> = history
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Message::from_history(chat_id, index, entry))
            .collect();

        let Some(job_id) = active_job else {
            let count = loaded.len();
            let applied = self.store.update_if(|state| {
                if state.selection != selection {
                    return false;
                }
                state.messages = loaded;
                state.finish_job();
                true
            });
            if applied {
                debug!(chat_id, messages = count, "Loaded chat history");
            } else {
                debug!(chat_id, "Dropping history for a chat no longer selected");
            }
            return Ok(());
        };

        let snapshot = self.backend.job_status(&job_id).await?;
        loaded.push(Message::placeholder(
            uuid::Uuid::new_v4().to_string(),
            &job_id,
            snapshot.thoughts.clone(),
        ));

        let applied = if snapshot.status.is_terminal() {
            let merged = reconcile::reconcile(&loaded, &job_id, &snapshot);
            self.store.update_if(|state| {
                if state.selection != selection {
                    return false;
                }
                state.messages = merged;
                state.finish_job();
                true
            })
        } else {
            self.poller.start_with(&job_id, |state| {
                if state.selection != selection {
                    return false;
                }
                state.messages = loaded;
                true
            })
        };

        if !applied {
            debug!(chat_id, job_id = %job_id, "Dropping load for a chat no longer selected");
        } else if snapshot.status.is_terminal() {
            debug!(chat_id, job_id = %job_id, status = %snapshot.status, "Active job already finished");
        } else {
            info!(chat_id, job_id = %job_id, status = %snapshot.status, "Resuming job");
        }
        Ok(())
    }
}
