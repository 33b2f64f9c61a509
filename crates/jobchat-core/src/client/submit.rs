//! Submission orchestration
//!
//! Optimistic user message first, then chat creation when needed, then the
//! job, then the placeholder and a poll session. Any failure before the job
//! exists rolls the optimistic message back and puts the text back into the
//! input. A freshly created chat is kept; the backend already owns it.

use tracing::{debug, info, warn};

use super::ChatClient;
use crate::chat::{CreateJobRequest, JobId, Message, Thought};
use crate::constants::{chat, messages};
use crate::error::{ClientError, Result};

/// Title for a chat started by `text`: its first characters, or a default
pub fn chat_title(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return messages::DEFAULT_CHAT_TITLE.to_string();
    }
    text.chars().take(chat::TITLE_MAX_CHARS).collect()
}

impl ChatClient {
    /// Submit `text` as a new job in the current chat
    ///
    /// Returns the job id, or `None` when the text is blank or another
    /// submission or job is still in progress.
    pub async fn submit(&self, text: &str) -> Result<Option<JobId>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let optimistic = Message::user(trimmed);
        let optimistic_id = optimistic.id.clone();
        let selection = self.store.update(|state| {
            if state.in_progress {
                return None;
            }
            state.messages.push(optimistic);
            state.input.clear();
            state.in_progress = true;
            Some(state.selection)
        });
        let Some(selection) = selection else {
            debug!("Submission ignored, already in progress");
            return Ok(None);
        };

        self.poller.stop();

        match self.create_and_follow(trimmed, selection).await {
            Ok(job_id) => Ok(Some(job_id)),
            Err(e) => {
                warn!(error = %e, "Submission failed, rolling back");
                self.store.update(|state| {
                    state.messages.retain(|m| m.id != optimistic_id);
                    if state.selection == selection {
                        state.input = text.to_string();
                        state.in_progress = false;
                    }
                });
                Err(e)
            }
        }
    }

    /// Submit whatever is in the input buffer
    pub async fn submit_input(&self) -> Result<Option<JobId>> {
        let input = self.store.read(|state| state.input.clone());
        self.submit(&input).await
    }

    /// Create the job and follow it, unless the user switched chats meanwhile
    async fn create_and_follow(&self, text: &str, selection: u64) -> Result<JobId> {
        let chat_id = match self.store.chat_id() {
            Some(id) => id,
            None => self.create_chat(text, selection).await?,
        };
        if chat_id.is_empty() {
            return Err(ClientError::MissingChat);
        }

        let (attachment_id, agent_mode) =
            self.store.read(|state| (state.attachment.clone(), state.agent_mode));
        let request = CreateJobRequest {
            message: text.to_string(),
            conversation_id: chat_id.clone(),
            attachment_id,
            agent_mode,
        };
        let job_id = self.backend.create_job(&request).await?;
        info!(job_id = %job_id, chat_id = %chat_id, agent_mode, "Job created");

        let placeholder = Message::placeholder(format!("model-{job_id}"), &job_id, vec![Thought::queued()]);
        let followed = self.poller.start_with(&job_id, |state| {
            if state.selection != selection {
                return false;
            }
            state.attachment = None;
            state.messages.push(placeholder);
            true
        });
        if !followed {
            debug!(job_id = %job_id, chat_id = %chat_id, "Chat changed during submission, not following job");
        }
        Ok(job_id)
    }

    async fn create_chat(&self, text: &str, selection: u64) -> Result<String> {
        let chat = self.backend.create_chat(&chat_title(text)).await?;
        info!(chat_id = %chat.id, title = %chat.title, "Created chat");
        self.store.update_if(|state| {
            if state.selection != selection {
                return false;
            }
            state.chat_id = Some(chat.id.clone());
            true
        });

        if let Err(e) = self.refresh_chats().await {
            warn!(error = %e, "Failed to refresh chat list");
        }
        Ok(chat.id)
    }
}
