//! Backend API
//!
//! The job lifecycle only talks to the backend through `JobBackend`:
//! - `HttpBackend` binds it to the REST API
//! - `RetryingBackend` layers an opt-in retry policy on read calls

pub mod http;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::{Chat, CreateJobRequest, HistoryEntry, JobId, JobSnapshot};
use crate::error::Result;

pub use http::HttpBackend;
pub use retry::{RetryConfig, RetryingBackend};

/// Remote operations the chat client depends on
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Create a chat and return its metadata
    async fn create_chat(&self, title: &str) -> Result<Chat>;

    /// List all chats, most recent first
    async fn list_chats(&self) -> Result<Vec<Chat>>;

    /// Queue a job and return its id
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobId>;

    /// Current status of a job
    async fn job_status(&self, job_id: &str) -> Result<JobSnapshot>;

    /// Request cancellation. Cancelling a finished job is not an error.
    async fn cancel_job(&self, job_id: &str) -> Result<()>;

    /// Job still recorded as running for a chat, if any
    async fn active_job(&self, chat_id: &str) -> Result<Option<JobId>>;

    /// Stored history of a chat
    async fn chat_history(&self, chat_id: &str) -> Result<Vec<HistoryEntry>>;
}

#[async_trait]
impl<B: JobBackend + ?Sized> JobBackend for Arc<B> {
    async fn create_chat(&self, title: &str) -> Result<Chat> {
        (**self).create_chat(title).await
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        (**self).list_chats().await
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobId> {
        (**self).create_job(request).await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobSnapshot> {
        (**self).job_status(job_id).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        (**self).cancel_job(job_id).await
    }

    async fn active_job(&self, chat_id: &str) -> Result<Option<JobId>> {
        (**self).active_job(chat_id).await
    }

    async fn chat_history(&self, chat_id: &str) -> Result<Vec<HistoryEntry>> {
        (**self).chat_history(chat_id).await
    }
}
