//! jobchat core: job lifecycle for a chat client backed by asynchronous jobs
//!
//! - Backend trait with HTTP and retrying implementations (`api`)
//! - Chat model, shared state, reconciliation and reveal animation (`chat`)
//! - Single-session job polling (`jobs`)
//! - Submission and session resume behind one facade (`client`)

pub mod api;
pub mod chat;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod jobs;
pub mod paths;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use api::{HttpBackend, JobBackend, RetryConfig, RetryingBackend};
pub use chat::{Chat, ChatState, ChatStore, JobStatus, Message, Role, Thought};
pub use client::ChatClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
