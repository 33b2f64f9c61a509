//! Chat data model
//!
//! Chats and messages as the client holds them, plus the remote job payloads
//! the backend returns.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Opaque identifier of a backend job (`job:<uuid>` on the reference backend)
pub type JobId = String;

/// Chat metadata, owned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Error,
}

/// One recorded step of agent progress. Order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl Thought {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
        }
    }

    /// The notice placed on a freshly submitted job's placeholder
    pub fn queued() -> Self {
        Self::new(constants::chat::QUEUED_THOUGHT_KIND, constants::messages::JOB_QUEUED)
    }
}

/// A message in the client's list
///
/// `displayed_content` is always a prefix of `content`; the reveal animator
/// grows it until both are equal. `job_id` is set only while the message is
/// an unfinished model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub job_id: Option<JobId>,
    pub role: Role,
    pub content: String,
    pub displayed_content: String,
    pub thinking_steps: Vec<Thought>,
    pub sources: Vec<String>,
}

impl Message {
    /// Optimistic local user message, shown in full immediately
    pub fn user(text: &str) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            job_id: None,
            role: Role::User,
            content: text.to_string(),
            displayed_content: text.to_string(),
            thinking_steps: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Empty model message bound to a job
    pub fn placeholder(id: impl Into<String>, job_id: &str, thoughts: Vec<Thought>) -> Self {
        Self {
            id: id.into(),
            job_id: Some(job_id.to_string()),
            role: Role::Model,
            content: String::new(),
            displayed_content: String::new(),
            thinking_steps: thoughts,
            sources: Vec::new(),
        }
    }

    /// Synthetic error message, shown in full immediately
    pub fn error(text: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_id: None,
            role: Role::Error,
            content: text.to_string(),
            displayed_content: text.to_string(),
            thinking_steps: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Message restored from chat history, fully revealed
    pub fn from_history(chat_id: &str, index: usize, entry: HistoryEntry) -> Self {
        Self {
            id: format!("{chat_id}-{index}"),
            job_id: None,
            role: entry.role,
            displayed_content: entry.content.clone(),
            content: entry.content,
            thinking_steps: entry.thinking_steps,
            sources: entry.sources,
        }
    }

    /// Whether the reveal animator still has characters to show
    pub fn needs_reveal(&self) -> bool {
        self.displayed_content.len() < self.content.len()
    }
}

/// Remote job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Complete,
    Failed,
    Cancelled,
    /// Any status this client does not know; polled like a running job
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Terminal statuses are never followed by another transition
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Payload of a single status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub thoughts: Vec<Thought>,
    #[serde(default)]
    pub final_answer: Option<String>,
}

impl JobSnapshot {
    pub fn new(status: JobStatus, thoughts: Vec<Thought>) -> Self {
        Self {
            status,
            thoughts,
            final_answer: None,
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.final_answer = Some(answer.into());
        self
    }
}

/// One entry of a chat's stored history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub thinking_steps: Vec<Thought>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Parameters of a job creation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateJobRequest {
    pub message: String,
    pub conversation_id: String,
    #[serde(rename = "file_id")]
    pub attachment_id: Option<String>,
    #[serde(rename = "use_agent_mode")]
    pub agent_mode: bool,
}
