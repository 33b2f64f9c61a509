//! Chat model, shared state and the two pure-ish state machines over it

pub mod reconcile;
pub mod reveal;
pub mod state;
pub mod types;

pub use reveal::RevealAnimator;
pub use state::{ChatState, ChatStore};
pub use types::{
    Chat, CreateJobRequest, HistoryEntry, JobId, JobSnapshot, JobStatus, Message, Role, Thought,
};
