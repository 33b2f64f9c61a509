//! Scripted in-memory backend for tests

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::api::JobBackend;
use crate::chat::{Chat, CreateJobRequest, HistoryEntry, JobId, JobSnapshot};
use crate::error::{ClientError, Result};

#[derive(Clone)]
enum StatusStep {
    Snapshot(JobSnapshot),
    Fail(u16),
}

#[derive(Default)]
struct MockState {
    /// Per-job status script; the last step repeats forever
    statuses: HashMap<JobId, VecDeque<StatusStep>>,
    status_log: Vec<JobId>,
    gates: HashMap<JobId, Arc<Notify>>,
    create_job_gate: Option<Arc<Notify>>,
    chats: Vec<Chat>,
    history: HashMap<String, Vec<HistoryEntry>>,
    active: HashMap<String, JobId>,
    job_requests: Vec<CreateJobRequest>,
    cancelled: Vec<JobId>,
    next_chat: u32,
    next_job: u32,
    create_chat_calls: u32,
    create_job_calls: u32,
    fail_create_chat: Option<u16>,
    fail_create_job: Option<u16>,
    fail_history: Option<u16>,
    fail_active: Option<u16>,
    fail_cancel: Option<u16>,
}

/// Backend double: serves scripted status sequences and records every call
#[derive(Default)]
pub(crate) struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot to a job's status script
    pub fn push_status(&self, job_id: &str, snapshot: JobSnapshot) {
        self.state
            .lock()
            .statuses
            .entry(job_id.to_string())
            .or_default()
            .push_back(StatusStep::Snapshot(snapshot));
    }

    /// Make the next `times` status queries for a job fail with `status`
    pub fn fail_status_times(&self, job_id: &str, times: usize, status: u16) {
        let mut state = self.state.lock();
        let script = state.statuses.entry(job_id.to_string()).or_default();
        for _ in 0..times {
            script.push_back(StatusStep::Fail(status));
        }
    }

    /// Status queries for `job_id` block until the returned handle is notified
    pub fn gate_status(&self, job_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .gates
            .insert(job_id.to_string(), gate.clone());
        gate
    }

    /// Job creation blocks until the returned handle is notified
    pub fn gate_create_job(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().create_job_gate = Some(gate.clone());
        gate
    }

    pub fn set_history(&self, chat_id: &str, history: Vec<HistoryEntry>) {
        self.state.lock().history.insert(chat_id.to_string(), history);
    }

    pub fn set_active_job(&self, chat_id: &str, job_id: &str) {
        self.state
            .lock()
            .active
            .insert(chat_id.to_string(), job_id.to_string());
    }

    pub fn fail_create_chat(&self, status: u16) {
        self.state.lock().fail_create_chat = Some(status);
    }

    pub fn fail_create_job(&self, status: u16) {
        self.state.lock().fail_create_job = Some(status);
    }

    pub fn fail_history(&self, status: u16) {
        self.state.lock().fail_history = Some(status);
    }

    pub fn fail_active_job(&self, status: u16) {
        self.state.lock().fail_active = Some(status);
    }

    pub fn fail_cancel(&self, status: u16) {
        self.state.lock().fail_cancel = Some(status);
    }

    /// Every status query in order, by job id
    pub fn status_log(&self) -> Vec<JobId> {
        self.state.lock().status_log.clone()
    }

    pub fn status_calls(&self, job_id: &str) -> usize {
        self.state
            .lock()
            .status_log
            .iter()
            .filter(|id| id.as_str() == job_id)
            .count()
    }

    pub fn job_requests(&self) -> Vec<CreateJobRequest> {
        self.state.lock().job_requests.clone()
    }

    pub fn chats(&self) -> Vec<Chat> {
        self.state.lock().chats.clone()
    }

    pub fn cancelled(&self) -> Vec<JobId> {
        self.state.lock().cancelled.clone()
    }

    pub fn create_chat_calls(&self) -> u32 {
        self.state.lock().create_chat_calls
    }

    pub fn create_job_calls(&self) -> u32 {
        self.state.lock().create_job_calls
    }

    fn next_status(&self, job_id: &str) -> Result<JobSnapshot> {
        let mut state = self.state.lock();
        state.status_log.push(job_id.to_string());
        let Some(script) = state.statuses.get_mut(job_id) else {
            return Err(ClientError::api(404, "Job not found"));
        };
        let step = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match step {
            Some(StatusStep::Snapshot(snapshot)) => Ok(snapshot),
            Some(StatusStep::Fail(status)) => Err(ClientError::api(status, "scripted failure")),
            None => Err(ClientError::api(404, "Job not found")),
        }
    }
}

fn fail_with(status: Option<u16>) -> Result<()> {
    match status {
        Some(status) => Err(ClientError::api(status, "scripted failure")),
        None => Ok(()),
    }
}

#[async_trait]
impl JobBackend for MockBackend {
    async fn create_chat(&self, title: &str) -> Result<Chat> {
        let mut state = self.state.lock();
        state.create_chat_calls += 1;
        fail_with(state.fail_create_chat)?;
        state.next_chat += 1;
        let chat = Chat {
            id: format!("chat-{}", state.next_chat),
            title: title.to_string(),
        };
        state.chats.insert(0, chat.clone());
        Ok(chat)
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        Ok(self.state.lock().chats.clone())
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobId> {
        let gate = self.state.lock().create_job_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut state = self.state.lock();
        state.create_job_calls += 1;
        fail_with(state.fail_create_job)?;
        state.job_requests.push(request.clone());
        state.next_job += 1;
        Ok(format!("job:{}", state.next_job))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobSnapshot> {
        let gate = self.state.lock().gates.get(job_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next_status(job_id)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        fail_with(state.fail_cancel)?;
        state.cancelled.push(job_id.to_string());
        Ok(())
    }

    async fn active_job(&self, chat_id: &str) -> Result<Option<JobId>> {
        let state = self.state.lock();
        fail_with(state.fail_active)?;
        Ok(state.active.get(chat_id).cloned())
    }

    async fn chat_history(&self, chat_id: &str) -> Result<Vec<HistoryEntry>> {
        let state = self.state.lock();
        fail_with(state.fail_history)?;
        Ok(state.history.get(chat_id).cloned().unwrap_or_default())
    }
}
