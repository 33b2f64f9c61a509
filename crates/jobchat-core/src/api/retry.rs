//! Opt-in retry for backend reads
//!
//! The job lifecycle itself never retries: a failed status query ends the
//! poll session. Wrapping the backend in `RetryingBackend` absorbs transient
//! failures (rate limits, gateway errors, dropped connections) on the read
//! calls before they reach the poll loop. Creation and cancellation are not
//! idempotent and go through untouched.

use std::future::Future;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use super::JobBackend;
use crate::chat::{Chat, CreateJobRequest, HistoryEntry, JobId, JobSnapshot};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Cap for the doubled delay; a server hint may exceed it
    pub max_delay: Duration,
    /// Upper bound of the random extra wait, zero for none
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryConfig {
    /// Fewer attempts and short waits, so a poll tick isn't held for long
    pub fn gentle() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            ..Self::default()
        }
    }
}

/// Rate limits, server-side failures and transport errors
fn is_transient(err: &ClientError) -> bool {
    match err {
        ClientError::Http(e) if e.status().is_none() => e.is_timeout() || e.is_connect(),
        _ => matches!(err.status(), Some(429 | 500 | 502 | 503 | 504)),
    }
}

/// How long to sleep before the next attempt
fn backoff_wait(err: &ClientError, delay: Duration, max_jitter: Duration) -> Duration {
    let hinted = match err {
        ClientError::Api { retry_after: Some(hint), .. } => *hint,
        _ => delay,
    };
    if max_jitter.is_zero() {
        return hinted;
    }
    hinted + rand::thread_rng().gen_range(Duration::ZERO..=max_jitter)
}

/// Parse a Retry-After header: delta seconds or an HTTP date
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    match value.parse::<u64>() {
        Ok(seconds) => Some(Duration::from_secs(seconds)),
        Err(_) => httpdate::parse_http_date(value)
            .ok()?
            .duration_since(SystemTime::now())
            .ok(),
    }
}

/// Backend decorator retrying idempotent reads with exponential backoff
pub struct RetryingBackend<B> {
    inner: B,
    config: RetryConfig,
}

impl<B: JobBackend> RetryingBackend<B> {
    pub fn new(inner: B, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn read<T, F, Fut>(&self, call: &'static str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        let mut delay = self.config.initial_delay;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if retries >= self.config.max_retries || !is_transient(&err) {
                return Err(err);
            }
            retries += 1;
            let wait = backoff_wait(&err, delay, self.config.max_jitter);
            warn!(call, retry = retries, wait = ?wait, error = %err, "Retrying backend read");
            tokio::time::sleep(wait).await;
            delay = (delay * 2).min(self.config.max_delay);
        }
    }
}

#[async_trait]
impl<B: JobBackend> JobBackend for RetryingBackend<B> {
    async fn create_chat(&self, title: &str) -> Result<Chat> {
        self.inner.create_chat(title).await
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.read("list_chats", || self.inner.list_chats()).await
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobId> {
        self.inner.create_job(request).await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobSnapshot> {
        self.read("job_status", || self.inner.job_status(job_id)).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        self.inner.cancel_job(job_id).await
    }

    async fn active_job(&self, chat_id: &str) -> Result<Option<JobId>> {
        self.read("active_job", || self.inner.active_job(chat_id)).await
    }

    async fn chat_history(&self, chat_id: &str) -> Result<Vec<HistoryEntry>> {
        self.read("chat_history", || self.inner.chat_history(chat_id)).await
    }
}
