//! Poll loop controller
//!
//! Owns the single polling session of a client. A session is a spawned task
//! that queries the job status on a fixed interval, merges each snapshot into
//! the message list and ends itself on a terminal status or a failed query.
//!
//! Starting a session always tears the previous one down first. Each session
//! also carries a generation number that is recorded in `ChatState`; a task
//! only writes while its generation is the recorded one, so a response that
//! was already in flight when its session was superseded is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::JobBackend;
use crate::chat::{reconcile, ChatState, ChatStore, JobId};
use crate::constants::messages;
use crate::error::Result;

/// A running poll task; dropping it stops the task
struct PollSession {
    job_id: JobId,
    generation: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Drop for PollSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Holder of the at-most-one poll session
pub struct PollController {
    backend: Arc<dyn JobBackend>,
    store: ChatStore,
    interval: Duration,
    session: Mutex<Option<PollSession>>,
    generations: AtomicU64,
}

impl PollController {
    pub fn new(backend: Arc<dyn JobBackend>, store: ChatStore, interval: Duration) -> Self {
        Self {
            backend,
            store,
            interval,
            session: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    /// Start following `job_id`, replacing any current session
    ///
    /// Marks the job as active and the client as in progress. The first
    /// query happens one interval from now.
    pub fn start(&self, job_id: &str) {
        self.start_with(job_id, |_| true);
    }

    /// Like `start`, but only if `prepare` accepts the current state
    ///
    /// `prepare` runs inside the same state update that hands the job to the
    /// new session, so it can both check and modify the state atomically.
    /// When it returns false nothing changes and the current session, if
    /// any, keeps running.
    pub fn start_with(&self, job_id: &str, prepare: impl FnOnce(&mut ChatState) -> bool) -> bool {
        let mut slot = self.session.lock();
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let accepted = self.store.update_if(|state| {
            if !prepare(state) {
                return false;
            }
            state.active_job = Some(job_id.to_string());
            state.in_progress = true;
            state.poll_generation = Some(generation);
            true
        });
        if !accepted {
            debug!(job_id, "Poll start rejected");
            return false;
        }

        if let Some(previous) = slot.take() {
            debug!(job_id = %previous.job_id, generation = previous.generation, "Superseding poll session");
            drop(previous);
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            self.backend.clone(),
            self.store.clone(),
            job_id.to_string(),
            generation,
            self.interval,
            cancel.clone(),
        ));
        info!(job_id, generation, interval = ?self.interval, "Started polling");

        *slot = Some(PollSession {
            job_id: job_id.to_string(),
            generation,
            cancel,
            handle,
        });
        true
    }

    /// Stop the current session, if any, and return the job it followed
    ///
    /// Leaves `in_progress` and `active_job` alone; callers decide what the
    /// state becomes next.
    pub fn stop(&self) -> Option<JobId> {
        let session = self.session.lock().take()?;
        let generation = session.generation;
        self.store.update_if(|state| {
            if state.poll_generation == Some(generation) {
                state.poll_generation = None;
                true
            } else {
                false
            }
        });
        debug!(job_id = %session.job_id, generation, "Stopped polling");
        Some(session.job_id.clone())
    }

    /// Cancel the active job remotely, then stop polling at once
    ///
    /// If the remote call fails, polling keeps going and the error is
    /// returned. Returns the cancelled job, or `None` when nothing was active.
    pub async fn cancel(&self) -> Result<Option<JobId>> {
        let Some(job_id) = self.store.active_job() else {
            return Ok(None);
        };

        if let Err(e) = self.backend.cancel_job(&job_id).await {
            warn!(job_id = %job_id, error = %e, "Failed to cancel job");
            return Err(e);
        }

        self.stop();
        self.store.update(|state| {
            if state.active_job.as_ref() == Some(&job_id) {
                state.finish_job();
            }
        });
        info!(job_id = %job_id, "Job cancelled");
        Ok(Some(job_id))
    }

    /// Whether a poll task is currently running
    pub fn is_active(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|session| !session.handle.is_finished())
    }

    /// Job followed by the running poll task
    pub fn polled_job(&self) -> Option<JobId> {
        self.session
            .lock()
            .as_ref()
            .filter(|session| !session.handle.is_finished())
            .map(|session| session.job_id.clone())
    }
}

async fn poll_loop(
    backend: Arc<dyn JobBackend>,
    store: ChatStore,
    job_id: JobId,
    generation: u64,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = backend.job_status(&job_id) => result,
        };

        match result {
            Ok(snapshot) => {
                let terminal = snapshot.status.is_terminal();
                let applied = store.update_if(|state| {
                    if state.poll_generation != Some(generation) {
                        return false;
                    }
                    if !reconcile::is_bound(&state.messages, &job_id) {
                        debug!(job_id = %job_id, "No message bound to polled job");
                    }
                    state.messages = reconcile::reconcile(&state.messages, &job_id, &snapshot);
                    if terminal {
                        state.finish_job();
                    }
                    true
                });

                if !applied {
                    debug!(job_id = %job_id, generation, "Dropping status for superseded session");
                    return;
                }
                if terminal {
                    info!(job_id = %job_id, status = %snapshot.status, "Job finished");
                    return;
                }
                debug!(job_id = %job_id, status = %snapshot.status, "Job still running");
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Polling error");
                store.update_if(|state| {
                    if state.poll_generation != Some(generation) {
                        return false;
                    }
                    state.messages = reconcile::fail(&state.messages, &job_id, messages::POLL_FAILED);
                    state.finish_job();
                    true
                });
                return;
            }
        }
    }
}
