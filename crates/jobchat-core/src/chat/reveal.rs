//! Reveal animator
//!
//! Gives polled answers the look of streamed output: every lagging message
//! gets a few more characters of `displayed_content` per tick. A single task
//! serves every message and sleeps on the state channel (no timer) while
//! nothing is lagging.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::state::{ChatState, ChatStore};
use super::types::Message;

/// Advance every lagging message by `units` characters
///
/// Only `displayed_content` is touched. Returns whether anything changed.
pub fn advance(messages: &mut [Message], units: usize) -> bool {
    let mut changed = false;
    for msg in messages.iter_mut().filter(|m| m.needs_reveal()) {
        // A content swap may leave the prefix misaligned; start over then.
        if !msg.content.starts_with(&msg.displayed_content) {
            msg.displayed_content.clear();
        }
        let start = msg.displayed_content.len();
        let end = msg.content[start..]
            .char_indices()
            .nth(units)
            .map(|(i, _)| start + i)
            .unwrap_or(msg.content.len());
        msg.displayed_content.push_str(&msg.content[start..end]);
        changed = true;
    }
    changed
}

/// Handle to the shared reveal task; the task stops when this is dropped
pub struct RevealAnimator {
    handle: JoinHandle<()>,
}

impl RevealAnimator {
    /// Spawn the animator over `store`
    pub fn spawn(store: ChatStore, tick: Duration, units: usize) -> Self {
        let handle = tokio::spawn(run(store, tick, units.max(1)));
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for RevealAnimator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(store: ChatStore, tick: Duration, units: usize) {
    let mut rx = store.subscribe();
    loop {
        // Idle: no timer, just wait for a message to fall behind.
        if rx.wait_for(ChatState::needs_reveal).await.is_err() {
            return;
        }
        debug!("Reveal animator waking up");

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let changed = store.update_if(|state| advance(&mut state.messages, units));
            trace!(changed, "Reveal tick");
            if !store.read(ChatState::needs_reveal) {
                break;
            }
        }
        debug!("Reveal animator idle");
    }
}
