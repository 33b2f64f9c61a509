//! Message reconciliation
//!
//! Pure functions that merge a job status snapshot into a message list.
//! They never perform I/O and always return a fresh list, so the caller can
//! swap it into shared state in one step.

use super::types::{JobId, JobSnapshot, JobStatus, Message, Role};
use crate::constants::messages;

/// Merge `snapshot` into the message bound to `job_id`
///
/// Messages that don't carry `job_id` pass through untouched. Once the status
/// is terminal the binding is removed, so applying any later snapshot for the
/// same job (a duplicate tick or a late response) is a no-op.
pub fn reconcile(messages: &[Message], job_id: &JobId, snapshot: &JobSnapshot) -> Vec<Message> {
    messages
        .iter()
        .map(|msg| {
            if msg.job_id.as_ref() == Some(job_id) {
                apply_snapshot(msg, snapshot)
            } else {
                msg.clone()
            }
        })
        .collect()
}

/// Force the message bound to `job_id` into a terminal error state
///
/// Used when the status query itself fails. The error text is shown in full
/// right away rather than revealed.
pub fn fail(messages: &[Message], job_id: &JobId, text: &str) -> Vec<Message> {
    messages
        .iter()
        .map(|msg| {
            if msg.job_id.as_ref() == Some(job_id) {
                Message {
                    job_id: None,
                    role: Role::Error,
                    content: text.to_string(),
                    displayed_content: text.to_string(),
                    ..msg.clone()
                }
            } else {
                msg.clone()
            }
        })
        .collect()
}

/// Whether any message is still bound to `job_id`
pub fn is_bound(messages: &[Message], job_id: &JobId) -> bool {
    messages.iter().any(|m| m.job_id.as_ref() == Some(job_id))
}

fn apply_snapshot(msg: &Message, snapshot: &JobSnapshot) -> Message {
    let mut next = msg.clone();
    next.thinking_steps = snapshot.thoughts.clone();

    match snapshot.status {
        JobStatus::Complete => {
            set_content(&mut next, snapshot.final_answer.clone().unwrap_or_default());
        }
        JobStatus::Failed => {
            next.role = Role::Error;
            set_content(&mut next, messages::JOB_FAILED.to_string());
        }
        _ => {}
    }

    if snapshot.status.is_terminal() {
        next.job_id = None;
    }
    next
}

/// Replace content while keeping `displayed_content` a prefix of it
fn set_content(msg: &mut Message, content: String) {
    if !content.starts_with(msg.displayed_content.as_str()) {
        let shared = common_prefix_len(&msg.displayed_content, &content);
        msg.displayed_content.truncate(shared);
    }
    msg.content = content;
}

/// Byte length of the longest common prefix, on a char boundary
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .take_while(|((_, ca), cb)| ca == cb)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::Thought;

    fn t(content: &str) -> Thought {
        Thought::new("log", content)
    }

    fn list(job_id: &str) -> Vec<Message> {
        vec![
            Message::user("Hello"),
            Message::placeholder(format!("model-{job_id}"), job_id, vec![Thought::queued()]),
        ]
    }

    #[test]
    fn test_running_replaces_thoughts_only() {
        let job = "job:1".to_string();
        let before = list(&job);
        let snapshot = JobSnapshot::new(JobStatus::Running, vec![t("t1"), t("t2")]);

        let after = reconcile(&before, &job, &snapshot);

        assert_eq!(after[1].thinking_steps, vec![t("t1"), t("t2")]);
        assert_eq!(after[1].content, "");
        assert_eq!(after[1].job_id.as_deref(), Some("job:1"));
        assert_eq!(after[1].role, Role::Model);
        assert_eq!(after[0], before[0]);
    }

    #[test]
    fn test_running_ignores_partial_answer() {
        let job = "job:1".to_string();
        let snapshot = JobSnapshot::new(JobStatus::Running, vec![]).with_answer("partial");
        let after = reconcile(&list(&job), &job, &snapshot);
        assert_eq!(after[1].content, "");
    }

    #[test]
    fn test_complete_sets_answer_and_unbinds() {
        let job = "job:1".to_string();
        let snapshot = JobSnapshot::new(JobStatus::Complete, vec![t("done")]).with_answer("Hi there");

        let after = reconcile(&list(&job), &job, &snapshot);

        assert_eq!(after[1].content, "Hi there");
        assert_eq!(after[1].displayed_content, "");
        assert!(after[1].job_id.is_none());
        assert_eq!(after[1].thinking_steps, vec![t("done")]);
    }

    #[test]
    fn test_complete_without_answer_renders_empty() {
        let job = "job:1".to_string();
        let snapshot = JobSnapshot::new(JobStatus::Complete, vec![]);
        let after = reconcile(&list(&job), &job, &snapshot);
        assert_eq!(after[1].content, "");
        assert!(after[1].job_id.is_none());
    }

    #[test]
    fn test_failed_overrides_partial_answer() {
        let job = "job:1".to_string();
        let snapshot = JobSnapshot::new(JobStatus::Failed, vec![t("boom")]).with_answer("half");

        let after = reconcile(&list(&job), &job, &snapshot);

        assert_eq!(after[1].role, Role::Error);
        assert_eq!(after[1].content, messages::JOB_FAILED);
        assert!(after[1].job_id.is_none());
        assert_eq!(after[1].thinking_steps, vec![t("boom")]);
    }

    #[test]
    fn test_cancelled_unbinds_without_touching_content() {
        let job = "job:1".to_string();
        let snapshot = JobSnapshot::new(JobStatus::Cancelled, vec![t("stopped")]);
        let after = reconcile(&list(&job), &job, &snapshot);
        assert_eq!(after[1].role, Role::Model);
        assert_eq!(after[1].content, "");
        assert!(after[1].job_id.is_none());
    }

    #[test]
    fn test_terminal_then_terminal_is_noop() {
        let job = "job:1".to_string();
        let complete = JobSnapshot::new(JobStatus::Complete, vec![t("a")]).with_answer("first");
        let failed = JobSnapshot::new(JobStatus::Failed, vec![t("b")]);

        let once = reconcile(&list(&job), &job, &complete);
        let twice = reconcile(&once, &job, &failed);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_same_snapshot_twice_is_idempotent() {
        let job = "job:1".to_string();
        for status in [JobStatus::Queued, JobStatus::Running, JobStatus::Complete, JobStatus::Failed] {
            let snapshot = JobSnapshot::new(status, vec![t("x")]).with_answer("answer");
            let once = reconcile(&list(&job), &job, &snapshot);
            let twice = reconcile(&once, &job, &snapshot);
            assert_eq!(once, twice, "status {status}");
        }
    }

    #[test]
    fn test_unmatched_job_id_is_ignored() {
        let before = list("job:current");
        let stale = JobSnapshot::new(JobStatus::Complete, vec![t("late")]).with_answer("stale");
        let after = reconcile(&before, &"job:old".to_string(), &stale);
        assert_eq!(before, after);
    }

    #[test]
    fn test_superseded_job_in_same_chat_is_discarded() {
        // An earlier answer in the same chat has finished and lost its binding;
        // a newer placeholder is bound to a different job.
        let old_job = "job:old".to_string();
        let new_job = "job:new".to_string();
        let mut messages = list(&old_job);
        messages = reconcile(
            &messages,
            &old_job,
            &JobSnapshot::new(JobStatus::Cancelled, vec![]),
        );
        messages.push(Message::user("again"));
        messages.push(Message::placeholder("model-new", &new_job, vec![Thought::queued()]));

        let late = JobSnapshot::new(JobStatus::Complete, vec![t("late")]).with_answer("stale answer");
        let after = reconcile(&messages, &old_job, &late);

        assert_eq!(after, messages);
        assert_eq!(after[3].job_id.as_deref(), Some("job:new"));
    }

    #[test]
    fn test_fail_forces_error_and_reveals_immediately() {
        let job = "job:1".to_string();
        let after = fail(&list(&job), &job, messages::POLL_FAILED);
        assert_eq!(after[1].role, Role::Error);
        assert_eq!(after[1].content, messages::POLL_FAILED);
        assert_eq!(after[1].displayed_content, messages::POLL_FAILED);
        assert!(after[1].job_id.is_none());
        assert!(!is_bound(&after, &job));
    }

    #[test]
    fn test_content_replacement_keeps_displayed_prefix() {
        let job = "job:1".to_string();
        let mut messages = list(&job);
        messages[1].content = "héllo".into();
        messages[1].displayed_content = "hé".into();
        let after = reconcile(
            &messages,
            &job,
            &JobSnapshot::new(JobStatus::Complete, vec![]).with_answer("hey"),
        );
        assert_eq!(after[1].displayed_content, "h");
        assert!(after[1].content.starts_with(&after[1].displayed_content));
    }
}
