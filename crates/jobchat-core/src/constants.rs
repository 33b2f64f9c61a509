//! Application constants and configuration defaults
//!
//! Centralized location for timing cadences, fixed user-facing strings and
//! default values. Everything here can be overridden through `ClientConfig`
//! except the message strings.

use std::time::Duration;

/// HTTP client configuration
pub mod http {
    use super::*;

    /// Default backend base URL (the reference backend mounts its API under /api)
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

    /// Connection timeout for HTTP requests
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Per-request timeout. Status queries are short; nothing streams.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// User agent sent with every request
    pub const USER_AGENT: &str = concat!("jobchat/", env!("CARGO_PKG_VERSION"));
}

/// Job polling and text reveal cadences
pub mod timing {
    use super::*;

    /// Interval between two job status queries
    pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

    /// Interval between two reveal steps
    pub const REVEAL_TICK: Duration = Duration::from_millis(20);

    /// Characters revealed per message per reveal step
    pub const REVEAL_UNITS_PER_TICK: usize = 1;
}

/// Chat defaults
pub mod chat {
    /// Maximum number of characters taken from the first message as chat title
    pub const TITLE_MAX_CHARS: usize = 50;

    /// Thought type used for the queued notice on a fresh placeholder
    pub const QUEUED_THOUGHT_KIND: &str = "log";
}

/// Fixed user-facing strings
pub mod messages {
    /// Title used when the first message yields no usable title
    pub const DEFAULT_CHAT_TITLE: &str = "New chat";

    /// First thought shown on a freshly submitted job
    pub const JOB_QUEUED: &str = "Job queued...";

    /// Content of a model message whose job ended in `failed`
    pub const JOB_FAILED: &str = "Job processing failed.";

    /// Content of a model message whose status query errored
    pub const POLL_FAILED: &str = "Failed to fetch job status.";

    /// Single message shown when a chat could not be loaded
    pub const CHAT_LOAD_FAILED: &str = "Failed to load this chat.";
}

/// Paths and environment
pub mod env {
    /// Config directory name under the home directory
    pub const CONFIG_DIR_NAME: &str = ".jobchat";

    /// Config file name inside the config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// Logs subdirectory name
    pub const LOGS_DIR_NAME: &str = "logs";

    pub const BASE_URL: &str = "JOBCHAT_BASE_URL";
    pub const API_TOKEN: &str = "JOBCHAT_API_TOKEN";
    pub const POLL_INTERVAL_MS: &str = "JOBCHAT_POLL_INTERVAL_MS";
    pub const REVEAL_TICK_MS: &str = "JOBCHAT_REVEAL_TICK_MS";
}
