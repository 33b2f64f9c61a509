//! Client configuration
//!
//! Resolved in layers, later ones winning:
//! 1. Built-in defaults (`constants`)
//! 2. TOML file (`~/.jobchat/config.toml` unless another path is given)
//! 3. Environment variables (`JOBCHAT_*`)
//!
//! Command-line flags are applied on top by the binary.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::{self, env};
use crate::error::{ClientError, Result};
use crate::paths;

/// Settings for the backend binding and the two cadences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend API base URL, including the `/api` prefix
    pub base_url: String,
    /// Bearer token sent with every request
    pub api_token: Option<String>,
    /// Interval between job status queries
    pub poll_interval: Duration,
    /// Interval between reveal steps
    pub reveal_tick: Duration,
    /// Characters revealed per message per step
    pub reveal_units_per_tick: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: constants::http::DEFAULT_BASE_URL.to_string(),
            api_token: None,
            poll_interval: constants::timing::POLL_INTERVAL,
            reveal_tick: constants::timing::REVEAL_TICK,
            reveal_units_per_tick: constants::timing::REVEAL_UNITS_PER_TICK,
            connect_timeout: constants::http::CONNECT_TIMEOUT,
            request_timeout: constants::http::REQUEST_TIMEOUT,
        }
    }
}

/// On-disk shape of the configuration file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    api_token: Option<String>,
    poll_interval_ms: Option<u64>,
    reveal_tick_ms: Option<u64>,
    reveal_units_per_tick: Option<usize>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Defaults, then the config file, then the environment
    ///
    /// A missing file at the default location is fine; an explicitly given
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        match path {
            Some(path) => config.merge_file(path)?,
            None => {
                let default_path = paths::config_file();
                if default_path.exists() {
                    config.merge_file(&default_path)?;
                } else {
                    debug!(path = %default_path.display(), "No config file, using defaults");
                }
            }
        }
        config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a TOML file
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.merge_toml(&text)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded config file");
        Ok(())
    }

    fn merge_toml(&mut self, text: &str) -> std::result::Result<(), toml::de::Error> {
        let file: FileConfig = toml::from_str(text)?;
        if let Some(url) = file.base_url {
            self.base_url = url;
        }
        if file.api_token.is_some() {
            self.api_token = file.api_token;
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.reveal_tick_ms {
            self.reveal_tick = Duration::from_millis(ms);
        }
        if let Some(units) = file.reveal_units_per_tick {
            self.reveal_units_per_tick = units;
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Overlay values from `JOBCHAT_*` environment variables
    pub fn merge_env(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from any variable lookup. Empty values are ignored, as
    /// are durations that don't parse.
    pub fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        if let Some(url) = get(env::BASE_URL) {
            self.base_url = url;
        }
        if let Some(token) = get(env::API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(ms) = get(env::POLL_INTERVAL_MS).and_then(|v| v.trim().parse().ok()) {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = get(env::REVEAL_TICK_MS).and_then(|v| v.trim().parse().ok()) {
            self.reveal_tick = Duration::from_millis(ms);
        }
    }

    /// Reject settings the timers can't run with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ClientError::Config("poll interval must be positive".into()));
        }
        if self.reveal_tick.is_zero() {
            return Err(ClientError::Config("reveal tick must be positive".into()));
        }
        if self.reveal_units_per_tick == 0 {
            return Err(ClientError::Config(
                "reveal units per tick must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_match_documented_cadences() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.reveal_tick, Duration::from_millis(20));
        assert_eq!(config.reveal_units_per_tick, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url = \"https://chat.example/api\"\npoll_interval_ms = 500\nreveal_units_per_tick = 3"
        )
        .unwrap();

        let config = ClientConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.base_url, "https://chat.example/api");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.reveal_units_per_tick, 3);
        assert_eq!(config.reveal_tick, Duration::from_millis(20));
    }

    #[test]
    fn test_unknown_file_key_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_every = 3").unwrap();
        let mut config = ClientConfig::default();
        let err = config.merge_file(file.path()).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ClientError::Io(_))));
    }

    #[test]
    fn test_env_overrides_and_ignores_empty_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env::BASE_URL, "http://backend:9000/api"),
            (env::API_TOKEN, ""),
            (env::POLL_INTERVAL_MS, "750"),
            (env::REVEAL_TICK_MS, "not-a-number"),
        ]);
        let mut config = ClientConfig::default();
        config.merge_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url, "http://backend:9000/api");
        assert!(config.api_token.is_none());
        assert_eq!(config.poll_interval, Duration::from_millis(750));
        assert_eq!(config.reveal_tick, Duration::from_millis(20));
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        let config = ClientConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            reveal_units_per_tick: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
