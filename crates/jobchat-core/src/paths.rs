//! Filesystem locations

use std::path::PathBuf;

use crate::constants::env;

/// Root directory for jobchat files (`~/.jobchat`)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(env::CONFIG_DIR_NAME)
}

/// Default configuration file
pub fn config_file() -> PathBuf {
    config_dir().join(env::CONFIG_FILE_NAME)
}

/// Log file directory
pub fn logs_dir() -> PathBuf {
    config_dir().join(env::LOGS_DIR_NAME)
}
