//! Tracker configuration and the generic JSON load/save helpers behind it.

use crate::journal::LogFormat;
use crate::tracker::history::{DEFAULT_CAPACITY, DEFAULT_RECENT_WINDOW_SECS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to write config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Transition log, appended to on every dominant-emotion change.
    pub log_path: PathBuf,
    pub log_format: LogFormat,
    /// Where end-of-session charts go.
    pub output_dir: PathBuf,
    pub history_capacity: usize,
    pub recent_window_secs: f64,
    /// Chatbot conversation summaries, read by `summary` and `day`.
    pub chat_history_path: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("emotion_log.jsonl"),
            log_format: LogFormat::JsonLines,
            output_dir: PathBuf::from("emotion_session_data"),
            history_capacity: DEFAULT_CAPACITY,
            recent_window_secs: DEFAULT_RECENT_WINDOW_SECS,
            chat_history_path: PathBuf::from("chat_history.txt"),
        }
    }
}

/// Generic load for any Serde config type with a `Default` implementation.
/// Falls back to `T::default()` if the file is missing or unparsable.
pub fn load_json_config<T: DeserializeOwned + Default>(path: &Path, label: &str) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(config) => {
                info!("[{}] Loaded config from {}", label, path.display());
                config
            }
            Err(e) => {
                warn!(
                    "[{}] Failed to parse config {}: {}, using defaults",
                    label,
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(_) => {
            info!(
                "[{}] No config file at {}, using defaults",
                label,
                path.display()
            );
            T::default()
        }
    }
}

/// Generic save for any Serde config type.
pub fn save_json_config<T: Serialize>(path: &Path, config: &T, label: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).map_err(io_err(path))?;
    info!("[{}] Saved config to {}", label, path.display());
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config: TrackerConfig = load_json_config(&tmp.path().join("none.json"), "Test");
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("tracker.json");
        let config = TrackerConfig {
            log_format: LogFormat::Legacy,
            history_capacity: 20,
            ..TrackerConfig::default()
        };
        save_json_config(&path, &config, "Test").unwrap();
        let loaded: TrackerConfig = load_json_config(&path, "Test");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tracker.json");
        std::fs::write(&path, r#"{"log_format": "legacy"}"#).unwrap();
        let loaded: TrackerConfig = load_json_config(&path, "Test");
        assert_eq!(loaded.log_format, LogFormat::Legacy);
        assert_eq!(loaded.history_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tracker.json");
        std::fs::write(&path, "not json").unwrap();
        let loaded: TrackerConfig = load_json_config(&path, "Test");
        assert_eq!(loaded, TrackerConfig::default());
    }
}
