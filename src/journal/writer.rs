use super::record::{LogFormat, TransitionRecord};
use super::JournalError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends transition records to the log file, one line each.
#[derive(Debug, Clone)]
pub struct TransitionLogger {
    path: PathBuf,
    format: LogFormat,
}

impl TransitionLogger {
    pub fn new(path: impl Into<PathBuf>, format: LogFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Validate, render and append `record` as exactly one line.
    ///
    /// The file is opened per call and closed when this returns, on success
    /// or failure. Nothing is written when validation fails.
    pub fn append(&self, record: &TransitionRecord) -> Result<(), JournalError> {
        let mut line = record.render(self.format)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| JournalError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let io_err = |source| JournalError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        debug!(target: "journal", path = %self.path.display(), "appended {} -> {}", record.from, record.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::parse_line;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(from: &str, to: &str, secs: f64) -> TransitionRecord {
        TransitionRecord {
            logged_at: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            from: from.to_string(),
            to: to.to_string(),
            duration_secs: secs,
            scores: [("happy", 0.3), ("sad", 0.7)].into_iter().collect(),
        }
    }

    #[test]
    fn appends_one_line_per_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("emotion_log.txt");
        let logger = TransitionLogger::new(&path, LogFormat::Legacy);

        logger.append(&record("happy", "sad", 1.5)).unwrap();
        logger.append(&record("sad", "happy", 0.25)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(content.ends_with('\n'));
        assert_eq!(parse_line(lines[1]).unwrap().to, "happy");
    }

    #[test]
    fn append_preserves_existing_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log.jsonl");
        std::fs::write(&path, "existing line\n").unwrap();

        TransitionLogger::new(&path, LogFormat::JsonLines)
            .append(&record("happy", "fear", 3.0))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("existing line\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn invalid_record_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log.txt");
        let logger = TransitionLogger::new(&path, LogFormat::Legacy);

        let err = logger.append(&record("happy|x", "sad", 1.0)).unwrap_err();
        assert!(matches!(err, JournalError::InvalidField { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_surfaces_io_error() {
        let tmp = TempDir::new().unwrap();
        // A directory where the log file should be.
        let path = tmp.path().join("is_a_dir");
        std::fs::create_dir_all(&path).unwrap();

        let err = TransitionLogger::new(&path, LogFormat::Legacy)
            .append(&record("happy", "sad", 1.0))
            .unwrap_err();
        assert!(matches!(err, JournalError::Io { .. }));
    }
}
