use super::record::{parse_line, TransitionRecord};
use super::JournalError;
use std::path::Path;
use tracing::{debug, warn};

/// Records read from a log plus how many lines were unreadable.
#[derive(Debug, Clone, Default)]
pub struct LogContents {
    pub records: Vec<TransitionRecord>,
    pub skipped_lines: usize,
}

/// Read every parseable record from the log at `path`.
///
/// A missing file is an empty log. Blank lines are ignored; malformed lines,
/// including ones that are not valid UTF-8, are counted and skipped without
/// stopping the read. Only I/O failures on an existing file are errors.
pub fn read_log(path: &Path) -> Result<LogContents, JournalError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(target: "journal", "No log at {}, treating as empty", path.display());
            return Ok(LogContents::default());
        }
        Err(source) => {
            return Err(JournalError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut out = LogContents::default();
    for (idx, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        match std::str::from_utf8(raw) {
            Ok(line) => out.push_line(idx + 1, line),
            Err(e) => {
                warn!(target: "journal", "Skipping log line {}: {}", idx + 1, e);
                out.skipped_lines += 1;
            }
        }
    }
    Ok(out)
}

/// Parse log text already in memory.
pub fn parse_log(content: &str) -> LogContents {
    let mut out = LogContents::default();
    for (idx, line) in content.lines().enumerate() {
        out.push_line(idx + 1, line);
    }
    out
}

impl LogContents {
    fn push_line(&mut self, line_no: usize, line: &str) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            return;
        }
        match parse_line(line) {
            Ok(record) => self.records.push(record),
            Err(e) => {
                warn!(target: "journal", "Skipping log line {}: {}", line_no, e);
                self.skipped_lines += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOG: &str = "\
Date: 2024-01-01 | Time: 10:00:00 | Transition: happy -> sad | Duration: 2.00s | Scores: {'sad': 0.9, 'happy': 0.1}
Date: 2024-01-01 | Time: 10:00:05 | Transition: sad -> angry | Duration: 5.00s | Scores: {'angry': 0.8, oops}

{\"date\":\"2024-01-02\",\"time\":\"09:00:00\",\"from\":\"angry\",\"to\":\"neutral\",\"duration_secs\":1.5,\"scores\":{\"neutral\":0.6}}

";

    #[test]
    fn malformed_line_is_skipped_and_rest_parsed() {
        let contents = parse_log(LOG);
        assert_eq!(contents.records.len(), 2);
        assert_eq!(contents.skipped_lines, 1);
        assert_eq!(contents.records[0].to, "sad");
        assert_eq!(contents.records[1].to, "neutral");
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let contents = read_log(&tmp.path().join("nope.txt")).unwrap();
        assert!(contents.records.is_empty());
        assert_eq!(contents.skipped_lines, 0);
    }

    #[test]
    fn reads_file_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("emotion_log.txt");
        std::fs::write(&path, LOG).unwrap();
        assert_eq!(read_log(&path).unwrap().records.len(), 2);
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("emotion_log.txt");
        let mut bytes = b"Date: 2024-01-01 | Time: 10:00:00 | Transition: happy -> sad | Duration: 2.00s | Scores: {'sad': 0.9}\n".to_vec();
        bytes.extend_from_slice(b"garbage \xff\xfe line\r\n");
        bytes.extend_from_slice(b"Date: 2024-01-01 | Time: 10:00:04 | Transition: sad -> fear | Duration: 4.00s | Scores: {'fear': 0.7}\r\n");
        std::fs::write(&path, bytes).unwrap();

        let contents = read_log(&path).unwrap();
        assert_eq!(contents.records.len(), 2);
        assert_eq!(contents.skipped_lines, 1);
        assert_eq!(contents.records[1].to, "fear");
    }
}
