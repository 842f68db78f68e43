//! Append-only transition log: record format, writer, reader and queries.
//!
//! The log has a single writer (the capture loop) and any number of readers.
//! There is no rotation, compaction or cross-process locking; two writers
//! appending to the same file may interleave lines.

pub mod literal;
pub mod query;
pub mod reader;
pub mod record;
pub mod writer;

pub use query::{LogQuery, Period};
pub use reader::{read_log, LogContents};
pub use record::{parse_line, LogFormat, TransitionRecord};
pub use writer::TransitionLogger;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("log I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("failed to encode record: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single line or literal that could not be read. Always local to that line.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("score literal error at byte {pos}: {message}")]
    Literal { pos: usize, message: String },
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("bad {field}: {value:?}")]
    BadField { field: &'static str, value: String },
    #[error("invalid JSON record: {0}")]
    Json(String),
}
