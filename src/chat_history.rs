//! Chat history file written by the companion chatbot.
//!
//! Each conversation appends a block:
//!
//! ```text
//! Timestamp: 10/18/2026, 3:04:05 PM
//! <one-paragraph summary>
//!
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

const BLOCK_MARKER: &str = "Timestamp: ";
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub at: NaiveDateTime,
    pub summary: String,
}

impl ChatEntry {
    /// Clock time as the dashboard shows it, e.g. `3:04 PM`.
    pub fn display_time(&self) -> String {
        self.at.format("%-I:%M %p").to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
}

impl ChatHistory {
    /// Load from disk. A missing or unreadable file is an empty history.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "chat", "No chat history at {}", path.display());
                Self::default()
            }
            Err(e) => {
                warn!(target: "chat", "Failed to read chat history {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut entries = Vec::new();
        for block in content.split(BLOCK_MARKER).skip(1) {
            let Some((stamp, rest)) = block.trim().split_once('\n') else {
                continue;
            };
            let summary = rest.trim();
            if summary.is_empty() {
                continue;
            }
            match NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT) {
                Ok(at) => entries.push(ChatEntry {
                    at,
                    summary: summary.to_string(),
                }),
                Err(e) => warn!(target: "chat", "Skipping chat block {:?}: {}", stamp.trim(), e),
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn total_interactions(&self) -> usize {
        self.entries.len()
    }

    /// Entries on `date`, earliest first.
    pub fn sessions_on(&self, date: NaiveDate) -> Vec<&ChatEntry> {
        let mut day: Vec<&ChatEntry> = self.entries.iter().filter(|e| e.at.date() == date).collect();
        day.sort_by_key(|e| e.at);
        day
    }

    pub fn active_days(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.at.date())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// The last `n` entries in file order.
    pub fn recent(&self, n: usize) -> &[ChatEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }
}
