//! Read-side summaries over the transition log.
//!
//! One query type backs every dashboard view: per-day sessions, positive
//! share, weekly/monthly valence and transition counts.

use super::reader::read_log;
use super::record::TransitionRecord;
use super::{JournalError, ParseError};
use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Labels counted as a good interaction.
pub const POSITIVE_LABELS: [&str; 3] = ["happy", "surprise", "neutral"];

/// +1 / 0 / -1 mood value of a label. Unknown labels are neutral.
pub fn valence(label: &str) -> i8 {
    match label {
        "angry" | "disgust" | "fear" | "sad" => -1,
        "surprise" | "happy" => 1,
        _ => 0,
    }
}

/// Accepts `MM/DD/YYYY` (as the dashboard sends it) or `YYYY-MM-DD`.
pub fn parse_query_date(text: &str) -> Result<NaiveDate, ParseError> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .map_err(|_| ParseError::BadField {
            field: "date",
            value: text.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Weeks ending on Sunday.
    Week,
    /// Calendar months, keyed by their last day.
    Month,
}

impl Period {
    /// Last day of the period containing `date`.
    pub fn end_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Week => {
                let to_sunday = 6 - date.weekday().num_days_from_monday();
                date + Days::new(to_sunday as u64)
            }
            Period::Month => {
                let (y, m) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(y, m, 1)
                    .and_then(|first| first.pred_opt())
                    .unwrap_or(date)
            }
        }
    }

    fn next_end(self, end: NaiveDate) -> Option<NaiveDate> {
        end.succ_opt().map(|d| self.end_of(d))
    }
}

/// One record as shown in a day view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEntry {
    pub time: NaiveTime,
    pub emotion: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    records: Vec<TransitionRecord>,
}

impl LogQuery {
    pub fn new(records: Vec<TransitionRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: &Path) -> Result<Self, JournalError> {
        Ok(Self::new(read_log(path)?.records))
    }

    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dominant emotion and its score (2 decimals) for each record on `date`.
    pub fn sessions_on(&self, date: NaiveDate) -> Vec<SessionEntry> {
        self.records
            .iter()
            .filter(|r| r.date() == date)
            .filter_map(|r| {
                let (emotion, score) = r.dominant()?;
                Some(SessionEntry {
                    time: r.time(),
                    emotion: emotion.to_string(),
                    score: (score * 100.0).round() / 100.0,
                })
            })
            .collect()
    }

    /// Percentage (2 decimals) of records whose dominant emotion is positive.
    pub fn positive_percentage(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let positive = self
            .records
            .iter()
            .filter(|r| matches!(r.dominant(), Some((label, _)) if POSITIVE_LABELS.contains(&label)))
            .count();
        let pct = positive as f64 / self.records.len() as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }

    /// Valence of the last record in each period, keyed by period end.
    ///
    /// Periods between the first and last with no records map to 0.
    pub fn valence_by_period(&self, period: Period) -> BTreeMap<NaiveDate, i8> {
        let mut last: BTreeMap<NaiveDate, &TransitionRecord> = BTreeMap::new();
        for record in &self.records {
            last.insert(period.end_of(record.date()), record);
        }

        let (Some(first), Some(final_end)) =
            (last.keys().next().copied(), last.keys().next_back().copied())
        else {
            return BTreeMap::new();
        };

        let mut out = BTreeMap::new();
        let mut end = first;
        while end <= final_end {
            let value = last
                .get(&end)
                .and_then(|r| r.dominant())
                .map(|(label, _)| valence(label))
                .unwrap_or(0);
            out.insert(end, value);
            match period.next_end(end) {
                Some(next) => end = next,
                None => break,
            }
        }
        out
    }

    /// How often each `from -> to` pair occurs.
    pub fn transition_counts(&self) -> BTreeMap<(String, String), usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry((r.from.clone(), r.to.clone())).or_insert(0) += 1;
        }
        counts
    }

    /// How often each label was transitioned into.
    pub fn dominant_tally(&self) -> BTreeMap<String, usize> {
        let mut tally = BTreeMap::new();
        for r in &self.records {
            *tally.entry(r.to.clone()).or_insert(0) += 1;
        }
        tally
    }

    /// Distinct days that have at least one record.
    pub fn active_days(&self) -> usize {
        let mut days: Vec<NaiveDate> = self.records.iter().map(|r| r.date()).collect();
        days.sort();
        days.dedup();
        days.len()
    }
}
