//! Transition records and their two on-disk line formats.
//!
//! Legacy text line:
//!
//! ```text
//! Date: 2024-01-01 | Time: 10:00:00 | Transition: happy -> sad | Duration: 2.00s | Scores: {'happy': 0.1, 'sad': 0.9}
//! ```
//!
//! JSON Lines: one object per line with `date`, `time`, `from`, `to`,
//! `duration_secs` and `scores`.

use super::literal::{parse_scores, render_scores};
use super::{JournalError, ParseError};
use crate::tracker::{EmotionScores, Transition};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between legacy line fields. Never allowed inside a field.
pub const FIELD_SEPARATOR: char = '|';

/// Characters a label may not contain: the field separator plus everything
/// the legacy line and score literal use as syntax.
const RESERVED_LABEL_CHARS: &[char] = &[FIELD_SEPARATOR, '\'', '"', '{', '}', ':', ',', '\\', '>'];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    JsonLines,
    /// The pipe-separated text line older dashboards read.
    Legacy,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" | "json_lines" | "json-lines" => Ok(LogFormat::JsonLines),
            "legacy" | "text" => Ok(LogFormat::Legacy),
            other => Err(format!("unknown log format: {} (expected json or legacy)", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::JsonLines => write!(f, "json"),
            LogFormat::Legacy => write!(f, "legacy"),
        }
    }
}

/// One dominant-emotion change, as appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    /// Local wall-clock time the change was detected.
    pub logged_at: NaiveDateTime,
    pub from: String,
    pub to: String,
    pub duration_secs: f64,
    /// Scores of the detection that triggered the change.
    pub scores: EmotionScores,
}

#[derive(Serialize, Deserialize)]
struct JsonRecord {
    date: String,
    time: String,
    from: String,
    to: String,
    duration_secs: f64,
    scores: EmotionScores,
}

impl TransitionRecord {
    pub fn from_transition(transition: &Transition, scores: EmotionScores) -> Self {
        Self {
            logged_at: transition.at.naive_local(),
            from: transition.from.clone(),
            to: transition.to.clone(),
            duration_secs: transition.duration_secs(),
            scores,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.logged_at.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.logged_at.time()
    }

    /// Highest-scoring label of the triggering detection.
    pub fn dominant(&self) -> Option<(&str, f64)> {
        self.scores.dominant()
    }

    /// Duration as written to disk (two decimals).
    pub fn rounded_duration(&self) -> f64 {
        (self.duration_secs * 100.0).round() / 100.0
    }

    /// Reject anything that would corrupt a log line.
    pub fn validate(&self) -> Result<(), JournalError> {
        validate_label("from", &self.from)?;
        validate_label("to", &self.to)?;
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(JournalError::InvalidField {
                field: "duration",
                reason: format!("must be a non-negative number, got {}", self.duration_secs),
            });
        }
        for (label, score) in self.scores.iter() {
            validate_label("score label", label)?;
            if !score.is_finite() || score < 0.0 {
                return Err(JournalError::InvalidField {
                    field: "score",
                    reason: format!("{} has out-of-range score {}", label, score),
                });
            }
        }
        Ok(())
    }

    /// Render one line (without the trailing newline) in `format`.
    pub fn render(&self, format: LogFormat) -> Result<String, JournalError> {
        self.validate()?;
        match format {
            LogFormat::Legacy => Ok(self.to_legacy_line()),
            LogFormat::JsonLines => Ok(serde_json::to_string(&JsonRecord {
                date: self.date().format(DATE_FORMAT).to_string(),
                time: self.time().format(TIME_FORMAT).to_string(),
                from: self.from.clone(),
                to: self.to.clone(),
                duration_secs: self.rounded_duration(),
                scores: self.scores.clone(),
            })?),
        }
    }

    fn to_legacy_line(&self) -> String {
        format!(
            "Date: {} | Time: {} | Transition: {} -> {} | Duration: {:.2}s | Scores: {}",
            self.date().format(DATE_FORMAT),
            self.time().format(TIME_FORMAT),
            self.from,
            self.to,
            self.rounded_duration(),
            render_scores(&self.scores),
        )
    }
}

fn validate_label(field: &'static str, label: &str) -> Result<(), JournalError> {
    let reason = if label.trim().is_empty() {
        Some("must not be empty".to_string())
    } else if label.trim() != label {
        Some("must not start or end with whitespace".to_string())
    } else if let Some(c) = label
        .chars()
        .find(|c| c.is_control() || RESERVED_LABEL_CHARS.contains(c))
    {
        Some(format!("{:?} contains reserved character {:?}", label, c))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(JournalError::InvalidField { field, reason }),
        None => Ok(()),
    }
}

/// Parse one log line in either format.
///
/// Lines starting with `{` are read as JSON, everything else as legacy text.
pub fn parse_line(line: &str) -> Result<TransitionRecord, ParseError> {
    let line = line.trim();
    if line.starts_with('{') {
        parse_json_line(line)
    } else {
        parse_legacy_line(line)
    }
}

fn parse_json_line(line: &str) -> Result<TransitionRecord, ParseError> {
    let raw: JsonRecord =
        serde_json::from_str(line).map_err(|e| ParseError::Json(e.to_string()))?;
    if let Some((label, score)) = raw.scores.iter().find(|(_, s)| !s.is_finite() || *s < 0.0) {
        return Err(ParseError::BadField {
            field: "scores",
            value: format!("{}={}", label, score),
        });
    }
    Ok(TransitionRecord {
        logged_at: parse_timestamp(&raw.date, &raw.time)?,
        from: non_empty("from", raw.from)?,
        to: non_empty("to", raw.to)?,
        duration_secs: check_duration(raw.duration_secs, &raw.duration_secs.to_string())?,
        scores: raw.scores,
    })
}

fn parse_legacy_line(line: &str) -> Result<TransitionRecord, ParseError> {
    let parts: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
    if parts.len() != 5 {
        return Err(ParseError::BadField {
            field: "line",
            value: format!("expected 5 fields, found {}", parts.len()),
        });
    }

    let date = field(parts[0], "Date:")?;
    let time = field(parts[1], "Time:")?;
    let transition = field(parts[2], "Transition:")?;
    let duration = field(parts[3], "Duration:")?;
    let scores = field(parts[4], "Scores:")?;

    let (from, to) = transition
        .split_once("->")
        .ok_or_else(|| ParseError::BadField {
            field: "Transition",
            value: transition.to_string(),
        })?;

    let duration = duration.strip_suffix('s').unwrap_or(duration);

    Ok(TransitionRecord {
        logged_at: parse_timestamp(date, time)?,
        from: non_empty("from", from.trim().to_string())?,
        to: non_empty("to", to.trim().to_string())?,
        duration_secs: parse_duration(duration)?,
        scores: parse_scores(scores)?,
    })
}

fn field<'a>(part: &'a str, prefix: &'static str) -> Result<&'a str, ParseError> {
    part.strip_prefix(prefix)
        .map(str::trim)
        .ok_or(ParseError::MissingField(prefix))
}

fn non_empty(field: &'static str, value: String) -> Result<String, ParseError> {
    if value.is_empty() {
        Err(ParseError::BadField { field, value })
    } else {
        Ok(value)
    }
}

fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime, ParseError> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| ParseError::BadField {
        field: "Date",
        value: date.to_string(),
    })?;
    let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT).map_err(|_| ParseError::BadField {
        field: "Time",
        value: time.to_string(),
    })?;
    Ok(date.and_time(time))
}

fn parse_duration(text: &str) -> Result<f64, ParseError> {
    let value = text.trim().parse::<f64>().map_err(|_| ParseError::BadField {
        field: "Duration",
        value: text.to_string(),
    })?;
    check_duration(value, text)
}

fn check_duration(value: f64, text: &str) -> Result<f64, ParseError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ParseError::BadField {
            field: "Duration",
            value: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: &str, to: &str) -> TransitionRecord {
        TransitionRecord {
            logged_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            from: from.to_string(),
            to: to.to_string(),
            duration_secs: 2.004,
            scores: [("sad", 0.9), ("happy", 0.1)].into_iter().collect(),
        }
    }

    #[test]
    fn parses_documented_legacy_example() {
        let line = "Date: 2024-01-01 | Time: 10:00:00 | Transition: happy -> sad | Duration: 2.00s | Scores: {'sad': 0.9, 'happy': 0.1}";
        let rec = parse_line(line).unwrap();
        assert_eq!(rec.from, "happy");
        assert_eq!(rec.to, "sad");
        assert_eq!(rec.duration_secs, 2.0);
        assert_eq!(rec.scores.get("sad"), Some(0.9));
        assert_eq!(rec.scores.get("happy"), Some(0.1));
        assert_eq!(rec.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn legacy_line_shape_is_stable() {
        let line = record("happy", "sad").render(LogFormat::Legacy).unwrap();
        assert_eq!(
            line,
            "Date: 2024-01-01 | Time: 10:00:00 | Transition: happy -> sad | Duration: 2.00s | Scores: {'happy': 0.1, 'sad': 0.9}"
        );
    }

    #[test]
    fn both_formats_round_trip() {
        let original = record("happy", "sad");
        for format in [LogFormat::Legacy, LogFormat::JsonLines] {
            let parsed = parse_line(&original.render(format).unwrap()).unwrap();
            assert_eq!(parsed.from, original.from);
            assert_eq!(parsed.to, original.to);
            assert_eq!(parsed.duration_secs, original.rounded_duration());
            assert_eq!(parsed.scores, original.scores);
            assert_eq!(parsed.logged_at, original.logged_at);
        }
    }

    #[test]
    fn both_formats_agree_on_rounding_ties() {
        for duration in [0.125, 0.375, 1.005, 2.675, 0.0] {
            let mut original = record("happy", "sad");
            original.duration_secs = duration;
            let legacy = parse_line(&original.render(LogFormat::Legacy).unwrap()).unwrap();
            let json = parse_line(&original.render(LogFormat::JsonLines).unwrap()).unwrap();
            assert_eq!(legacy.duration_secs, json.duration_secs, "{}", duration);
            assert_eq!(legacy.duration_secs, original.rounded_duration());
        }
    }

    #[test]
    fn reserved_characters_are_rejected() {
        for label in ["ha|ppy", "sa'd", "a->b", "", " happy", "new\nline"] {
            let err = record(label, "sad").render(LogFormat::Legacy).unwrap_err();
            assert!(matches!(err, JournalError::InvalidField { .. }), "{:?}", label);
        }
        let mut bad_score = record("happy", "sad");
        bad_score.scores.insert("fe|ar", 0.2);
        assert!(bad_score.render(LogFormat::JsonLines).is_err());
    }

    #[test]
    fn malformed_legacy_lines_fail() {
        for line in [
            "Date: 2024-01-01 | Time: 10:00:00",
            "Date: 2024-13-01 | Time: 10:00:00 | Transition: a -> b | Duration: 1.00s | Scores: {}",
            "Date: 2024-01-01 | Time: 10:00:00 | Transition: a b | Duration: 1.00s | Scores: {}",
            "Date: 2024-01-01 | Time: 10:00:00 | Transition: a -> b | Duration: xs | Scores: {}",
            "Date: 2024-01-01 | Time: 10:00:00 | Transition: a -> b | Duration: 1.00s | Scores: {'a': eval('1')}",
        ] {
            assert!(parse_line(line).is_err(), "should reject {:?}", line);
        }
    }

    #[test]
    fn log_format_parses_from_cli_text() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::JsonLines);
        assert_eq!("Legacy".parse::<LogFormat>().unwrap(), LogFormat::Legacy);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
