//! Bounded sample history and the rolling recent-window aggregate.

use super::scores::EmotionScores;
use chrono::{DateTime, Local, TimeDelta};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Roughly five seconds of frames at ~10 fps.
pub const DEFAULT_CAPACITY: usize = 50;

/// Span of the recent window in seconds.
pub const DEFAULT_RECENT_WINDOW_SECS: f64 = 5.0;

/// One classified frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    dominant: String,
    scores: EmotionScores,
    captured_at: DateTime<Local>,
}

impl Sample {
    pub fn new(dominant: impl Into<String>, scores: EmotionScores, captured_at: DateTime<Local>) -> Self {
        Self {
            dominant: dominant.into(),
            scores,
            captured_at,
        }
    }

    pub fn dominant(&self) -> &str {
        &self.dominant
    }

    pub fn scores(&self) -> &EmotionScores {
        &self.scores
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }
}

/// FIFO of the most recent samples, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl HistoryWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted oldest one when full.
    ///
    /// A sample stamped earlier than the newest held sample is re-stamped to
    /// that time so the window stays in capture order.
    pub fn push(&mut self, mut sample: Sample) -> Option<Sample> {
        if let Some(last) = self.samples.back() {
            if sample.captured_at < last.captured_at {
                sample.captured_at = last.captured_at;
            }
        }
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Samples captured within `window` of `now`.
    pub fn recent(&self, now: DateTime<Local>, window: TimeDelta) -> impl Iterator<Item = &Sample> {
        self.samples
            .iter()
            .filter(move |s| now.signed_duration_since(s.captured_at) <= window)
    }

    /// Aggregate distribution over the recent window.
    pub fn aggregate(&self, now: DateTime<Local>, window: TimeDelta) -> Option<AggregatedDistribution> {
        AggregatedDistribution::from_samples(self.recent(now, window))
    }
}

/// Per-label share of all confidence mass in a set of samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedDistribution {
    weights: BTreeMap<String, f64>,
    sample_count: usize,
}

impl AggregatedDistribution {
    /// Sum each label across the samples, then normalise by the grand total.
    ///
    /// `None` when there are no samples or the total confidence is zero.
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Option<Self> {
        let mut sums: BTreeMap<String, f64> = BTreeMap::new();
        let mut sample_count = 0;
        for sample in samples {
            sample_count += 1;
            for (label, score) in sample.scores.iter() {
                if score.is_finite() && score >= 0.0 {
                    *sums.entry(label.to_string()).or_insert(0.0) += score;
                }
            }
        }

        let total: f64 = sums.values().sum();
        if sample_count == 0 || total <= 0.0 {
            return None;
        }

        let weights = sums.into_iter().map(|(k, v)| (k, v / total)).collect();
        Some(Self {
            weights,
            sample_count,
        })
    }

    pub fn weight(&self, label: &str) -> Option<f64> {
        self.weights.get(label).copied()
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Heaviest label; ties resolve to the smallest label.
    pub fn dominant(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, weight) in &self.weights {
            match best {
                Some((_, top)) if *weight <= top => {}
                _ => best = Some((label.as_str(), *weight)),
            }
        }
        best
    }
}

impl fmt::Display for AggregatedDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.dominant().map(|(l, _)| l).unwrap_or("-");
        let parts: Vec<String> = self
            .weights
            .iter()
            .map(|(k, v)| format!("{}={:.2}", k, v))
            .collect();
        write!(f, "Emotion: {} | Scores: {}", label, parts.join(" "))
    }
}
