//! Emotion score maps as produced by the classifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Labels the stock FER-style classifier emits. Other classifiers may add more.
pub const STANDARD_LABELS: [&str; 7] = [
    "angry", "disgust", "fear", "happy", "sad", "surprise", "neutral",
];

/// Label → confidence for a single detection.
///
/// Keys are kept in label order so rendering and tie-breaking are
/// deterministic regardless of the order the classifier produced them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionScores(BTreeMap<String, f64>);

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, score: f64) -> Option<f64> {
        self.0.insert(label.into(), score)
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all finite scores.
    pub fn total(&self) -> f64 {
        self.0.values().filter(|v| v.is_finite()).sum()
    }

    /// The label with the highest score.
    ///
    /// Equal maxima resolve to the lexicographically smallest label. Non-finite
    /// scores never win. Returns `None` when no finite score exists.
    pub fn dominant(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, score) in self.iter() {
            if !score.is_finite() {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((label, score)),
            }
        }
        best
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for EmotionScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(label, score)| format!("{}={:.2}", label, score))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// One face found in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub scores: EmotionScores,
}

impl FaceDetection {
    pub fn new(scores: EmotionScores) -> Self {
        Self { scores }
    }

    /// Every score is finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        self.scores.iter().all(|(_, score)| score.is_finite() && score >= 0.0)
    }

    /// Dominant label of this detection, if it carries any usable score.
    pub fn dominant_label(&self) -> Option<&str> {
        self.scores.dominant().map(|(label, _)| label)
    }
}
