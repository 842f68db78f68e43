//! Per-run sampling session: history, transition state and tally.

use super::history::{AggregatedDistribution, HistoryWindow, Sample, DEFAULT_CAPACITY, DEFAULT_RECENT_WINDOW_SECS};
use super::scores::FaceDetection;
use super::state::TrackerState;
use crate::journal::TransitionRecord;
use chrono::{DateTime, Local, TimeDelta};
use std::collections::BTreeMap;

/// Result of feeding one frame's detection into the session.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    /// Recent-window aggregate for display; `None` when the window is empty.
    pub distribution: Option<AggregatedDistribution>,
    /// Set when this frame changed the dominant emotion.
    pub transition: Option<TransitionRecord>,
}

/// Counters and tally left over once a session ends.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
    pub frames_ingested: u64,
    pub frames_skipped: u64,
    pub transitions: u64,
    pub tally: BTreeMap<String, u64>,
}

/// All mutable state of one sampling run.
///
/// Owned by the capture loop; nothing here is shared across threads.
#[derive(Debug, Clone)]
pub struct EmotionSession {
    history: HistoryWindow,
    state: TrackerState,
    tally: BTreeMap<String, u64>,
    recent_window: TimeDelta,
    started_at: Option<DateTime<Local>>,
    last_frame_at: Option<DateTime<Local>>,
    frames_ingested: u64,
    frames_skipped: u64,
    transitions: u64,
}

impl Default for EmotionSession {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RECENT_WINDOW_SECS)
    }
}

impl EmotionSession {
    pub fn new(history_capacity: usize, recent_window_secs: f64) -> Self {
        let window_ms = (recent_window_secs.max(0.0) * 1000.0).round() as i64;
        Self {
            history: HistoryWindow::with_capacity(history_capacity),
            state: TrackerState::Idle,
            tally: BTreeMap::new(),
            recent_window: TimeDelta::milliseconds(window_ms),
            started_at: None,
            last_frame_at: None,
            frames_ingested: 0,
            frames_skipped: 0,
            transitions: 0,
        }
    }

    /// Feed the classifier result for the frame captured at `now`.
    ///
    /// A missing face, a face without any score, or one carrying a NaN,
    /// infinite or negative score leaves history, tally and state untouched. The recent-window aggregate is recomputed
    /// either way.
    pub fn ingest(&mut self, detection: Option<&FaceDetection>, now: DateTime<Local>) -> IngestOutcome {
        self.started_at.get_or_insert(now);
        self.last_frame_at = Some(now);

        let transition = match detection
            .filter(|d| d.is_well_formed())
            .and_then(|d| d.dominant_label().map(|l| (l, d)))
        {
            Some((label, detection)) => {
                let label = label.to_string();
                self.frames_ingested += 1;
                self.history
                    .push(Sample::new(label.clone(), detection.scores.clone(), now));
                *self.tally.entry(label.clone()).or_insert(0) += 1;

                let state = std::mem::take(&mut self.state);
                let (next, transition) = state.step(&label, now);
                self.state = next;

                transition.map(|t| {
                    self.transitions += 1;
                    TransitionRecord::from_transition(&t, detection.scores.clone())
                })
            }
            None => {
                self.frames_skipped += 1;
                None
            }
        };

        IngestOutcome {
            distribution: self.history.aggregate(now, self.recent_window),
            transition,
        }
    }

    /// Count a frame dropped before classification.
    pub fn note_skipped_frame(&mut self) {
        self.frames_skipped += 1;
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn tally(&self) -> &BTreeMap<String, u64> {
        &self.tally
    }

    pub fn frames_ingested(&self) -> u64 {
        self.frames_ingested
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            started_at: self.started_at,
            ended_at: self.last_frame_at,
            frames_ingested: self.frames_ingested,
            frames_skipped: self.frames_skipped,
            transitions: self.transitions,
            tally: self.tally.clone(),
        }
    }

    /// End the session, keeping only its summary.
    pub fn finish(self) -> SessionSummary {
        self.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::EmotionScores;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + TimeDelta::milliseconds(ms)
    }

    fn face(pairs: &[(&str, f64)]) -> FaceDetection {
        FaceDetection::new(pairs.iter().map(|(k, v)| (*k, *v)).collect())
    }

    #[test]
    fn happy_happy_sad_yields_single_transition() {
        let mut session = EmotionSession::default();
        let frames = [
            face(&[("happy", 0.8), ("sad", 0.2)]),
            face(&[("happy", 0.7), ("sad", 0.3)]),
            face(&[("happy", 0.1), ("sad", 0.9)]),
        ];

        let mut transitions = Vec::new();
        for (i, f) in frames.iter().enumerate() {
            let outcome = session.ingest(Some(f), t(i as i64 * 1000));
            transitions.extend(outcome.transition);
        }

        assert_eq!(transitions.len(), 1);
        let record = &transitions[0];
        assert_eq!(record.from, "happy");
        assert_eq!(record.to, "sad");
        assert!((record.duration_secs - 2.0).abs() < 1e-9);
        assert_eq!(record.scores.get("sad"), Some(0.9));

        let expected: BTreeMap<String, u64> =
            [("happy".to_string(), 2), ("sad".to_string(), 1)].into_iter().collect();
        assert_eq!(session.tally(), &expected);
        assert_eq!(session.transitions(), 1);
    }

    #[test]
    fn first_detection_never_transitions() {
        let mut session = EmotionSession::default();
        let outcome = session.ingest(Some(&face(&[("angry", 1.0)])), t(0));
        assert!(outcome.transition.is_none());
        assert_eq!(session.state().current_label(), Some("angry"));
    }

    #[test]
    fn no_face_changes_nothing_but_still_aggregates() {
        let mut session = EmotionSession::default();
        session.ingest(Some(&face(&[("happy", 1.0)])), t(0));
        let outcome = session.ingest(None, t(500));

        assert!(outcome.transition.is_none());
        assert!(outcome.distribution.is_some());
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.frames_ingested(), 1);
        assert_eq!(session.frames_skipped(), 1);
    }

    #[test]
    fn empty_scores_count_as_no_face() {
        let mut session = EmotionSession::default();
        let outcome = session.ingest(Some(&FaceDetection::new(EmotionScores::new())), t(0));
        assert!(outcome.distribution.is_none());
        assert!(session.tally().is_empty());
        assert_eq!(session.state(), &TrackerState::Idle);
    }

    #[test]
    fn malformed_scores_count_as_no_face() {
        let mut session = EmotionSession::default();
        session.ingest(Some(&face(&[("happy", 1.0), ("sad", 0.0)])), t(0));
        let outcome = session.ingest(Some(&face(&[("sad", 0.9), ("angry", f64::NAN)])), t(500));
        assert!(outcome.transition.is_none());
        let outcome = session.ingest(Some(&face(&[("sad", 0.9), ("fear", -0.2)])), t(700));
        assert!(outcome.transition.is_none());

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.frames_skipped(), 2);
        assert_eq!(session.state().current_label(), Some("happy"));
        assert!(!session.tally().contains_key("sad"));
    }

    #[test]
    fn distribution_drops_stale_samples() {
        let mut session = EmotionSession::new(50, 5.0);
        session.ingest(Some(&face(&[("happy", 1.0)])), t(0));
        let outcome = session.ingest(Some(&face(&[("sad", 1.0)])), t(6_000));
        let dist = outcome.distribution.unwrap();
        assert_eq!(dist.sample_count(), 1);
        assert_eq!(dist.weight("sad"), Some(1.0));
        assert!(dist.weight("happy").is_none());
    }

    #[test]
    fn finish_reports_bounds_and_counters() {
        let mut session = EmotionSession::default();
        session.ingest(Some(&face(&[("happy", 1.0)])), t(0));
        session.note_skipped_frame();
        session.ingest(Some(&face(&[("fear", 1.0)])), t(1500));
        let summary = session.finish();
        assert_eq!(summary.started_at, Some(t(0)));
        assert_eq!(summary.ended_at, Some(t(1500)));
        assert_eq!(summary.frames_ingested, 2);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.transitions, 1);
    }
}
