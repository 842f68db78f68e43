//! Dominant-emotion state machine.
//!
//! The state is the label currently holding plus when it started. Feeding a
//! new dominant label either keeps the state, initialises it, or produces a
//! [`Transition`]. No I/O happens here.

use chrono::{DateTime, Local};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum TrackerState {
    /// Nothing classified yet this session.
    #[default]
    Idle,
    /// `label` has been dominant since `started_at`.
    Holding {
        label: String,
        started_at: DateTime<Local>,
    },
}

/// A change of dominant label between consecutive classified frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub started_at: DateTime<Local>,
    pub at: DateTime<Local>,
}

impl Transition {
    /// Seconds the previous label was held. Never negative.
    pub fn duration_secs(&self) -> f64 {
        let held = self.at.signed_duration_since(self.started_at);
        let secs = match held.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => held.num_milliseconds() as f64 / 1_000.0,
        };
        secs.max(0.0)
    }
}

impl TrackerState {
    /// Advance with the dominant label of a new frame captured at `now`.
    pub fn step(self, label: &str, now: DateTime<Local>) -> (TrackerState, Option<Transition>) {
        match self {
            TrackerState::Idle => (
                TrackerState::Holding {
                    label: label.to_string(),
                    started_at: now,
                },
                None,
            ),
            TrackerState::Holding { label: held, started_at } if held == label => {
                (TrackerState::Holding { label: held, started_at }, None)
            }
            TrackerState::Holding { label: held, started_at } => {
                let transition = Transition {
                    from: held,
                    to: label.to_string(),
                    started_at,
                    at: now,
                };
                (
                    TrackerState::Holding {
                        label: label.to_string(),
                        started_at: now,
                    },
                    Some(transition),
                )
            }
        }
    }

    pub fn current_label(&self) -> Option<&str> {
        match self {
            TrackerState::Idle => None,
            TrackerState::Holding { label, .. } => Some(label),
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        match self {
            TrackerState::Idle => None,
            TrackerState::Holding { started_at, .. } => Some(*started_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t(secs: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    #[test]
    fn first_label_initialises_without_transition() {
        let (state, transition) = TrackerState::Idle.step("happy", t(0));
        assert!(transition.is_none());
        assert_eq!(state.current_label(), Some("happy"));
        assert_eq!(state.started_at(), Some(t(0)));
    }

    #[test]
    fn same_label_keeps_start_time() {
        let (state, _) = TrackerState::Idle.step("happy", t(0));
        let (state, transition) = state.step("happy", t(3));
        assert!(transition.is_none());
        assert_eq!(state.started_at(), Some(t(0)));
    }

    #[test]
    fn new_label_emits_transition_with_duration() {
        let (state, _) = TrackerState::Idle.step("happy", t(0));
        let (state, transition) = state.step("sad", t(2));
        let transition = transition.unwrap();
        assert_eq!(transition.from, "happy");
        assert_eq!(transition.to, "sad");
        assert!((transition.duration_secs() - 2.0).abs() < 1e-9);
        assert_eq!(state.current_label(), Some("sad"));
        assert_eq!(state.started_at(), Some(t(2)));
    }

    #[test]
    fn duration_is_clamped_at_zero() {
        let transition = Transition {
            from: "happy".into(),
            to: "sad".into(),
            started_at: t(5),
            at: t(1),
        };
        assert_eq!(transition.duration_secs(), 0.0);
    }
}
