//! Sampling and aggregation of per-frame emotion scores.

pub mod history;
pub mod scores;
pub mod session;
pub mod state;

pub use history::{AggregatedDistribution, HistoryWindow, Sample};
pub use scores::{EmotionScores, FaceDetection, STANDARD_LABELS};
pub use session::{EmotionSession, IngestOutcome, SessionSummary};
pub use state::{TrackerState, Transition};
