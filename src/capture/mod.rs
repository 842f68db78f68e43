//! Frame sources and emotion classifiers.
//!
//! Both are external collaborators. The capture loop only needs the two
//! traits below; `replay` provides a file-backed implementation.

pub mod replay;

use crate::tracker::FaceDetection;
use chrono::{DateTime, Local};
use thiserror::Error;

pub use replay::{ReplayClassifier, ReplayFrames, ReplayScript};

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Camera missing or closed. Fatal.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    /// Classifier failed outright. Fatal.
    #[error("classifier failed: {0}")]
    Classifier(String),
    /// A single frame could not be read. The loop skips it.
    #[error("frame dropped: {0}")]
    FrameDropped(String),
}

impl CaptureError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CaptureError::FrameDropped(_))
    }
}

/// One captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub captured_at: DateTime<Local>,
    /// Pixel data, when the source has any. Replayed frames carry none.
    pub image: Option<image::RgbImage>,
}

pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Release the underlying device. Called exactly once on shutdown.
    fn release(&mut self);
}

pub trait EmotionClassifier {
    /// Zero or one face found in `frame`.
    fn classify(&mut self, frame: &Frame) -> Result<Option<FaceDetection>, CaptureError>;
}
