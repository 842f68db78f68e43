//! Replays pre-recorded detections as if they came from a camera.
//!
//! Script format, one JSON object per line:
//!
//! ```text
//! {"offset_ms": 0, "scores": {"happy": 0.9, "sad": 0.1}}
//! {"offset_ms": 100}
//! {"offset_ms": 200, "event": "drop"}
//! ```
//!
//! `offset_ms` is relative to the replay start. A line without `scores` is a
//! frame with no face. `event` injects a dropped frame (`drop`), a classifier
//! failure (`classifier_error`) or a lost device (`device_lost`).

use super::{CaptureError, EmotionClassifier, Frame, FrameSource};
use crate::tracker::{EmotionScores, FaceDetection};
use chrono::{DateTime, Local, TimeDelta};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEvent {
    Drop,
    ClassifierError,
    DeviceLost,
}

#[derive(Debug, Clone, Deserialize)]
struct ReplayEntry {
    #[serde(default)]
    offset_ms: i64,
    #[serde(default)]
    scores: Option<EmotionScores>,
    #[serde(default)]
    event: Option<ReplayEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayScript {
    entries: Vec<ReplayEntry>,
}

impl ReplayScript {
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CaptureError::DeviceUnavailable(format!("cannot open replay {}: {}", path.display(), e))
        })?;
        let script = Self::parse(&content)?;
        info!(target: "capture", "Loaded {} replay frames from {}", script.len(), path.display());
        Ok(script)
    }

    pub fn parse(content: &str) -> Result<Self, CaptureError> {
        let mut entries = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: ReplayEntry = serde_json::from_str(line).map_err(|e| {
                CaptureError::DeviceUnavailable(format!("replay line {}: {}", idx + 1, e))
            })?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split into a frame source and a matching classifier, with frame
    /// timestamps offset from `start`.
    pub fn into_parts(self, start: DateTime<Local>) -> (ReplayFrames, ReplayClassifier) {
        let frames = ReplayFrames {
            timeline: self
                .entries
                .iter()
                .map(|e| (e.offset_ms, e.event))
                .collect(),
            start,
            cursor: 0,
            released: false,
        };
        let classifier = ReplayClassifier {
            answers: self
                .entries
                .into_iter()
                .map(|e| match e.event {
                    Some(ReplayEvent::ClassifierError) => Err(()),
                    _ => Ok(e.scores.map(FaceDetection::new)),
                })
                .collect(),
        };
        (frames, classifier)
    }
}

#[derive(Debug)]
pub struct ReplayFrames {
    timeline: Vec<(i64, Option<ReplayEvent>)>,
    start: DateTime<Local>,
    cursor: usize,
    released: bool,
}

impl ReplayFrames {
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for ReplayFrames {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.released {
            return Err(CaptureError::DeviceUnavailable("replay already released".to_string()));
        }
        let Some(&(offset_ms, event)) = self.timeline.get(self.cursor) else {
            return Ok(None);
        };
        let index = self.cursor as u64;
        self.cursor += 1;

        match event {
            Some(ReplayEvent::Drop) => Err(CaptureError::FrameDropped(format!("replay frame {}", index))),
            Some(ReplayEvent::DeviceLost) => Err(CaptureError::DeviceUnavailable(format!(
                "device lost at replay frame {}",
                index
            ))),
            _ => Ok(Some(Frame {
                index,
                captured_at: self.start + TimeDelta::milliseconds(offset_ms),
                image: None,
            })),
        }
    }

    fn release(&mut self) {
        self.released = true;
    }
}

#[derive(Debug)]
pub struct ReplayClassifier {
    answers: Vec<Result<Option<FaceDetection>, ()>>,
}

impl EmotionClassifier for ReplayClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<Option<FaceDetection>, CaptureError> {
        match self.answers.get(frame.index as usize) {
            Some(Ok(detection)) => Ok(detection.clone()),
            Some(Err(())) => Err(CaptureError::Classifier(format!(
                "scripted failure at frame {}",
                frame.index
            ))),
            None => Ok(None),
        }
    }
}
