//! End-of-session distribution report.

pub mod chart;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode chart: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to encode summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Files written for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportArtifact {
    pub chart: PathBuf,
    pub summary: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSlice {
    pub emotion: String,
    pub frames: u64,
    pub percent: f64,
    /// Fill of this slice and its legend swatch, `#rrggbb`.
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub generated_at: String,
    pub total_frames: u64,
    /// Largest share first; slice order in the chart and legend.
    pub slices: Vec<ReportSlice>,
}

impl ReportSummary {
    pub fn from_tally(tally: &BTreeMap<String, u64>, at: DateTime<Local>) -> Self {
        let total_frames: u64 = tally.values().sum();
        let mut slices: Vec<ReportSlice> = tally
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(emotion, frames)| ReportSlice {
                emotion: emotion.clone(),
                frames: *frames,
                percent: (*frames as f64 / total_frames as f64 * 1000.0).round() / 10.0,
                color: String::new(),
            })
            .collect();
        // Stable sort keeps label order among equal counts.
        slices.sort_by(|a, b| b.frames.cmp(&a.frames));
        for (i, slice) in slices.iter_mut().enumerate() {
            let [r, g, b] = chart::slice_color(i).0;
            slice.color = format!("#{:02x}{:02x}{:02x}", r, g, b);
        }
        Self {
            generated_at: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            total_frames,
            slices,
        }
    }
}

/// Writes the session tally chart into an output directory.
#[derive(Debug, Clone)]
pub struct SessionReporter {
    output_dir: PathBuf,
}

impl SessionReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render `tally` as `emotion_distribution_<timestamp>.png` plus a JSON
    /// summary with the same stem. Writes nothing for an empty tally.
    pub fn write_report(
        &self,
        tally: &BTreeMap<String, u64>,
        at: DateTime<Local>,
    ) -> Result<Option<ReportArtifact>, ReportError> {
        let summary = ReportSummary::from_tally(tally, at);
        if summary.total_frames == 0 {
            info!(target: "report", "No frames classified, skipping session report");
            return Ok(None);
        }

        std::fs::create_dir_all(&self.output_dir).map_err(|source| ReportError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let (chart_path, summary_path) = self.free_paths(at);

        let counts: Vec<u64> = summary.slices.iter().map(|s| s.frames).collect();
        chart::render_pie(&counts).save_with_format(&chart_path, image::ImageFormat::Png)?;

        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&summary_path, json).map_err(|source| ReportError::Io {
            path: summary_path.clone(),
            source,
        })?;

        info!(target: "report", "Emotion distribution chart saved at: {}", chart_path.display());
        Ok(Some(ReportArtifact {
            chart: chart_path,
            summary: summary_path,
        }))
    }

    /// Timestamped chart and summary paths, with a `_N` suffix when a session
    /// ending in the same second already wrote its files.
    fn free_paths(&self, at: DateTime<Local>) -> (PathBuf, PathBuf) {
        let base = format!("emotion_distribution_{}", at.format("%Y-%m-%d_%H-%M-%S"));
        let mut stem = base.clone();
        let mut n = 1;
        loop {
            let chart = self.output_dir.join(format!("{}.png", stem));
            let summary = self.output_dir.join(format!("{}.json", stem));
            if !chart.exists() && !summary.exists() {
                return (chart, summary);
            }
            stem = format!("{}_{}", base, n);
            n += 1;
        }
    }
}
