//! Capture loop: capture → classify → ingest → log → overlay, one frame at a
//! time, followed by a shutdown path that always runs.

use crate::capture::{CaptureError, EmotionClassifier, FrameSource};
use crate::journal::{JournalError, TransitionLogger};
use crate::report::{ReportArtifact, ReportError, SessionReporter};
use crate::tracker::{EmotionSession, SessionSummary};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("failed to log transition: {0}")]
    Journal(#[from] JournalError),
    #[error("failed to write session report: {0}")]
    Report(#[from] ReportError),
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The quit flag was raised.
    Quit,
    /// The frame source ran dry.
    EndOfInput,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub stop: StopReason,
    pub summary: SessionSummary,
    pub artifact: Option<ReportArtifact>,
}

/// Run one session until quit, end of input or a fatal error.
///
/// Whatever ends the loop, the source is released and the session report is
/// written before returning. A loop error takes precedence over a report
/// error.
pub fn run_session<S, C>(
    source: &mut S,
    classifier: &mut C,
    mut session: EmotionSession,
    logger: &TransitionLogger,
    reporter: &SessionReporter,
    quit: &AtomicBool,
) -> Result<RunReport, RunError>
where
    S: FrameSource,
    C: EmotionClassifier,
{
    info!(target: "runner", "Session started, logging transitions to {}", logger.path().display());
    let outcome = drive(source, classifier, &mut session, logger, quit);

    source.release();
    let summary = session.finish();
    let report = reporter.write_report(&summary.tally, Local::now());

    info!(
        target: "runner",
        "Session ended: {} frames classified, {} skipped, {} transitions",
        summary.frames_ingested, summary.frames_skipped, summary.transitions
    );

    match (outcome, report) {
        (Ok(stop), Ok(artifact)) => Ok(RunReport {
            stop,
            summary,
            artifact,
        }),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), report) => {
            if let Err(report_err) = report {
                error!(target: "runner", "Session report also failed: {}", report_err);
            }
            Err(e)
        }
    }
}

fn drive<S, C>(
    source: &mut S,
    classifier: &mut C,
    session: &mut EmotionSession,
    logger: &TransitionLogger,
    quit: &AtomicBool,
) -> Result<StopReason, RunError>
where
    S: FrameSource,
    C: EmotionClassifier,
{
    loop {
        if quit.load(Ordering::Relaxed) {
            info!(target: "runner", "Quit requested");
            return Ok(StopReason::Quit);
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(StopReason::EndOfInput),
            Err(e) if e.is_transient() => {
                debug!(target: "runner", "Skipping frame: {}", e);
                session.note_skipped_frame();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let detection = match classifier.classify(&frame) {
            Ok(detection) => detection,
            Err(e) if e.is_transient() => {
                debug!(target: "runner", "Skipping frame {}: {}", frame.index, e);
                session.note_skipped_frame();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = session.ingest(detection.as_ref(), frame.captured_at);

        if let Some(record) = &outcome.transition {
            info!(
                target: "runner",
                "Transition {} -> {} after {:.2}s",
                record.from, record.to, record.duration_secs
            );
            logger.append(record)?;
        }

        if let Some(distribution) = &outcome.distribution {
            debug!(target: "overlay", frame = frame.index, "{}", distribution);
        }
    }
}
