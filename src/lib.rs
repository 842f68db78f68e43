//! Webcam emotion tracking.
//!
//! A capture loop feeds per-frame classifier scores into an
//! [`EmotionSession`](tracker::EmotionSession), which keeps a rolling
//! five-second view and detects changes of dominant emotion. Each change is
//! appended to a transition log by [`TransitionLogger`](journal::TransitionLogger);
//! at shutdown the session's tally is rendered as a chart. The read side
//! ([`journal::LogQuery`], [`chat_history::ChatHistory`]) summarises the log
//! and the chatbot's conversation history.

pub mod capture;
pub mod chat_history;
pub mod config;
pub mod journal;
pub mod report;
pub mod runner;
pub mod tracker;
