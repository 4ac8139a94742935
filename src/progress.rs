//! Progress reporting: a tagged-variant event type (never a free-form map)
//! delivered synchronously to an optional sink during extraction.

use serde::Serialize;

/// Fields reported alongside every committed keyframe.
#[derive(Debug, Clone, Serialize)]
pub struct CommitProgress {
    pub coverage: f64,
    pub elapsed_seconds: f64,
    pub duration_seconds: f64,
    pub saved_frames: u32,
    pub max_frames: u32,
    pub new_frame_path: String,
    pub new_frame_timestamp: f64,
    pub change_score: f64,
    pub quality_score: f64,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
}

/// Either a free-form milestone message, or a structured per-commit report.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Log(String),
    Commit(CommitProgress),
}

/// Consumes `ProgressEvent`s emitted synchronously during one extraction
/// call. Implementors must not block indefinitely — the extractor calls
/// this inline on its hot path.
pub trait ProgressSink {
    fn on_event(&mut self, event: ProgressEvent);
}

/// Forwards `Log` events to the `log` crate at `info` level and ignores
/// `Commit` events. The default sink used when a caller supplies none.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl ProgressSink for LoggingSink {
    fn on_event(&mut self, event: ProgressEvent) {
        if let ProgressEvent::Log(message) = event {
            log::info!("{message}");
        }
    }
}

/// A sink that records every event in order, for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<ProgressEvent>,
}

impl ProgressSink for RecordingSink {
    fn on_event(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}
