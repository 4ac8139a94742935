//! Mode dispatch and the smart → interval → minimal retry ladder.
//!
//! Mirrors `extract_keyframes_with_fallback` / `extract_keyframes` from the
//! original implementation: a scoped performance timer wraps every call and
//! logs on all exit paths, matching the `_monitor_performance` decorator.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::error::{ExtractError, Result};
use crate::fallback::{extract_interval, extract_minimal, extract_uniform};
use crate::progress::{LoggingSink, ProgressEvent, ProgressSink};
use crate::smart::SmartExtractor;
use crate::types::PathOut;
use crate::video::{FfmpegFrameReader, FrameReader};
use crate::writer::{ImageWriter, JpegImageWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Smart,
    Uniform,
    Interval,
}

pub struct ExtractParams<'a> {
    pub video_path: &'a Path,
    pub output_dir: &'a Path,
    pub max_frames: u32,
    pub mode: Mode,
    pub time_interval: Option<f64>,
    pub debug: bool,
}

/// RAII guard logging elapsed time and frame count on drop, the idiomatic
/// analogue of the original's function-decorator performance monitor.
struct PerfTimer<'a> {
    video_path: &'a Path,
    started: Instant,
    frame_count: usize,
    failed: bool,
}

impl<'a> PerfTimer<'a> {
    fn new(video_path: &'a Path) -> Self {
        PerfTimer { video_path, started: Instant::now(), frame_count: 0, failed: false }
    }
}

impl Drop for PerfTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        if self.failed {
            log::error!(
                "keyframe extraction failed: {} (elapsed {:.2}s)",
                self.video_path.display(),
                elapsed
            );
        } else {
            log::info!(
                "keyframe extraction succeeded: {}, elapsed {:.2}s, extracted {}",
                self.video_path.display(),
                elapsed,
                self.frame_count
            );
        }
    }
}

#[derive(Debug, Serialize)]
struct DebugVideoInfo {
    fps: f64,
    total_frames: u64,
    width: u32,
    height: u32,
    duration: f64,
}

#[derive(Debug, Serialize)]
struct DebugExtractionParams {
    mode: String,
    max_frames: u32,
    change_threshold: f64,
    quality_threshold: f64,
}

#[derive(Debug, Serialize)]
struct DebugPerformance {
    processing_time: f64,
    total_keyframes: usize,
}

#[derive(Debug, Serialize)]
struct DebugInfo {
    video_info: Option<DebugVideoInfo>,
    extraction_params: DebugExtractionParams,
    performance: DebugPerformance,
    error: Option<String>,
}

/// Runs the requested mode directly (no retry ladder) and returns the
/// committed keyframes. `uniform` and `interval`, when requested directly,
/// are never retried — only `smart` is wrapped by the ladder, via
/// `extract_with_fallback`.
pub fn extract(params: &ExtractParams) -> Result<Vec<PathOut>> {
    validate_input(params.video_path)?;
    fs::create_dir_all(params.output_dir)
        .map_err(|e| ExtractError::FatalExtractionFailure(format!("cannot create output dir: {e}")))?;

    let mut timer = PerfTimer::new(params.video_path);
    let mut sink = LoggingSink;
    let result = run_mode(params.mode, params, &mut sink);

    match &result {
        Ok(saved) => timer.frame_count = saved.len(),
        Err(_) => timer.failed = true,
    }

    if params.debug {
        write_debug_artifact(params, &result);
    }

    result
}

/// Smart → interval → minimal retry ladder. Only entered when the caller
/// explicitly asks for `Mode::Smart`; `uniform`/`interval` requested
/// directly bypass this ladder entirely.
pub fn extract_with_fallback(params: &ExtractParams) -> Result<Vec<PathOut>> {
    validate_input(params.video_path)?;
    fs::create_dir_all(params.output_dir)
        .map_err(|e| ExtractError::FatalExtractionFailure(format!("cannot create output dir: {e}")))?;

    let mut timer = PerfTimer::new(params.video_path);
    let mut sink = LoggingSink;

    let smart_result = run_mode(Mode::Smart, params, &mut sink);
    let result = match smart_result {
        Ok(saved) => Ok(saved),
        Err(e) => {
            log::warn!("smart extraction failed ({e}), retrying with interval mode");
            match run_mode(Mode::Interval, params, &mut sink) {
                Ok(saved) => Ok(saved),
                Err(e2) => {
                    log::error!("interval extraction also failed ({e2}), using minimal extraction");
                    Ok(run_minimal(params))
                }
            }
        }
    };

    match &result {
        Ok(saved) => timer.frame_count = saved.len(),
        Err(_) => timer.failed = true,
    }

    if params.debug {
        write_debug_artifact(params, &result);
    }

    result
}

fn validate_input(video_path: &Path) -> Result<()> {
    if !video_path.is_file() {
        return Err(ExtractError::InputInvalid(PathBuf::from(video_path)));
    }
    Ok(())
}

fn run_mode(mode: Mode, params: &ExtractParams, sink: &mut dyn ProgressSink) -> Result<Vec<PathOut>> {
    let mut reader = FfmpegFrameReader::open(params.video_path)?;
    let writer = JpegImageWriter;
    let meta = reader.meta();

    sink.on_event(ProgressEvent::Log(format!(
        "video analysis: total_frames={}, fps={:.2}, duration={:.2}s",
        meta.total_frames, meta.fps, meta.duration_s
    )));

    let saved = match mode {
        Mode::Smart => {
            let extractor = SmartExtractor::new(ScoringConfig::default());
            extractor.extract(&mut reader, &writer, params.output_dir, params.max_frames, sink)?
        }
        Mode::Uniform => extract_uniform(&mut reader, &writer, params.output_dir, params.max_frames),
        Mode::Interval => {
            extract_interval(&mut reader, &writer, params.output_dir, params.max_frames, params.time_interval)
        }
    };

    Ok(saved)
}

fn run_minimal(params: &ExtractParams) -> Vec<PathOut> {
    match FfmpegFrameReader::open(params.video_path) {
        Ok(mut reader) => {
            let writer = JpegImageWriter;
            extract_minimal(&mut reader, &writer, params.output_dir, params.max_frames)
        }
        Err(e) => {
            log::error!("minimal extraction failed to open video: {e}");
            Vec::new()
        }
    }
}

fn write_debug_artifact(params: &ExtractParams, result: &Result<Vec<PathOut>>) {
    let started = Instant::now();
    let video_info = FfmpegFrameReader::open(params.video_path).ok().map(|r| {
        let m = r.meta();
        DebugVideoInfo { fps: m.fps, total_frames: m.total_frames, width: m.width, height: m.height, duration: m.duration_s }
    });

    let (total_keyframes, error) = match result {
        Ok(saved) => (saved.len(), None),
        Err(e) => (0, Some(e.to_string())),
    };

    let cfg = ScoringConfig::default();
    let debug = DebugInfo {
        video_info,
        extraction_params: DebugExtractionParams {
            mode: format!("{:?}", params.mode),
            max_frames: params.max_frames,
            change_threshold: cfg.scene_change_threshold,
            quality_threshold: cfg.quality_threshold,
        },
        performance: DebugPerformance {
            processing_time: started.elapsed().as_secs_f64(),
            total_keyframes,
        },
        error,
    };

    let unix_ts = crate::time::unix_timestamp();
    let path = params.output_dir.join(format!("debug_keyframes_{unix_ts}.json"));
    match serde_json::to_string_pretty(&debug) {
        Ok(text) => {
            if let Err(e) = fs::write(&path, text) {
                log::warn!("could not write debug artifact {}: {e}", path.display());
            }
        }
        Err(e) => log::warn!("could not serialize debug artifact: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_rejects_missing_input_path() {
        let dir = tempfile::tempdir().unwrap();
        let params = ExtractParams {
            video_path: Path::new("/nonexistent/does-not-exist.mp4"),
            output_dir: dir.path(),
            max_frames: 10,
            mode: Mode::Smart,
            time_interval: None,
            debug: false,
        };
        let err = extract(&params).unwrap_err();
        assert!(matches!(err, ExtractError::InputInvalid(_)));
    }

    #[test]
    fn extract_with_fallback_rejects_missing_input_path() {
        let dir = tempfile::tempdir().unwrap();
        let params = ExtractParams {
            video_path: Path::new("/nonexistent/does-not-exist.mp4"),
            output_dir: dir.path(),
            max_frames: 10,
            mode: Mode::Smart,
            time_interval: None,
            debug: false,
        };
        let err = extract_with_fallback(&params).unwrap_err();
        assert!(matches!(err, ExtractError::InputInvalid(_)));
    }
}
