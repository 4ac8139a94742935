//! Smart Extractor: the content-driven streaming pipeline.
//!
//! Owns `ExtractionState` for the duration of one call. All mutation is
//! serial; the only concurrency is the rayon fan-out inside
//! `scoring::scene_change_score` for a single frame pair, which does not
//! change commit order or output.

use std::collections::HashSet;
use std::path::Path;

use crate::config::{ScoringConfig, SIMILARITY_COMMIT_THRESHOLD};
use crate::error::ExtractError;
use crate::frame::Frame;
use crate::image_ops::{resized_dimensions, to_gray};
use crate::progress::{CommitProgress, ProgressEvent, ProgressSink};
use crate::scoring::{comprehensive_score, frames_similar, is_dark};
use crate::types::PathOut;
use crate::video::FrameReader;
use crate::writer::ImageWriter;

/// The best-of-second buffer.
struct Candidate {
    frame: Frame,
    timestamp: f64,
    total_score: f64,
    quality: f64,
    change: f64,
}

struct ExtractionState {
    last_saved_frame: Option<Frame>,
    adaptive_step: f64,
    active_second: Option<i64>,
    best: Option<Candidate>,
    saved: Vec<PathOut>,
    used_names: HashSet<String>,
    skipped_dark: u64,
    skipped_similar: u64,
}

impl ExtractionState {
    fn new(cfg: &ScoringConfig) -> Self {
        ExtractionState {
            last_saved_frame: None,
            adaptive_step: cfg.min_interval,
            active_second: None,
            best: None,
            saved: Vec::new(),
            used_names: HashSet::new(),
            skipped_dark: 0,
            skipped_similar: 0,
        }
    }
}

pub struct SmartExtractor {
    cfg: ScoringConfig,
}

impl SmartExtractor {
    pub fn new(cfg: ScoringConfig) -> Self {
        SmartExtractor { cfg }
    }

    pub fn extract(
        &self,
        reader: &mut dyn FrameReader,
        writer: &dyn ImageWriter,
        output_dir: &Path,
        max_frames: u32,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<PathOut>, ExtractError> {
        let meta = reader.meta();
        let mut state = ExtractionState::new(&self.cfg);

        sink.on_event(ProgressEvent::Log(format!(
            "content-driven extraction: total_frames={}, fps={:.2}, duration={:.2}s, max_frames={}",
            meta.total_frames, meta.fps, meta.duration_s, max_frames
        )));

        let mut current_time = 0.0f64;
        let mut last_report_time = 0.0f64;

        while current_time < meta.duration_s && (state.saved.len() as u32) < max_frames {
            if current_time - last_report_time >= 10.0 {
                last_report_time = current_time;
                let progress_pct =
                    if meta.duration_s > 0.0 { (current_time / meta.duration_s) * 100.0 } else { 0.0 };
                sink.on_event(ProgressEvent::Log(format!(
                    "progress {:.1}% | saved {} | t={:.1}s",
                    progress_pct,
                    state.saved.len(),
                    current_time
                )));
            }

            let cur_sec = current_time.floor() as i64;
            match state.active_second {
                None => state.active_second = Some(cur_sec),
                Some(active) if active != cur_sec => {
                    if (state.saved.len() as u32) < max_frames {
                        self.commit(&mut state, output_dir, writer, &meta, sink, max_frames);
                    }
                    state.active_second = Some(cur_sec);
                }
                _ => {}
            }

            let frame_idx = (current_time * meta.fps).floor() as u64;
            let frame = match reader.read_at(frame_idx) {
                Some(f) => f,
                None => {
                    current_time += state.adaptive_step;
                    continue;
                }
            };

            if is_dark(&frame, crate::config::DARK_THRESHOLD) {
                state.skipped_dark += 1;
                if state.skipped_dark % 10 == 1 {
                    sink.on_event(ProgressEvent::Log(format!(
                        "skipping dark frame at t={current_time:.2}s"
                    )));
                }
                current_time += state.adaptive_step;
                continue;
            }

            let (total, quality, change) =
                comprehensive_score(&frame, state.last_saved_frame.as_ref(), &self.cfg);

            let replace = match &state.best {
                None => true,
                Some(best) => total > best.total_score,
            };
            if replace {
                state.best =
                    Some(Candidate { frame: frame.clone(), timestamp: current_time, total_score: total, quality, change });
            }

            state.adaptive_step = if change > self.cfg.scene_change_threshold {
                self.cfg.min_interval
            } else {
                (state.adaptive_step * 1.2).min(self.cfg.max_interval)
            };

            current_time += state.adaptive_step;
        }

        if (state.saved.len() as u32) < max_frames {
            self.commit(&mut state, output_dir, writer, &meta, sink, max_frames);
        }

        sink.on_event(ProgressEvent::Log(format!(
            "content-driven extraction complete: saved={}, skipped_dark={}, skipped_similar={}",
            state.saved.len(),
            state.skipped_dark,
            state.skipped_similar
        )));

        Ok(state.saved)
    }

    /// Writes out the held `best` candidate, subject to the commit-time
    /// similarity filter, and resets the per-second buffer.
    fn commit(
        &self,
        state: &mut ExtractionState,
        output_dir: &Path,
        writer: &dyn ImageWriter,
        meta: &crate::frame::VideoMeta,
        sink: &mut dyn ProgressSink,
        max_frames: u32,
    ) {
        let Some(best) = state.best.take() else { return };

        if let Some(last) = &state.last_saved_frame {
            let last_gray = to_gray(last);
            let best_gray = to_gray(&best.frame);
            if frames_similar(&last_gray, &best_gray, SIMILARITY_COMMIT_THRESHOLD) {
                state.skipped_similar += 1;
                return;
            }
        }

        let filename = allocate_filename(state.saved.len(), best.timestamp, &mut state.used_names);
        let path = output_dir.join(&filename);

        let file_size = match writer.write_jpeg(&path, &best.frame) {
            Ok(size) => size,
            Err(e) => {
                log::warn!("dropping commit at t={:.2}s: {e}", best.timestamp);
                return;
            }
        };

        let (out_w, out_h) = resized_dimensions(&best.frame, crate::config::RESIZE_TARGET_HEIGHT);
        let path_out = PathOut {
            path: path.to_string_lossy().into_owned(),
            timestamp: best.timestamp,
            width: out_w,
            height: out_h,
            file_size_bytes: file_size,
        };

        sink.on_event(ProgressEvent::Commit(CommitProgress {
            coverage: if meta.duration_s > 0.0 { (best.timestamp / meta.duration_s).min(1.0) } else { 0.0 },
            elapsed_seconds: best.timestamp,
            duration_seconds: meta.duration_s,
            saved_frames: state.saved.len() as u32 + 1,
            max_frames,
            new_frame_path: path_out.path.clone(),
            new_frame_timestamp: best.timestamp,
            change_score: best.change,
            quality_score: best.quality,
            width: path_out.width,
            height: path_out.height,
            file_size: path_out.file_size_bytes,
        }));
        sink.on_event(ProgressEvent::Log(format!(
            "saved keyframe: {} | score={:.1} | quality={:.1}",
            path_out.path, best.total_score, best.quality
        )));

        state.saved.push(path_out);
        state.last_saved_frame = Some(best.frame);

        state.adaptive_step = if best.change > self.cfg.scene_change_threshold {
            self.cfg.min_interval
        } else {
            (state.adaptive_step * 1.5).min(self.cfg.max_interval)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::{checkerboard, solid};
    use crate::frame::VideoMeta;
    use crate::progress::RecordingSink;

    /// One second of darkness, then four seconds alternating between two
    /// distinct bright checkerboard phases, at a coarse 2 fps so tests run
    /// fast. `fps=2` keeps `frame_idx` math exact for whole-second steps.
    struct ScriptedReader {
        meta: VideoMeta,
    }

    impl FrameReader for ScriptedReader {
        fn meta(&self) -> VideoMeta {
            self.meta
        }

        fn read_at(&mut self, frame_index: u64) -> Option<Frame> {
            if frame_index as f64 >= self.meta.total_frames as f64 {
                return None;
            }
            let second = frame_index / 2;
            if second == 0 {
                Some(solid(16, 16, (0, 0, 0), frame_index, self.meta.fps))
            } else if second % 2 == 1 {
                Some(checkerboard(16, 16, frame_index, self.meta.fps))
            } else {
                Some(solid(16, 16, (220, 220, 220), frame_index, self.meta.fps))
            }
        }
    }

    struct NullWriter;
    impl ImageWriter for NullWriter {
        fn write_jpeg(&self, _path: &Path, _frame: &Frame) -> Result<u64, ExtractError> {
            Ok(7)
        }
    }

    struct AllDark;
    impl FrameReader for AllDark {
        fn meta(&self) -> VideoMeta {
            VideoMeta::new(2, 2.0, 16, 16)
        }
        fn read_at(&mut self, frame_index: u64) -> Option<Frame> {
            if frame_index >= 2 {
                None
            } else {
                Some(crate::frame::test_support::solid(16, 16, (0, 0, 0), frame_index, 2.0))
            }
        }
    }

    #[test]
    fn skips_all_frames_in_solid_black_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = AllDark;
        let writer = NullWriter;
        let mut sink = RecordingSink::default();
        let extractor = SmartExtractor::new(ScoringConfig::default());
        let saved = extractor.extract(&mut reader, &writer, dir.path(), 10, &mut sink).unwrap();
        assert!(saved.is_empty());
    }

    #[test]
    fn commits_at_most_one_frame_per_second() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = ScriptedReader { meta: VideoMeta::new(10, 2.0, 16, 16) };
        let writer = NullWriter;
        let mut sink = RecordingSink::default();
        let extractor = SmartExtractor::new(ScoringConfig::default());
        let saved = extractor.extract(&mut reader, &writer, dir.path(), 10, &mut sink).unwrap();

        let mut seconds_seen = HashSet::new();
        for out in &saved {
            let sec = out.timestamp.floor() as i64;
            assert!(seconds_seen.insert(sec), "duplicate commit within second {sec}");
        }
    }

    #[test]
    fn respects_max_frames_bound() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = ScriptedReader { meta: VideoMeta::new(10, 2.0, 16, 16) };
        let writer = NullWriter;
        let mut sink = RecordingSink::default();
        let extractor = SmartExtractor::new(ScoringConfig::default());
        let saved = extractor.extract(&mut reader, &writer, dir.path(), 2, &mut sink).unwrap();
        assert!(saved.len() <= 2);
    }

    #[test]
    fn allocate_filename_disambiguates_collisions() {
        let mut used = HashSet::new();
        let a = allocate_filename(0, 1.0, &mut used);
        let b = allocate_filename(0, 1.0, &mut used);
        assert_ne!(a, b);
        assert!(b.ends_with("_v1.jpg"));
    }
}

fn allocate_filename(ordinal: usize, timestamp: f64, used: &mut HashSet<String>) -> String {
    let base = format!("keyframe_{ordinal:03}_{timestamp:.2}s.jpg");
    if !used.contains(&base) {
        used.insert(base.clone());
        return base;
    }
    let stem = base.trim_end_matches(".jpg");
    let mut counter = 1u32;
    loop {
        let candidate = format!("{stem}_v{counter}.jpg");
        if !used.contains(&candidate) {
            used.insert(candidate.clone());
            return candidate;
        }
        counter += 1;
    }
}
