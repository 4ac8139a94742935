//! Deterministic fallback modes: uniform stride, fixed time interval, and
//! the last-resort fixed-anchor selector. These exist as a retry ladder
//! under the smart extractor and as standalone comparison baselines.

use std::path::Path;

use crate::frame::VideoMeta;
use crate::image_ops::resized_dimensions;
use crate::types::PathOut;
use crate::video::FrameReader;
use crate::writer::ImageWriter;

/// `interval = max(1, total_frames / max_frames)`; reads index `i * interval`
/// for `i` in `[0, max_frames)`, stopping at EOF.
pub fn extract_uniform(
    reader: &mut dyn FrameReader,
    writer: &dyn ImageWriter,
    output_dir: &Path,
    max_frames: u32,
) -> Vec<PathOut> {
    let meta = reader.meta();
    if max_frames == 0 || meta.total_frames == 0 {
        return Vec::new();
    }
    let interval = (meta.total_frames / max_frames as u64).max(1);

    let mut saved = Vec::new();
    for i in 0..max_frames {
        let frame_idx = i as u64 * interval;
        if frame_idx >= meta.total_frames {
            break;
        }
        let Some(frame) = reader.read_at(frame_idx) else { break };
        if let Some(out) = write_numbered(writer, output_dir, saved.len(), &frame, &meta) {
            saved.push(out);
        }
    }
    saved
}

/// Computes `interval_frames` per §4.4 and reads every `interval_frames`-th
/// frame starting at 0 until `max_frames` or EOF.
pub fn extract_interval(
    reader: &mut dyn FrameReader,
    writer: &dyn ImageWriter,
    output_dir: &Path,
    max_frames: u32,
    time_interval: Option<f64>,
) -> Vec<PathOut> {
    let meta = reader.meta();
    if max_frames == 0 {
        return Vec::new();
    }

    let seconds_interval = if meta.duration_s > 300.0 {
        let computed = meta.duration_s / 300.0;
        time_interval.map(|t| t.max(computed)).unwrap_or(computed)
    } else {
        time_interval.unwrap_or_else(|| {
            if max_frames > 0 {
                meta.duration_s / max_frames as f64
            } else {
                1.0
            }
        })
    };

    let interval_frames = if meta.fps > 0.0 {
        ((seconds_interval * meta.fps).round() as u64).max(1)
    } else if max_frames > 0 {
        (meta.total_frames / max_frames as u64).max(1)
    } else {
        1
    };

    let mut saved = Vec::new();
    let mut frame_idx = 0u64;
    while saved.len() < max_frames as usize {
        let Some(frame) = reader.read_at(frame_idx) else { break };
        if let Some(out) = write_numbered(writer, output_dir, saved.len(), &frame, &meta) {
            saved.push(out);
        }
        frame_idx += interval_frames;
    }
    saved
}

/// Last-resort anchor selection: first, last, middle, then evenly spaced
/// fill frames. Never touches the Frame Reader's decode path beyond plain
/// sequential reads, so it is the least likely mode to fail.
pub fn minimal_anchor_indices(total_frames: u64, max_frames: u32) -> Vec<u64> {
    let mut indices = Vec::new();
    if max_frames == 0 || total_frames == 0 {
        return indices;
    }
    if max_frames >= 1 {
        indices.push(0);
    }
    if max_frames >= 2 {
        indices.push(total_frames.saturating_sub(1));
    }
    if max_frames >= 3 {
        indices.push(total_frames / 2);
    }
    if max_frames > 3 {
        let interval = (total_frames / max_frames as u64).max(1);
        for i in 1..=(max_frames - 2) {
            let idx = i as u64 * interval;
            if idx < total_frames {
                indices.push(idx);
            }
        }
    }
    indices.sort_unstable();
    indices.dedup();
    indices.truncate(max_frames as usize);
    indices
}

pub fn extract_minimal(
    reader: &mut dyn FrameReader,
    writer: &dyn ImageWriter,
    output_dir: &Path,
    max_frames: u32,
) -> Vec<PathOut> {
    let meta = reader.meta();
    let indices = minimal_anchor_indices(meta.total_frames, max_frames);

    let mut saved = Vec::new();
    for idx in indices {
        let Some(frame) = reader.read_at(idx) else { continue };
        if let Some(out) = write_numbered(writer, output_dir, saved.len(), &frame, &meta) {
            saved.push(out);
        }
    }
    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    struct FixedFrameReader {
        meta: VideoMeta,
    }

    impl FrameReader for FixedFrameReader {
        fn meta(&self) -> VideoMeta {
            self.meta
        }

        fn read_at(&mut self, frame_index: u64) -> Option<Frame> {
            if frame_index >= self.meta.total_frames {
                return None;
            }
            Some(Frame::new(vec![10, 20, 30], 1, 1, frame_index, self.meta.fps))
        }
    }

    struct NullWriter;
    impl ImageWriter for NullWriter {
        fn write_jpeg(&self, _path: &Path, _frame: &Frame) -> Result<u64, crate::error::ExtractError> {
            Ok(42)
        }
    }

    #[test]
    fn minimal_anchor_indices_matches_spec_example() {
        let idx = minimal_anchor_indices(100, 5);
        assert_eq!(idx, vec![0, 20, 40, 50, 99]);
    }

    #[test]
    fn minimal_anchor_indices_empty_when_no_frames() {
        assert!(minimal_anchor_indices(0, 5).is_empty());
        assert!(minimal_anchor_indices(10, 0).is_empty());
    }

    #[test]
    fn extract_uniform_picks_evenly_spaced_indices() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = FixedFrameReader { meta: VideoMeta::new(180, 30.0, 1, 1) };
        let writer = NullWriter;
        let saved = extract_uniform(&mut reader, &writer, dir.path(), 6);
        assert_eq!(saved.len(), 6);
    }

    #[test]
    fn extract_uniform_returns_empty_for_zero_max_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = FixedFrameReader { meta: VideoMeta::new(180, 30.0, 1, 1) };
        let writer = NullWriter;
        let saved = extract_uniform(&mut reader, &writer, dir.path(), 0);
        assert!(saved.is_empty());
    }

    #[test]
    fn extract_minimal_respects_max_frames_bound() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = FixedFrameReader { meta: VideoMeta::new(100, 30.0, 1, 1) };
        let writer = NullWriter;
        let saved = extract_minimal(&mut reader, &writer, dir.path(), 5);
        assert_eq!(saved.len(), 5);
    }

    #[test]
    fn extract_interval_splits_long_video_by_300_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = FixedFrameReader { meta: VideoMeta::new(400 * 30, 30.0, 1, 1) };
        let writer = NullWriter;
        let saved = extract_interval(&mut reader, &writer, dir.path(), 200, None);
        assert!(saved.len() <= 200);
        assert!(!saved.is_empty());
    }
}

fn write_numbered(
    writer: &dyn ImageWriter,
    output_dir: &Path,
    ordinal: usize,
    frame: &crate::frame::Frame,
    _meta: &VideoMeta,
) -> Option<PathOut> {
    let timestamp = frame.timestamp_seconds();
    let filename = format!("keyframe_{ordinal:03}_{timestamp:.2}s.jpg");
    let path = output_dir.join(&filename);
    let (out_w, out_h) = resized_dimensions(frame, crate::config::RESIZE_TARGET_HEIGHT);
    match writer.write_jpeg(&path, frame) {
        Ok(file_size) => Some(PathOut {
            path: path.to_string_lossy().into_owned(),
            timestamp,
            width: out_w,
            height: out_h,
            file_size_bytes: file_size,
        }),
        Err(e) => {
            log::warn!("dropping frame at t={timestamp:.2}s: {e}");
            None
        }
    }
}
