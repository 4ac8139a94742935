//! Frame Reader: opens a video and decodes frames by index.
//!
//! Generalizes the timestamp-seek, RGB24-output decode path this codebase
//! already used for single-frame previews into a reusable, repeatedly
//! seekable reader that decodes BGR24 (the channel order every scoring
//! kernel in this crate assumes).

use std::path::{Path, PathBuf};

use ffmpeg_the_third as ffmpeg;
use ffmpeg_the_third::software::scaling::{context::Context as SwsCtx, flag::Flags};
use ffmpeg_the_third::{
    codec::context::Context as CodecCtx, format::Pixel, frame::Video as VideoFrame, media::Type,
};

use crate::error::ExtractError;
use crate::frame::{Frame, VideoMeta};

/// What the extractors need from an opened video. A trait so tests can
/// substitute a synthetic in-memory reader without linking ffmpeg.
pub trait FrameReader {
    fn meta(&self) -> VideoMeta;
    /// Seek-then-decode the frame nearest `frame_index`. `None` denotes EOF
    /// or an unreadable index; never panics on out-of-range input.
    fn read_at(&mut self, frame_index: u64) -> Option<Frame>;
}

/// ffmpeg-the-third-backed implementation.
pub struct FfmpegFrameReader {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: SwsCtx,
    meta: VideoMeta,
}

impl FfmpegFrameReader {
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        ffmpeg::init().map_err(|e| open_err(path, e.into()))?;

        let input = ffmpeg::format::input(&path).map_err(|e| open_err(path, e.into()))?;

        let (stream_index, decoder) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or_else(|| open_err(path, anyhow::anyhow!("no video stream found")))?;
            let idx = stream.index();
            let ctx = CodecCtx::from_parameters(stream.parameters())
                .map_err(|e| open_err(path, e.into()))?;
            let dec = ctx.decoder().video().map_err(|e| open_err(path, e.into()))?;
            (idx, dec)
        };

        let width = decoder.width();
        let height = decoder.height();

        let fps = {
            let stream = input.streams().best(Type::Video).expect("stream present");
            let r = stream.avg_frame_rate();
            if r.1 != 0 && r.0 > 0 {
                r.0 as f64 / r.1 as f64
            } else {
                log::warn!("could not read fps from '{}', defaulting to 30", path.display());
                30.0
            }
        };

        let nb_frames = {
            let stream = input.streams().best(Type::Video).expect("stream present");
            stream.frames()
        };
        let duration_hint = input.duration().max(0) as f64 / 1_000_000.0;
        let total_frames = if nb_frames > 0 {
            nb_frames as u64
        } else {
            (duration_hint * fps).round() as u64
        };

        let scaler = SwsCtx::get(decoder.format(), width, height, Pixel::BGR24, width, height, Flags::BILINEAR)
            .map_err(|e| open_err(path, e.into()))?;

        let meta = VideoMeta::new(total_frames, fps, width, height);

        Ok(FfmpegFrameReader { input, stream_index, decoder, scaler, meta })
    }
}

impl FrameReader for FfmpegFrameReader {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn read_at(&mut self, frame_index: u64) -> Option<Frame> {
        let timestamp = if self.meta.fps > 0.0 { frame_index as f64 / self.meta.fps } else { 0.0 };
        let seek_ts = (timestamp.max(0.0) * 1_000_000.0) as i64;

        let stream_index = self.stream_index;
        let input = &mut self.input;
        let decoder = &mut self.decoder;
        let scaler = &mut self.scaler;

        if input.seek(seek_ts, ..seek_ts).is_err() {
            return None;
        }
        decoder.flush();

        let mut bgr_frame = VideoFrame::empty();
        let mut found = false;

        'outer: for (stream, packet) in input.packets().filter_map(|r| r.ok()) {
            if stream.index() != stream_index {
                continue;
            }
            if decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = VideoFrame::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {
                if scaler.run(&decoded, &mut bgr_frame).is_err() {
                    continue;
                }
                found = true;
                break 'outer;
            }
        }

        if !found {
            return None;
        }

        let width = self.decoder.width();
        let height = self.decoder.height();
        let stride = bgr_frame.stride(0);
        let row_bytes = width as usize * 3;
        let data = bgr_frame.data(0);

        let bytes = if stride == row_bytes {
            let expected = row_bytes * height as usize;
            if data.len() < expected {
                return None;
            }
            data[..expected].to_vec()
        } else {
            let mut flat = Vec::with_capacity(row_bytes * height as usize);
            for row in 0..height as usize {
                let start = row * stride;
                let end = start + row_bytes;
                if end > data.len() {
                    return None;
                }
                flat.extend_from_slice(&data[start..end]);
            }
            flat
        };

        Some(Frame::new(bytes, width, height, frame_index, self.meta.fps))
    }
}

fn open_err(path: &Path, source: anyhow::Error) -> ExtractError {
    ExtractError::VideoOpenFailed { path: PathBuf::from(path), source }
}
