//! Image Writer: resizes a frame to the target output height and encodes
//! it as JPEG.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::config::{JPEG_QUALITY, RESIZE_TARGET_HEIGHT};
use crate::error::ExtractError;
use crate::frame::Frame;
use crate::image_ops::resize_to_height_720;

pub trait ImageWriter {
    /// Resize `frame` to the crate's fixed output height and encode it as
    /// JPEG at the crate's fixed quality, returning the bytes written.
    fn write_jpeg(&self, path: &Path, frame: &Frame) -> Result<u64, ExtractError>;
}

/// Encodes via the `image` crate's JPEG encoder.
#[derive(Debug, Default)]
pub struct JpegImageWriter;

impl ImageWriter for JpegImageWriter {
    fn write_jpeg(&self, path: &Path, frame: &Frame) -> Result<u64, ExtractError> {
        let resized = resize_to_height_720(frame, RESIZE_TARGET_HEIGHT);

        // BGR -> RGB for the `image` crate's encoder, which expects RGB8.
        let mut rgb = Vec::with_capacity(resized.data.len());
        for chunk in resized.data.chunks_exact(3) {
            rgb.push(chunk[2]);
            rgb.push(chunk[1]);
            rgb.push(chunk[0]);
        }

        let file = File::create(path).map_err(|e| write_err(path, e.into()))?;
        let mut writer = BufWriter::new(file);
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        encoder
            .encode(&rgb, resized.width, resized.height, ExtendedColorType::Rgb8)
            .map_err(|e| write_err(path, e.into()))?;
        drop(writer);

        let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Ok(bytes)
    }
}

fn write_err(path: &Path, source: anyhow::Error) -> ExtractError {
    ExtractError::WriteFailure { path: PathBuf::from(path), source }
}
