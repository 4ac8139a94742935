//! Pure pixel-buffer operations shared by the scoring kernels.
//!
//! Everything here is a free function over plain buffers (no `Frame`
//! dependency) so kernels can be unit-tested against synthetic arrays
//! without touching the video decoder.

use image::{GrayImage, Luma, RgbImage};
use imageproc::definitions::Image;
use imageproc::filter::gaussian_blur_f32;

use crate::frame::Frame;

/// BGR → grayscale using the Rec.601 luma coefficients OpenCV's
/// `cv2.cvtColor(..., COLOR_BGR2GRAY)` uses.
pub fn to_gray(frame: &Frame) -> GrayImage {
    let mut out = GrayImage::new(frame.width, frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let (b, g, r) = frame.pixel(x, y);
            let v = 0.114 * b as f32 + 0.587 * g as f32 + 0.299 * r as f32;
            out.put_pixel(x, y, Luma([v.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Convert a `GrayImage` into an f32 pixel buffer for numerically precise
/// intermediate computation (SSIM maps, squared products, etc).
pub fn to_f32(gray: &GrayImage) -> Image<Luma<f32>> {
    let (w, h) = gray.dimensions();
    let mut out: Image<Luma<f32>> = Image::new(w, h);
    for (x, y, p) in gray.enumerate_pixels() {
        out.put_pixel(x, y, Luma([p[0] as f32]));
    }
    out
}

/// Separable 5x5 Gaussian blur (sigma configurable), operating on an f32
/// single-channel buffer. Thin wrapper over `imageproc::filter::gaussian_blur_f32`,
/// which already implements the separable blur generically over float pixels.
pub fn gaussian_blur(img: &Image<Luma<f32>>, sigma: f32) -> Image<Luma<f32>> {
    gaussian_blur_f32(img, sigma)
}

/// Elementwise multiply of two same-size f32 buffers.
pub fn mul(a: &Image<Luma<f32>>, b: &Image<Luma<f32>>) -> Image<Luma<f32>> {
    let (w, h) = a.dimensions();
    let mut out: Image<Luma<f32>> = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            out.put_pixel(x, y, Luma([a.get_pixel(x, y)[0] * b.get_pixel(x, y)[0]]));
        }
    }
    out
}

/// Elementwise a - b.
pub fn sub(a: &Image<Luma<f32>>, b: &Image<Luma<f32>>) -> Image<Luma<f32>> {
    let (w, h) = a.dimensions();
    let mut out: Image<Luma<f32>> = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            out.put_pixel(x, y, Luma([a.get_pixel(x, y)[0] - b.get_pixel(x, y)[0]]));
        }
    }
    out
}

/// Joint 32x32x32 BGR histogram (counts, not normalized), matching
/// `cv2.calcHist([frame], [0,1,2], None, [32,32,32], [0,256]*3)`.
pub fn hist_3d(frame: &Frame) -> Vec<f64> {
    const BINS: usize = 32;
    let mut hist = vec![0.0f64; BINS * BINS * BINS];
    for chunk in frame.data.chunks_exact(3) {
        let b = (chunk[0] as usize * BINS) / 256;
        let g = (chunk[1] as usize * BINS) / 256;
        let r = (chunk[2] as usize * BINS) / 256;
        hist[(b * BINS + g) * BINS + r] += 1.0;
    }
    hist
}

/// 1D histogram over a grayscale buffer with `bins` buckets in `[0, 256)`.
pub fn hist_1d(gray: &GrayImage, bins: usize) -> Vec<f64> {
    let mut hist = vec![0.0f64; bins];
    for p in gray.pixels() {
        let idx = (p[0] as usize * bins) / 256;
        hist[idx.min(bins - 1)] += 1.0;
    }
    hist
}

/// Pearson-correlation histogram comparator, matching
/// `cv2.compareHist(..., cv2.HISTCMP_CORREL)`. Returns `0.0` for a
/// degenerate (zero-variance) histogram rather than propagating NaN.
pub fn hist_correl(h1: &[f64], h2: &[f64]) -> f64 {
    let n = h1.len() as f64;
    let mean1 = h1.iter().sum::<f64>() / n;
    let mean2 = h2.iter().sum::<f64>() / n;

    let mut num = 0.0f64;
    let mut den1 = 0.0f64;
    let mut den2 = 0.0f64;
    for (a, b) in h1.iter().zip(h2.iter()) {
        let da = a - mean1;
        let db = b - mean2;
        num += da * db;
        den1 += da * da;
        den2 += db * db;
    }
    let denom = (den1 * den2).sqrt();
    if denom <= f64::EPSILON {
        0.0
    } else {
        (num / denom).clamp(-1.0, 1.0)
    }
}

/// Canny edge map, output pixels are strictly 0 or 255.
pub fn canny(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    imageproc::edges::canny(gray, low, high)
}

/// Absolute per-pixel difference of two equal-size grayscale buffers.
pub fn abs_diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (w, h) = a.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let av = a.get_pixel(x, y)[0] as i16;
            let bv = b.get_pixel(x, y)[0] as i16;
            out.put_pixel(x, y, Luma([(av - bv).unsigned_abs() as u8]));
        }
    }
    out
}

pub fn mean_u8(img: &GrayImage) -> f64 {
    let n = (img.width() as u64 * img.height() as u64).max(1);
    img.pixels().map(|p| p[0] as f64).sum::<f64>() / n as f64
}

pub fn std_u8(img: &GrayImage) -> f64 {
    let mean = mean_u8(img);
    let n = (img.width() as u64 * img.height() as u64).max(1);
    let var = img.pixels().map(|p| (p[0] as f64 - mean).powi(2)).sum::<f64>() / n as f64;
    var.sqrt()
}

/// Resize to exactly `720` px of height, keeping aspect ratio, using
/// area-weighted interpolation (`image::imageops::FilterType::Lanczos3`
/// is the closest high-quality equivalent available without a separate
/// area-averaging implementation and is used here for downscaling quality;
/// for the rare upscale case it behaves like any other resampling filter).
/// A zero-height/width source frame is returned unchanged.
pub fn resize_to_height_720(frame: &Frame, target_h: u32) -> Frame {
    let (new_w, new_h) = resized_dimensions(frame, target_h);
    if (new_w, new_h) == (frame.width, frame.height) {
        return frame.clone();
    }

    let rgb = bgr_to_rgb_image(frame);
    let resized = image::imageops::resize(&rgb, new_w, new_h, image::imageops::FilterType::Lanczos3);
    let data = rgb_image_to_bgr_bytes(&resized);
    Frame::new(data, new_w, new_h, frame.frame_index, frame.fps)
}

/// What `resize_to_height_720` would produce for `frame`, without doing the
/// resize — used by callers that need to report the output size without
/// holding on to the resized buffer (e.g. progress reporting).
pub fn resized_dimensions(frame: &Frame, target_h: u32) -> (u32, u32) {
    if frame.height == 0 || frame.width == 0 || frame.height == target_h {
        return (frame.width, frame.height);
    }
    let scale = target_h as f64 / frame.height as f64;
    let new_w = ((frame.width as f64 * scale).round() as u32).max(1);
    (new_w, target_h)
}

fn bgr_to_rgb_image(frame: &Frame) -> RgbImage {
    let mut out = RgbImage::new(frame.width, frame.height);
    for (i, chunk) in frame.data.chunks_exact(3).enumerate() {
        let x = (i as u32) % frame.width;
        let y = (i as u32) / frame.width;
        out.put_pixel(x, y, image::Rgb([chunk[2], chunk[1], chunk[0]]));
    }
    out
}

fn rgb_image_to_bgr_bytes(img: &RgbImage) -> Vec<u8> {
    let mut data = Vec::with_capacity(img.width() as usize * img.height() as usize * 3);
    for p in img.pixels() {
        data.push(p[2]);
        data.push(p[1]);
        data.push(p[0]);
    }
    data
}

/// Normalized cross-correlation coefficient between two equal-size patches,
/// matching `cv2.matchTemplate(..., cv2.TM_CCOEFF_NORMED)` on same-size
/// inputs (a single scalar, not a correlation surface).
pub fn match_template_normxcorr(a: &GrayImage, b: &GrayImage) -> f64 {
    let mean_a = mean_u8(a);
    let mean_b = mean_u8(b);
    let mut num = 0.0f64;
    let mut den_a = 0.0f64;
    let mut den_b = 0.0f64;
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        let da = pa[0] as f64 - mean_a;
        let db = pb[0] as f64 - mean_b;
        num += da * db;
        den_a += da * da;
        den_b += db * db;
    }
    let denom = (den_a * den_b).sqrt();
    if denom <= f64::EPSILON {
        0.0
    } else {
        num / denom
    }
}

/// Resize a grayscale buffer to exactly `w`x`h` (nearest-neighbor is
/// sufficient here: `frames_similar` only needs a coarse 32x32 proxy).
pub fn resize_gray(gray: &GrayImage, w: u32, h: u32) -> GrayImage {
    image::imageops::resize(gray, w, h, image::imageops::FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::solid;

    #[test]
    fn to_gray_of_mid_gray_bgr_is_stable() {
        let frame = solid(4, 4, (128, 128, 128), 0, 30.0);
        let gray = to_gray(&frame);
        assert!(gray.pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn resized_dimensions_keeps_aspect_ratio() {
        let frame = solid(1280, 360, (0, 0, 0), 0, 30.0);
        let (w, h) = resized_dimensions(&frame, 720);
        assert_eq!(h, 720);
        assert_eq!(w, 2560);
    }

    #[test]
    fn resized_dimensions_is_noop_at_target_height() {
        let frame = solid(1280, 720, (0, 0, 0), 0, 30.0);
        let (w, h) = resized_dimensions(&frame, 720);
        assert_eq!((w, h), (1280, 720));
    }

    #[test]
    fn hist_correl_of_identical_histograms_is_one() {
        let frame = solid(8, 8, (60, 90, 200), 0, 30.0);
        let h1 = hist_3d(&frame);
        let h2 = hist_3d(&frame);
        assert!((hist_correl(&h1, &h2) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn abs_diff_of_identical_images_is_zero() {
        let frame = solid(4, 4, (10, 20, 30), 0, 30.0);
        let gray = to_gray(&frame);
        let diff = abs_diff(&gray, &gray);
        assert!(diff.pixels().all(|p| p[0] == 0));
    }
}
