//! Scoring kernels: scene-change detection, frame quality, dark-frame and
//! similarity classification.
//!
//! Each kernel absorbs its own numerical failures per the fallback tiers in
//! the design doc — none of these functions return `Result`; a kernel that
//! can't compute its primary formula falls back to a cruder one, and only
//! gives up entirely (returning a fixed sentinel) if that also fails.

use image::GrayImage;
use rayon::join;

use crate::config::ScoringConfig;
use crate::frame::Frame;
use crate::image_ops::{
    abs_diff, canny, gaussian_blur, hist_1d, hist_3d, hist_correl, match_template_normxcorr,
    mean_u8, mul, resize_gray, std_u8, sub, to_f32, to_gray,
};

const SSIM_C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const SSIM_C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Weighted combination of histogram dissimilarity, (1 - mean SSIM),
/// edge-map difference and pixel motion. Range `[0, 100]`.
///
/// On failure of any intermediate step, falls back to
/// `mean(abs_diff(gray1, gray2))` (unclamped); if even that cannot be
/// computed (e.g. mismatched frame sizes) returns `0.0`.
pub fn scene_change_score(f1: &Frame, f2: &Frame, cfg: &ScoringConfig) -> f64 {
    if f1.width != f2.width || f1.height != f2.height || f1.width == 0 || f1.height == 0 {
        return 0.0;
    }

    let gray1 = to_gray(f1);
    let gray2 = to_gray(f2);

    match scene_change_primary(f1, f2, &gray1, &gray2, cfg) {
        Some(score) => score,
        None => {
            let diff = abs_diff(&gray1, &gray2);
            mean_u8(&diff)
        }
    }
}

fn scene_change_primary(
    f1: &Frame,
    f2: &Frame,
    gray1: &GrayImage,
    gray2: &GrayImage,
    cfg: &ScoringConfig,
) -> Option<f64> {
    let ((hist_score, ssim_score), (edge_change, motion)) = join(
        || join(|| hist_dissimilarity(f1, f2), || ssim_dissimilarity(gray1, gray2)),
        || join(|| edge_change_score(gray1, gray2), || motion_score(gray1, gray2)),
    );

    let score = cfg.hist_weight * hist_score
        + cfg.ssim_weight * ssim_score
        + cfg.edge_weight * edge_change
        + cfg.motion_weight * motion;
    Some(score.clamp(0.0, 100.0))
}

fn hist_dissimilarity(f1: &Frame, f2: &Frame) -> f64 {
    let h1 = hist_3d(f1);
    let h2 = hist_3d(f2);
    let corr = hist_correl(&h1, &h2);
    (1.0 - corr.max(0.0)) * 100.0
}

fn edge_change_score(gray1: &GrayImage, gray2: &GrayImage) -> f64 {
    let e1 = canny(gray1, 50.0, 150.0);
    let e2 = canny(gray2, 50.0, 150.0);
    mean_u8(&abs_diff(&e1, &e2)) * 2.0
}

fn motion_score(gray1: &GrayImage, gray2: &GrayImage) -> f64 {
    mean_u8(&abs_diff(gray1, gray2))
}

/// `1 - mean(ssim_map)` scaled to `[0, 100]`, computed with the standard
/// SSIM formula over 5x5-Gaussian-blurred (sigma=1.0) luminance.
fn ssim_dissimilarity(gray1: &GrayImage, gray2: &GrayImage) -> f64 {
    let g1 = to_f32(gray1);
    let g2 = to_f32(gray2);

    let mu1 = gaussian_blur(&g1, 1.0);
    let mu2 = gaussian_blur(&g2, 1.0);
    let mu1_sq = mul(&mu1, &mu1);
    let mu2_sq = mul(&mu2, &mu2);
    let mu1_mu2 = mul(&mu1, &mu2);

    let g1_sq = mul(&g1, &g1);
    let g2_sq = mul(&g2, &g2);
    let g1_g2 = mul(&g1, &g2);

    let sigma1_sq = sub(&gaussian_blur(&g1_sq, 1.0), &mu1_sq);
    let sigma2_sq = sub(&gaussian_blur(&g2_sq, 1.0), &mu2_sq);
    let sigma12 = sub(&gaussian_blur(&g1_g2, 1.0), &mu1_mu2);

    let (w, h) = mu1.dimensions();
    let mut sum = 0.0f64;
    let n = (w as u64 * h as u64).max(1) as f64;
    for y in 0..h {
        for x in 0..w {
            let mu1_mu2_v = mu1_mu2.get_pixel(x, y)[0] as f64;
            let s1sq = mu1_sq.get_pixel(x, y)[0] as f64;
            let s2sq = mu2_sq.get_pixel(x, y)[0] as f64;
            let v1 = sigma1_sq.get_pixel(x, y)[0] as f64;
            let v2 = sigma2_sq.get_pixel(x, y)[0] as f64;
            let v12 = sigma12.get_pixel(x, y)[0] as f64;

            let numerator = (2.0 * mu1_mu2_v + SSIM_C1) * (2.0 * v12 + SSIM_C2);
            let denominator = (s1sq + s2sq + SSIM_C1) * (v1 + v2 + SSIM_C2);
            let ssim = if denominator.abs() > f64::EPSILON { numerator / denominator } else { 1.0 };
            sum += ssim;
        }
    }
    let mean_ssim = sum / n;
    (1.0 - mean_ssim) * 100.0
}

/// `0.7 * variance(laplacian) + 0.3 * 1000 * edge_density`. On error
/// (degenerate/empty frame) returns `50.0`.
pub fn frame_quality(frame: &Frame) -> f64 {
    if frame.width < 3 || frame.height < 3 {
        return 50.0;
    }
    let gray = to_gray(frame);
    let lap_var = laplacian_variance(&gray);
    let edges = canny(&gray, 50.0, 150.0);
    let edge_density =
        edges.pixels().filter(|p| p[0] > 0).count() as f64 / (frame.width as f64 * frame.height as f64);
    0.7 * lap_var + 0.3 * 1000.0 * edge_density
}

/// Variance of the 3x3 Laplacian response `[[0,1,0],[1,-4,1],[0,1,0]]`,
/// matching `cv2.Laplacian(gray, cv2.CV_64F).var()`. Border pixels are
/// excluded (no padding), as OpenCV's default border handling does not
/// affect the variance enough to matter for thresholded decisions here.
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let mut responses = Vec::with_capacity((w as usize - 2) * (h as usize - 2));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = gray.get_pixel(x, y)[0] as f64;
            let top = gray.get_pixel(x, y - 1)[0] as f64;
            let bottom = gray.get_pixel(x, y + 1)[0] as f64;
            let left = gray.get_pixel(x - 1, y)[0] as f64;
            let right = gray.get_pixel(x + 1, y)[0] as f64;
            responses.push(top + bottom + left + right - 4.0 * center);
        }
    }
    variance(&responses)
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// `(total, quality_norm, change)` for one frame relative to the previously
/// committed frame (`prev = None` at the very first commit attempt).
pub fn comprehensive_score(frame: &Frame, prev: Option<&Frame>, cfg: &ScoringConfig) -> (f64, f64, f64) {
    let quality_norm = (frame_quality(frame) / 5.0).min(100.0);
    let change = match prev {
        Some(p) => scene_change_score(p, frame, cfg),
        None => 0.0,
    };
    let total = cfg.quality_weight * quality_norm + cfg.change_weight * change;
    (total, quality_norm, change)
}

/// A frame is dark if its mean brightness is low, if nearly all pixels are
/// below `threshold`, or if it is both low-contrast and low-entropy
/// (a flat, featureless frame). Returns `false` on any computation error.
pub fn is_dark(frame: &Frame, threshold: f64) -> bool {
    if frame.width == 0 || frame.height == 0 {
        return false;
    }
    let gray = to_gray(frame);
    let mean_b = mean_u8(&gray);
    let n = (frame.width as u64 * frame.height as u64).max(1) as f64;
    let dark_count = gray.pixels().filter(|p| (p[0] as f64) < threshold).count() as f64;
    let dark_ratio = dark_count / n;
    let std_b = std_u8(&gray);

    let hist = hist_1d(&gray, 256);
    let total: f64 = hist.iter().sum::<f64>().max(1.0);
    let entropy: f64 = hist
        .iter()
        .map(|&c| {
            let p = c / total;
            -p * (p + 1e-7).log2()
        })
        .sum();

    mean_b < threshold || dark_ratio > 0.95 || (std_b < 10.0 && entropy < 3.0)
}

/// Combines a 32-bin grayscale histogram correlation with a 32x32
/// normalized-cross-correlation template match. Returns `false` on error.
pub fn frames_similar(gray1: &GrayImage, gray2: &GrayImage, threshold: f64) -> bool {
    if gray1.dimensions() != gray2.dimensions() || gray1.width() == 0 || gray1.height() == 0 {
        return false;
    }
    let h1 = hist_1d(gray1, 32);
    let h2 = hist_1d(gray2, 32);
    let hist_sim = hist_correl(&h1, &h2);

    let small1 = resize_gray(gray1, 32, 32);
    let small2 = resize_gray(gray2, 32, 32);
    let template_sim = match_template_normxcorr(&small1, &small2);

    let sim = 0.5 * hist_sim + 0.5 * template_sim;
    sim > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::{checkerboard, solid};

    #[test]
    fn scene_change_score_of_identical_frame_is_zero() {
        let cfg = ScoringConfig::default();
        let frame = checkerboard(32, 32, 0, 30.0);
        let score = scene_change_score(&frame, &frame, &cfg);
        assert!(score.abs() < 1e-6, "expected ~0, got {score}");
    }

    #[test]
    fn scene_change_score_of_mismatched_sizes_is_zero() {
        let cfg = ScoringConfig::default();
        let a = solid(16, 16, (0, 0, 0), 0, 30.0);
        let b = solid(32, 32, (0, 0, 0), 0, 30.0);
        assert_eq!(scene_change_score(&a, &b, &cfg), 0.0);
    }

    #[test]
    fn scene_change_score_detects_checkerboard_flip() {
        let cfg = ScoringConfig::default();
        let a = checkerboard(32, 32, 0, 30.0);
        let b = solid(32, 32, (220, 220, 220), 1, 30.0);
        let score = scene_change_score(&a, &b, &cfg);
        assert!(score > 1.0, "expected meaningful change, got {score}");
    }

    #[test]
    fn is_dark_flags_black_frame() {
        let black = solid(16, 16, (0, 0, 0), 0, 30.0);
        assert!(is_dark(&black, crate::config::DARK_THRESHOLD));
    }

    #[test]
    fn is_dark_does_not_flag_mid_gray_frame() {
        let gray = solid(16, 16, (128, 128, 128), 0, 30.0);
        assert!(!is_dark(&gray, crate::config::DARK_THRESHOLD));
    }

    #[test]
    fn frames_similar_is_true_for_identical_frames() {
        let frame = checkerboard(32, 32, 0, 30.0);
        let gray = crate::image_ops::to_gray(&frame);
        assert!(frames_similar(&gray, &gray, crate::config::SIMILARITY_DEFAULT_THRESHOLD));
    }

    #[test]
    fn frame_quality_is_invariant_under_identity() {
        let frame = checkerboard(32, 32, 0, 30.0);
        assert_eq!(frame_quality(&frame), frame_quality(&frame));
    }

    #[test]
    fn frame_quality_drops_with_heavier_blur() {
        let frame = checkerboard(64, 64, 0, 30.0);
        let gray = crate::image_ops::to_gray(&frame);
        let f32img = crate::image_ops::to_f32(&gray);
        let light = crate::image_ops::gaussian_blur(&f32img, 1.0);
        let heavy = crate::image_ops::gaussian_blur(&f32img, 4.0);
        let lap_light = variance_of_f32(&light);
        let lap_heavy = variance_of_f32(&heavy);
        assert!(lap_heavy <= lap_light);
    }

    fn variance_of_f32(img: &image::ImageBuffer<image::Luma<f32>, Vec<f32>>) -> f64 {
        let values: Vec<f64> = img.pixels().map(|p| p[0] as f64).collect();
        variance(&values)
    }

    #[test]
    fn comprehensive_score_with_no_prev_has_zero_change() {
        let cfg = ScoringConfig::default();
        let frame = checkerboard(32, 32, 0, 30.0);
        let (_, _, change) = comprehensive_score(&frame, None, &cfg);
        assert_eq!(change, 0.0);
    }
}
