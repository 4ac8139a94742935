/// Process-wide scoring constants for the smart extractor.
///
/// Mirrors `SMART_EXTRACTION_CONFIG` from the original implementation.
/// The shipped defaults are frozen; tests may build an override to run
/// kernel-weight sensitivity analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub scene_change_threshold: f64,
    pub min_interval: f64,
    pub max_interval: f64,
    pub hist_weight: f64,
    pub ssim_weight: f64,
    pub edge_weight: f64,
    pub motion_weight: f64,
    pub quality_weight: f64,
    pub change_weight: f64,
    pub quality_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            scene_change_threshold: 35.0,
            min_interval: 0.5,
            max_interval: 3.0,
            hist_weight: 0.3,
            ssim_weight: 0.3,
            edge_weight: 0.3,
            motion_weight: 0.1,
            quality_weight: 0.4,
            change_weight: 0.6,
            quality_threshold: 20.0,
        }
    }
}

/// Similarity threshold used by `frames_similar`'s public default.
pub const SIMILARITY_DEFAULT_THRESHOLD: f64 = 0.75;

/// Stricter similarity threshold enforced at commit time by the smart
/// extractor, to suppress near-duplicates across consecutive seconds.
pub const SIMILARITY_COMMIT_THRESHOLD: f64 = 0.8;

/// Dark-frame mean-brightness threshold.
pub const DARK_THRESHOLD: f64 = 35.0;

/// JPEG quality used for every written keyframe.
pub const JPEG_QUALITY: u8 = 85;

/// Target output height (px) for every written keyframe.
pub const RESIZE_TARGET_HEIGHT: u32 = 720;
