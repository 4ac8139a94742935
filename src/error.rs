use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced across the crate boundary.
///
/// Scoring failures are deliberately absent from this enum: per-kernel
/// numerical errors are absorbed into fallback computations (see
/// `scoring`) and never propagate as an `Err`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid input path: {0}")]
    InputInvalid(PathBuf),

    #[error("failed to open video '{path}': {source}")]
    VideoOpenFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write frame to '{path}': {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("extraction failed: {0}")]
    FatalExtractionFailure(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
