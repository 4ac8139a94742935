use serde::Serialize;

/// One committed keyframe, as reported back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PathOut {
    pub path: String,
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
}
