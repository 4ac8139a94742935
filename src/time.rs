//! Thin wrapper around `SystemTime` for the one place we need a wall-clock
//! timestamp (debug artifact filenames). Kept as its own module so it's the
//! single non-deterministic call site in the crate.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn unix_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
