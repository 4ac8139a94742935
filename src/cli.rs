//! Argument parsing for the `keyframe-extractor` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::orchestrator::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliMode {
    Smart,
    Uniform,
    Interval,
}

impl From<CliMode> for Mode {
    fn from(m: CliMode) -> Mode {
        match m {
            CliMode::Smart => Mode::Smart,
            CliMode::Uniform => Mode::Uniform,
            CliMode::Interval => Mode::Interval,
        }
    }
}

/// Extract representative keyframes from a video file.
#[derive(Debug, Parser)]
#[command(name = "keyframe-extractor", version, about)]
pub struct Cli {
    /// Path to the input video file.
    pub video: PathBuf,

    /// Output directory. Defaults to `{video_dir}/{video_stem}_keyframes`.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Maximum number of keyframes to produce.
    #[arg(long, default_value_t = 300)]
    pub max_frames: u32,

    /// Extraction strategy.
    #[arg(long, value_enum, default_value_t = CliMode::Smart)]
    pub mode: CliMode,

    /// Fixed seconds between samples, used only by `--mode interval`.
    #[arg(long)]
    pub time_interval: Option<f64>,

    /// Raise log verbosity (info -> debug).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn output_dir(&self) -> PathBuf {
        if let Some(out) = &self.out {
            return out.clone();
        }
        let dir = self.video.parent().map(PathBuf::from).unwrap_or_default();
        let stem = self.video.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "video".into());
        dir.join(format!("{stem}_keyframes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_dir_is_derived_from_video_path() {
        let cli = Cli { video: PathBuf::from("/videos/clip.mp4"), out: None, max_frames: 300, mode: CliMode::Smart, time_interval: None, verbose: false };
        assert_eq!(cli.output_dir(), PathBuf::from("/videos/clip_keyframes"));
    }

    #[test]
    fn explicit_out_overrides_default() {
        let cli = Cli {
            video: PathBuf::from("/videos/clip.mp4"),
            out: Some(PathBuf::from("/tmp/custom")),
            max_frames: 300,
            mode: CliMode::Smart,
            time_interval: None,
            verbose: false,
        };
        assert_eq!(cli.output_dir(), PathBuf::from("/tmp/custom"));
    }
}
