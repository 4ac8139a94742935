use std::process::ExitCode;

use clap::Parser;
use keyframe_extractor::cli::Cli;
use keyframe_extractor::error::ExtractError;
use keyframe_extractor::orchestrator::{self, ExtractParams, Mode};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let output_dir = cli.output_dir();
    let params = ExtractParams {
        video_path: &cli.video,
        output_dir: &output_dir,
        max_frames: cli.max_frames,
        mode: cli.mode.into(),
        time_interval: cli.time_interval,
        debug: false,
    };

    let result = match params.mode {
        Mode::Smart => orchestrator::extract_with_fallback(&params),
        Mode::Uniform | Mode::Interval => orchestrator::extract(&params),
    };

    match result {
        Ok(saved) if !saved.is_empty() => {
            for frame in &saved {
                println!("{} (t={:.2}s, {}x{}, {} bytes)", frame.path, frame.timestamp, frame.width, frame.height, frame.file_size_bytes);
            }
            println!("extracted {} keyframes to {}", saved.len(), output_dir.display());
            ExitCode::from(0)
        }
        Ok(_) => {
            log::error!("no keyframes produced for {}", cli.video.display());
            ExitCode::from(1)
        }
        Err(ExtractError::InputInvalid(path)) => {
            log::error!("invalid input path: {}", path.display());
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("extraction failed: {e}");
            ExitCode::from(1)
        }
    }
}
