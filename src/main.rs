mod decoder;
mod error;
mod exporter;
mod extractor;
mod flagger;
mod pose;
mod shared;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::flagger::RepBoundary;
use crate::pose::BlazePoseEstimator;
use crate::shared::constants;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively flag rep boundaries in a video, then cut the clips
    Flag {
        #[arg(short, long)]
        video: PathBuf,
        #[arg(short, long)]
        output_dir: PathBuf,
        #[arg(short, long, default_value = constants::DEFAULT_CLIP_PREFIX)]
        prefix: String,
        /// Playback speed factor; 0.5 plays at half speed
        #[arg(long, default_value_t = constants::DEFAULT_PLAYBACK_FACTOR)]
        playback_factor: f64,
        /// Also save the flagged boundaries as JSON for later re-export
        #[arg(long)]
        boundaries_json: Option<PathBuf>,
    },
    /// Cut clips from a previously saved boundary list
    Export {
        #[arg(short, long)]
        video: PathBuf,
        #[arg(short, long)]
        boundaries_json: PathBuf,
        #[arg(short, long)]
        output_dir: PathBuf,
        #[arg(short, long, default_value = constants::DEFAULT_CLIP_PREFIX)]
        prefix: String,
    },
    /// Run pose estimation over a folder of clips and write landmark CSVs
    Extract {
        #[arg(short, long)]
        video_dir: PathBuf,
        #[arg(short, long)]
        csv_dir: PathBuf,
        /// BlazePose-style ONNX landmark model
        #[arg(short, long)]
        model: PathBuf,
        /// Pose-presence threshold below which a frame counts as no detection
        #[arg(long, default_value_t = constants::DEFAULT_MIN_POSE_CONFIDENCE)]
        min_confidence: f32,
    },
}

fn main() -> Result<()> {
    utils::logger::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Flag {
            video,
            output_dir,
            prefix,
            playback_factor,
            boundaries_json,
        } => {
            let boundaries = flagger::flag_reps(video, *playback_factor)?;
            if let Some(path) = boundaries_json {
                save_boundaries(path, &boundaries)?;
            }
            let count = exporter::export_clips(video, &boundaries, output_dir, prefix)?;
            println!("{} rep clips saved to {}", count, output_dir.display());
        }
        Commands::Export {
            video,
            boundaries_json,
            output_dir,
            prefix,
        } => {
            let boundaries = load_boundaries(boundaries_json)?;
            let count = exporter::export_clips(video, &boundaries, output_dir, prefix)?;
            println!("{} rep clips saved to {}", count, output_dir.display());
        }
        Commands::Extract {
            video_dir,
            csv_dir,
            model,
            min_confidence,
        } => {
            let mut estimator = BlazePoseEstimator::load(model, *min_confidence)?;
            extractor::extract_folder(video_dir, csv_dir, &mut estimator)?;
        }
    }

    Ok(())
}

fn save_boundaries(path: &Path, boundaries: &[RepBoundary]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, boundaries)?;
    println!("Boundaries saved to {}", path.display());
    Ok(())
}

fn load_boundaries(path: &Path) -> Result<Vec<RepBoundary>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(serde_json::from_reader(file)?)
}
