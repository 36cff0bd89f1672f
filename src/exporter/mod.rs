use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::PipelineError;
use crate::flagger::RepBoundary;
use crate::shared::constants;
use crate::utils::{file_utils, logger};

/// One planned ffmpeg invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipJob {
    pub start_s: f64,
    pub end_s: f64,
    pub output: PathBuf,
}

/// Parses `{prefix}{digits}.mp4` filenames; anything else is ignored.
fn clip_number(file_name: &str, prefix: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(prefix)?
        .strip_suffix(&format!(".{}", constants::CLIP_EXTENSION))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next free index for `{prefix}{N}.mp4` in `output_dir`: highest existing
/// match + 1, or 1 for a fresh directory. Scanned once per export batch;
/// concurrent exporters against the same directory are out of scope.
pub fn next_clip_index(output_dir: &Path, prefix: &str) -> Result<u32> {
    let max = fs::read_dir(output_dir)
        .with_context(|| format!("Failed to read directory: {}", output_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| clip_number(&entry.file_name().to_string_lossy(), prefix))
        .max();

    Ok(max.map_or(1, |n| n + 1))
}

/// Turns flagged boundaries into concrete cut jobs. Boundaries without an
/// end mark are silently skipped; reversed or zero-length ranges are skipped
/// with a warning. Numbering continues from `first_index` in flag order.
pub fn plan_clips(
    boundaries: &[RepBoundary],
    first_index: u32,
    output_dir: &Path,
    prefix: &str,
) -> Vec<ClipJob> {
    let mut index = first_index;
    let mut jobs = Vec::new();

    for boundary in boundaries {
        let Some(end_ms) = boundary.end_ms else {
            continue;
        };
        if end_ms <= boundary.start_ms {
            logger::warn(&format!(
                "Skipping degenerate rep range {} ms..{} ms",
                boundary.start_ms, end_ms
            ));
            continue;
        }

        jobs.push(ClipJob {
            start_s: boundary.start_ms / 1000.0,
            end_s: end_ms / 1000.0,
            output: output_dir.join(format!("{}{}.{}", prefix, index, constants::CLIP_EXTENSION)),
        });
        index += 1;
    }

    jobs
}

/// Cuts one clip per complete boundary out of `video` with ffmpeg, H.264
/// video and AAC audio, named `{prefix}{N}.mp4` continuing the numbering
/// already present in `output_dir`. Returns the number of clips written; the
/// first failed invocation aborts the batch.
pub fn export_clips(
    video: &Path,
    boundaries: &[RepBoundary],
    output_dir: &Path,
    prefix: &str,
) -> Result<usize> {
    file_utils::ensure_dir(output_dir)?;

    let first_index = next_clip_index(output_dir, prefix)?;
    let jobs = plan_clips(boundaries, first_index, output_dir, prefix);

    for (i, job) in jobs.iter().enumerate() {
        println!(
            "Cutting rep {}: {:.3}s to {:.3}s as {}",
            i + 1,
            job.start_s,
            job.end_s,
            job.output.display()
        );
        run_ffmpeg(video, job)?;
    }

    logger::info(&format!(
        "Exported {} of {} flagged boundaries from {}",
        jobs.len(),
        boundaries.len(),
        video.display()
    ));

    Ok(jobs.len())
}

fn run_ffmpeg(video: &Path, job: &ClipJob) -> Result<()> {
    let status = Command::new("ffmpeg")
        .arg("-hide_banner")
        .args(["-loglevel", "error"])
        .arg("-y")
        .arg("-i")
        .arg(video)
        .args(["-ss", &format!("{:.3}", job.start_s)])
        .args(["-to", &format!("{:.3}", job.end_s)])
        .args(["-c:v", "libx264"])
        .args(["-c:a", "aac"])
        .arg(&job.output)
        .status()
        .context("Failed to spawn ffmpeg (is it installed and on PATH?)")?;

    if !status.success() {
        logger::error(&format!(
            "ffmpeg failed ({}) for {}",
            status,
            job.output.display()
        ));
        return Err(PipelineError::Transcode {
            input: video.to_path_buf(),
            output: job.output.clone(),
            start_s: job.start_s,
            end_s: job.end_s,
            status,
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn test_next_index_empty_dir_starts_at_one() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(next_clip_index(tmp.path(), "squat_").unwrap(), 1);
    }

    #[test]
    fn test_next_index_continues_after_max() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 1..=5 {
            touch(tmp.path(), &format!("squat_{}.mp4", i));
        }
        assert_eq!(next_clip_index(tmp.path(), "squat_").unwrap(), 6);
    }

    #[test]
    fn test_next_index_ignores_foreign_names() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "squat_3.mp4");
        touch(tmp.path(), "squat_12.mp4");
        touch(tmp.path(), "lunge_99.mp4");
        touch(tmp.path(), "squat_.mp4");
        touch(tmp.path(), "squat_abc.mp4");
        touch(tmp.path(), "squat_7.csv");
        assert_eq!(next_clip_index(tmp.path(), "squat_").unwrap(), 13);
    }

    #[test]
    fn test_plan_skips_boundaries_without_end() {
        let boundaries = vec![
            RepBoundary {
                start_ms: 0.0,
                end_ms: Some(2000.0),
            },
            RepBoundary {
                start_ms: 3000.0,
                end_ms: None,
            },
            RepBoundary {
                start_ms: 4000.0,
                end_ms: Some(5500.0),
            },
        ];

        let jobs = plan_clips(&boundaries, 6, Path::new("out"), "squat_");
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].output, PathBuf::from("out/squat_6.mp4"));
        assert_eq!(jobs[1].output, PathBuf::from("out/squat_7.mp4"));
        assert_eq!(jobs[0].start_s, 0.0);
        assert_eq!(jobs[0].end_s, 2.0);
        assert_eq!(jobs[1].start_s, 4.0);
    }

    #[test]
    fn test_plan_skips_reversed_and_zero_length_ranges() {
        let boundaries = vec![
            RepBoundary {
                start_ms: 1000.0,
                end_ms: Some(1000.0),
            },
            RepBoundary {
                start_ms: 2000.0,
                end_ms: Some(1500.0),
            },
        ];
        assert!(plan_clips(&boundaries, 1, Path::new("out"), "squat_").is_empty());
    }

    #[test]
    fn test_plan_empty_boundaries_means_no_invocations() {
        assert!(plan_clips(&[], 1, Path::new("out"), "squat_").is_empty());
    }
}
