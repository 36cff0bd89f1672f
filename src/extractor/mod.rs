use anyhow::Result;
use opencv::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::decoder::{mat_to_rgb, VideoDecoder};
use crate::pose::{PoseEstimator, PoseLandmarks, RgbFrame, CONNECTIONS};
use crate::shared::constants;
use crate::utils::{file_utils, logger};

/// CSV header: frame index, then four pixel columns per connection in
/// declared order.
pub fn csv_header() -> String {
    let mut columns = vec!["Frame".to_string()];
    for (start, end) in CONNECTIONS {
        for suffix in ["start_x", "start_y", "end_x", "end_y"] {
            columns.push(format!("{}_to_{}_{}", start.name(), end.name(), suffix));
        }
    }
    columns.join(",")
}

/// One data row: normalized landmarks scaled to pixel ints (truncated) over
/// the frame dimensions.
fn landmark_row(frame_index: usize, pose: &PoseLandmarks, width: u32, height: u32) -> String {
    let mut values = vec![frame_index.to_string()];
    for (start, end) in CONNECTIONS {
        let s = pose.get(start);
        let e = pose.get(end);
        values.push(((s.x * width as f32) as i32).to_string());
        values.push(((s.y * height as f32) as i32).to_string());
        values.push(((e.x * width as f32) as i32).to_string());
        values.push(((e.y * height as f32) as i32).to_string());
    }
    values.join(",")
}

/// Runs the estimator over a frame stream and writes one row per detected
/// pose. Frames without a detection produce no row but still advance the
/// frame index. Returns the number of data rows written.
pub fn write_rows<W: Write>(
    writer: &mut W,
    estimator: &mut dyn PoseEstimator,
    frames: impl Iterator<Item = Result<RgbFrame>>,
) -> Result<usize> {
    let mut rows = 0;
    for (frame_index, frame) in frames.enumerate() {
        let frame = frame?;
        if let Some(pose) = estimator.estimate(&frame)? {
            writeln!(
                writer,
                "{}",
                landmark_row(frame_index, &pose, frame.width, frame.height)
            )?;
            rows += 1;
        }
    }
    Ok(rows)
}

/// Sequential RGB frames off a decoder, optionally mirrored horizontally.
struct FrameIter<'a> {
    decoder: &'a mut VideoDecoder,
    flip: bool,
    buffer: Mat,
    done: bool,
}

impl<'a> FrameIter<'a> {
    fn new(decoder: &'a mut VideoDecoder, flip: bool) -> Self {
        Self {
            decoder,
            flip,
            buffer: Mat::default(),
            done: false,
        }
    }
}

impl Iterator for FrameIter<'_> {
    type Item = Result<RgbFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.read_frame(&mut self.buffer) {
            Ok(true) => Some(mat_to_rgb(&self.buffer, self.flip)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Extracts landmark rows for one clip into `csv_path`. The header always
/// goes out first; a clip that cannot be opened logs the failure and leaves
/// a header-only file so the batch keeps going.
pub fn process_clip(
    video: &Path,
    csv_path: &Path,
    flip: bool,
    estimator: &mut dyn PoseEstimator,
) -> Result<usize> {
    let file = File::create(csv_path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", csv_header())?;

    let mut decoder = match VideoDecoder::open(video) {
        Ok(decoder) => decoder,
        Err(e) => {
            logger::error(&format!(
                "Skipping unreadable clip {}: {}",
                video.display(),
                e
            ));
            writer.flush()?;
            return Ok(0);
        }
    };

    let rows = write_rows(&mut writer, estimator, FrameIter::new(&mut decoder, flip))?;
    writer.flush()?;

    logger::debug(&format!(
        "{} -> {} ({} rows, flip={})",
        video.display(),
        csv_path.display(),
        rows,
        flip
    ));

    Ok(rows)
}

/// Output CSV path for a clip: `{stem}.csv`, or `{stem}_flipped.csv` for the
/// mirrored pass.
fn csv_path_for(clip: &Path, csv_dir: &Path, flip: bool) -> std::path::PathBuf {
    let stem = clip
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let suffix = if flip { constants::FLIPPED_SUFFIX } else { "" };
    csv_dir.join(format!("{}{}.{}", stem, suffix, constants::CSV_EXTENSION))
}

/// Processes every clip in `video_dir` twice (as-is and mirrored) into
/// per-clip CSVs under `csv_dir`. The mirrored pass is data augmentation:
/// pixel positions change, landmark left/right names deliberately do not.
pub fn extract_folder(
    video_dir: &Path,
    csv_dir: &Path,
    estimator: &mut dyn PoseEstimator,
) -> Result<()> {
    file_utils::ensure_dir(csv_dir)?;
    let clips = file_utils::list_clips(video_dir)?;

    for clip in &clips {
        for flip in [false, true] {
            let csv_path = csv_path_for(clip, csv_dir, flip);
            let rows = process_clip(clip, &csv_path, flip, estimator)?;
            println!(
                "Processed {}{} -> {} ({} frames with pose)",
                clip.display(),
                if flip { " (flipped)" } else { "" },
                csv_path.display(),
                rows
            );
        }
    }

    println!(
        "Processing complete. CSV files saved for {} clips (original and flipped).",
        clips.len()
    );

    Ok(())
}
