use anyhow::{anyhow, Context, Result};
use fast_image_resize as fr;
use fr::images::Image;
use ndarray::{Array4, CowArray};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

use crate::shared::constants;
use crate::utils::logger;

use super::{Landmark, PoseEstimator, PoseLandmarks, RgbFrame, LANDMARK_COUNT};

/// Values per landmark in the model output (x, y, z, visibility, presence).
const VALUES_PER_LANDMARK: usize = 5;

/// Single-pose estimator over a BlazePose-style ONNX landmark model.
///
/// Expected model contract: input `[1, 256, 256, 3]` RGB float in `[0, 1]`,
/// output 0 a landmark tensor of 33 x 5 values with x/y in input pixels,
/// output 1 a pose-presence scalar. The session is run in streaming fashion,
/// one frame at a time, in stream order.
pub struct BlazePoseEstimator {
    session: Session,
    min_confidence: f32,
}

impl BlazePoseEstimator {
    pub fn load(model: &Path, min_confidence: f32) -> Result<Self> {
        ort::init()
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .commit()?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model)
            .with_context(|| format!("Failed to load pose model: {}", model.display()))?;

        ensure_pose_outputs(model, session.outputs.len())?;

        logger::info(&format!("Loaded pose model: {}", model.display()));

        Ok(Self {
            session,
            min_confidence,
        })
    }

    /// Stretch-resizes the frame to the model's square input and normalizes
    /// to `[0, 1]` NHWC. A stretch (not a letterbox) keeps the mapping
    /// trivial: normalized model outputs apply directly to the source frame.
    fn preprocess(&self, frame: &RgbFrame) -> Result<Array4<f32>> {
        let size = constants::POSE_INPUT_SIZE;

        let src = Image::from_vec_u8(
            frame.width,
            frame.height,
            frame.data.clone(),
            fr::PixelType::U8x3,
        )?;
        let mut dst = Image::new(size, size, fr::PixelType::U8x3);

        let mut resizer = fr::Resizer::new();
        resizer.resize(&src, &mut dst, None)?;

        let side = size as usize;
        let buffer = dst.buffer();
        let mut input = Array4::<f32>::zeros((1, side, side, 3));
        for y in 0..side {
            for x in 0..side {
                let offset = (y * side + x) * 3;
                for c in 0..3 {
                    input[[0, y, x, c]] = buffer[offset + c] as f32 / 255.0;
                }
            }
        }

        Ok(input)
    }
}

/// A usable model exposes at least the landmark tensor and the presence
/// scalar; anything narrower would panic on positional output lookup.
fn ensure_pose_outputs(model: &Path, outputs: usize) -> Result<()> {
    if outputs < 2 {
        return Err(anyhow!(
            "Pose model {} exposes {} output(s); expected a landmark tensor and a presence scalar",
            model.display(),
            outputs
        ));
    }
    Ok(())
}

impl PoseEstimator for BlazePoseEstimator {
    fn estimate(&mut self, frame: &RgbFrame) -> Result<Option<PoseLandmarks>> {
        let input = self.preprocess(frame)?;

        let input_dyn = CowArray::from(input).into_dyn();
        let inputs = ort::inputs![TensorRef::from_array_view(&input_dyn)?];
        let outputs = self.session.run(inputs)?;

        let (_, presence) = outputs[1].try_extract_tensor::<f32>()?;
        let score = presence.first().copied().unwrap_or(0.0);
        if score < self.min_confidence {
            return Ok(None);
        }

        let (_, raw) = outputs[0].try_extract_tensor::<f32>()?;
        if raw.len() < LANDMARK_COUNT * VALUES_PER_LANDMARK {
            return Err(anyhow!(
                "Unexpected landmark tensor length {} (need {})",
                raw.len(),
                LANDMARK_COUNT * VALUES_PER_LANDMARK
            ));
        }

        let input_side = constants::POSE_INPUT_SIZE as f32;
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (i, chunk) in raw
            .chunks_exact(VALUES_PER_LANDMARK)
            .take(LANDMARK_COUNT)
            .enumerate()
        {
            points[i] = Landmark {
                x: chunk[0] / input_side,
                y: chunk[1] / input_side,
            };
        }

        Ok(Some(PoseLandmarks::new(points)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_output_model_is_rejected() {
        let err = ensure_pose_outputs(Path::new("pose.onnx"), 1).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("pose.onnx"));
        assert!(msg.contains("1 output"));
    }

    #[test]
    fn test_two_output_model_is_accepted() {
        assert!(ensure_pose_outputs(Path::new("pose.onnx"), 2).is_ok());
        assert!(ensure_pose_outputs(Path::new("pose.onnx"), 5).is_ok());
    }
}
