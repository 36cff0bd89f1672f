use anyhow::{anyhow, Result};
use opencv::{core, imgproc, prelude::*, videoio};
use std::path::Path;

use crate::error::PipelineError;
use crate::pose::RgbFrame;
use crate::utils::logger;

/// Sequential frame reader over an `opencv::videoio::VideoCapture`.
///
/// The capture is released when the decoder is dropped; there is no seeking,
/// frames are consumed in stream order.
pub struct VideoDecoder {
    capture: videoio::VideoCapture,
    fps: f64,
}

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Video path is not valid UTF-8: {}", path.display()))?;

        // CAP_ANY lets OpenCV pick the platform backend
        // (AVFoundation / Media Foundation / V4L2-GStreamer).
        let capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            logger::error(&format!("Failed to open video file: {}", path.display()));
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
            }
            .into());
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;

        logger::debug(&format!(
            "Opened {} ({}x{} @ {:.2} fps)",
            path.display(),
            width,
            height,
            fps
        ));

        Ok(Self { capture, fps })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Stream position in milliseconds, as reported by the backend for the
    /// frame most recently read.
    pub fn position_ms(&self) -> Result<f64> {
        Ok(self.capture.get(videoio::CAP_PROP_POS_MSEC)?)
    }

    /// Reads the next frame (BGR) into `frame`. Returns `false` at end of
    /// stream; an unreadable file behaves as an immediately-ended stream.
    pub fn read_frame(&mut self, frame: &mut Mat) -> Result<bool> {
        if !self.capture.read(frame)? {
            return Ok(false);
        }
        Ok(!frame.empty())
    }

    /// Releases the capture eagerly instead of waiting for drop.
    pub fn release(&mut self) -> Result<()> {
        self.capture.release()?;
        Ok(())
    }
}

/// Converts a decoded BGR frame to a packed RGB buffer, optionally mirroring
/// it horizontally first. The mirror is a pure pixel flip: landmark names
/// produced downstream keep their left/right identity.
pub fn mat_to_rgb(frame: &Mat, flip: bool) -> Result<RgbFrame> {
    let bgr = if flip {
        let mut flipped = Mat::default();
        // flip code 1 = around the vertical axis
        core::flip(frame, &mut flipped, 1)?;
        flipped
    } else {
        frame.clone()
    };

    let mut rgb = Mat::default();
    imgproc::cvt_color_def(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB)?;

    if !rgb.is_continuous() {
        return Err(anyhow!("Converted frame is not continuous"));
    }

    Ok(RgbFrame {
        data: rgb.data_bytes()?.to_vec(),
        width: rgb.cols() as u32,
        height: rgb.rows() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2x2 BGR frame with four distinct pixels.
    fn test_frame() -> Mat {
        let data: [u8; 12] = [
            1, 2, 3, 4, 5, 6, //
            7, 8, 9, 10, 11, 12,
        ];
        Mat::from_slice(&data)
            .unwrap()
            .reshape(3, 2)
            .unwrap()
            .try_clone()
            .unwrap()
    }

    #[test]
    fn test_mirror_swaps_columns_not_channels() {
        let frame = test_frame();
        let plain = mat_to_rgb(&frame, false).unwrap();
        let mirrored = mat_to_rgb(&frame, true).unwrap();

        assert_eq!((plain.width, plain.height), (2, 2));
        // BGR -> RGB reverses channels; the mirror swaps the columns of
        // each row and nothing else.
        assert_eq!(plain.data, [3, 2, 1, 6, 5, 4, 9, 8, 7, 12, 11, 10]);
        assert_eq!(mirrored.data, [6, 5, 4, 3, 2, 1, 12, 11, 10, 9, 8, 7]);
    }

    #[test]
    fn test_mirror_twice_restores_original_pixels() {
        let frame = test_frame();
        let plain = mat_to_rgb(&frame, false).unwrap();

        // Mirror once with core::flip, then again through mat_to_rgb: the
        // double application must land back on the unflipped conversion.
        let mut once = Mat::default();
        core::flip(&frame, &mut once, 1).unwrap();
        let twice = mat_to_rgb(&once, true).unwrap();

        assert_eq!(twice.data, plain.data);
        assert_eq!((twice.width, twice.height), (plain.width, plain.height));
    }
}
