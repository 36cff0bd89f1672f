use anyhow::Result;
use opencv::{highgui, prelude::*};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::decoder::VideoDecoder;
use crate::shared::constants;
use crate::utils::logger;

/// One operator-flagged repetition. `end_ms` stays `None` until the end key
/// is pressed; an entry that never receives one is dropped by the exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepBoundary {
    pub start_ms: f64,
    pub end_ms: Option<f64>,
}

impl RepBoundary {
    pub fn started_at(start_ms: f64) -> Self {
        Self {
            start_ms,
            end_ms: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.end_ms.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Start,
    End,
    Quit,
    None,
}

impl KeyAction {
    fn from_key(key: i32) -> Self {
        match key {
            k if k == constants::KEY_START => KeyAction::Start,
            k if k == constants::KEY_END => KeyAction::End,
            k if k == constants::KEY_QUIT => KeyAction::Quit,
            _ => KeyAction::None,
        }
    }
}

/// Applies one keypress to the boundary list. Returns `true` when the
/// session should stop.
///
/// The end key always targets the most recent boundary and overwrites any
/// earlier end mark; with no boundaries yet it does nothing. Range sanity
/// (end after start) is not enforced here, the exporter filters degenerate
/// ranges at cut time.
fn apply_key(boundaries: &mut Vec<RepBoundary>, action: KeyAction, position_ms: f64) -> bool {
    match action {
        KeyAction::Start => {
            println!("Start rep at {} ms", position_ms);
            logger::info(&format!("Flagged rep start at {} ms", position_ms));
            boundaries.push(RepBoundary::started_at(position_ms));
            false
        }
        KeyAction::End => {
            if let Some(last) = boundaries.last_mut() {
                println!("End rep at {} ms", position_ms);
                logger::info(&format!("Flagged rep end at {} ms", position_ms));
                last.end_ms = Some(position_ms);
            }
            false
        }
        KeyAction::Quit => true,
        KeyAction::None => false,
    }
}

/// Plays `video` at `playback_factor` speed in a window and collects rep
/// boundaries from operator keypresses (`s` start, `e` end, `q` quit).
///
/// The wait between frames doubles as the keystroke poll: each frame blocks
/// for `(1000 / fps) / playback_factor` ms, so a factor of 0.5 plays at half
/// speed. Timestamps come from the decoder's reported position for the frame
/// just shown. Quitting mid-rep keeps the open boundary in the returned
/// list.
pub fn flag_reps(video: &Path, playback_factor: f64) -> Result<Vec<RepBoundary>> {
    if playback_factor <= 0.0 {
        anyhow::bail!("Playback factor must be positive, got {}", playback_factor);
    }

    let mut decoder = VideoDecoder::open(video)?;
    let fps = decoder.fps();
    let delay_ms = if fps > 0.0 {
        (((1000.0 / fps) / playback_factor).round() as i32).max(1)
    } else {
        1
    };

    logger::info(&format!(
        "Flagging {} at factor {} ({} ms/frame)",
        video.display(),
        playback_factor,
        delay_ms
    ));

    let mut boundaries = Vec::new();
    let mut frame = Mat::default();

    let result = loop {
        match decoder.read_frame(&mut frame) {
            Ok(true) => {}
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }

        if let Err(e) = highgui::imshow(constants::FLAG_WINDOW_NAME, &frame) {
            break Err(e.into());
        }

        let key = match highgui::wait_key(delay_ms) {
            Ok(k) => k,
            Err(e) => break Err(e.into()),
        };
        let position_ms = decoder.position_ms().unwrap_or(0.0);

        if apply_key(&mut boundaries, KeyAction::from_key(key), position_ms) {
            break Ok(());
        }
    };

    // Tear down the capture and the window on every exit path.
    let _ = decoder.release();
    let _ = highgui::destroy_window(constants::FLAG_WINDOW_NAME);

    result?;

    logger::info(&format!(
        "Flagging session ended with {} boundaries ({} complete)",
        boundaries.len(),
        boundaries.iter().filter(|b| b.is_complete()).count()
    ));

    Ok(boundaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_key_opens_boundary() {
        let mut boundaries = Vec::new();
        let quit = apply_key(&mut boundaries, KeyAction::Start, 1200.0);
        assert!(!quit);
        assert_eq!(boundaries, vec![RepBoundary::started_at(1200.0)]);
        assert!(!boundaries[0].is_complete());
    }

    #[test]
    fn test_end_key_closes_most_recent_boundary() {
        let mut boundaries = vec![
            RepBoundary {
                start_ms: 0.0,
                end_ms: Some(900.0),
            },
            RepBoundary::started_at(1000.0),
        ];
        apply_key(&mut boundaries, KeyAction::End, 2000.0);
        assert_eq!(boundaries[1].end_ms, Some(2000.0));
        assert_eq!(boundaries[0].end_ms, Some(900.0));
    }

    #[test]
    fn test_end_key_without_open_boundary_is_noop() {
        let mut boundaries = Vec::new();
        let quit = apply_key(&mut boundaries, KeyAction::End, 500.0);
        assert!(!quit);
        assert!(boundaries.is_empty());
    }

    #[test]
    fn test_second_end_key_overwrites() {
        let mut boundaries = vec![RepBoundary::started_at(100.0)];
        apply_key(&mut boundaries, KeyAction::End, 800.0);
        apply_key(&mut boundaries, KeyAction::End, 950.0);
        assert_eq!(boundaries[0].end_ms, Some(950.0));
    }

    #[test]
    fn test_quit_preserves_open_boundary() {
        let mut boundaries = vec![RepBoundary::started_at(100.0)];
        let quit = apply_key(&mut boundaries, KeyAction::Quit, 300.0);
        assert!(quit);
        assert_eq!(boundaries, vec![RepBoundary::started_at(100.0)]);
    }

    #[test]
    fn test_unmapped_key_does_nothing() {
        let mut boundaries = vec![RepBoundary::started_at(100.0)];
        let quit = apply_key(&mut boundaries, KeyAction::from_key(-1), 300.0);
        assert!(!quit);
        assert_eq!(boundaries, vec![RepBoundary::started_at(100.0)]);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyAction::from_key('s' as i32), KeyAction::Start);
        assert_eq!(KeyAction::from_key('e' as i32), KeyAction::End);
        assert_eq!(KeyAction::from_key('q' as i32), KeyAction::Quit);
        assert_eq!(KeyAction::from_key('x' as i32), KeyAction::None);
    }
}
