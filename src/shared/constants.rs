pub const APP_NAME: &str = "repkit";

pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

pub const CLIP_EXTENSION: &str = "mp4";
pub const CSV_EXTENSION: &str = "csv";
pub const FLIPPED_SUFFIX: &str = "_flipped";

pub const DEFAULT_CLIP_PREFIX: &str = "squat_";
pub const DEFAULT_PLAYBACK_FACTOR: f64 = 0.5;

pub const FLAG_WINDOW_NAME: &str = "repkit - flag reps";

// Keys accepted by the flagging window, as returned by highgui::wait_key.
pub const KEY_START: i32 = 's' as i32;
pub const KEY_END: i32 = 'e' as i32;
pub const KEY_QUIT: i32 = 'q' as i32;

// BlazePose-style single-pose models take a square RGB input.
pub const POSE_INPUT_SIZE: u32 = 256;
pub const DEFAULT_MIN_POSE_CONFIDENCE: f32 = 0.5;
