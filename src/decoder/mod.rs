pub mod video;

pub use video::{mat_to_rgb, VideoDecoder};
