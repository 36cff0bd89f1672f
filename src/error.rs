use std::path::PathBuf;
use std::process::ExitStatus;

/// Failures the pipeline reports explicitly. Everything else (a frame with
/// no detected pose, a boundary missing its end mark) is a normal outcome,
/// not an error.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to open video: {path}")]
    Decode { path: PathBuf },

    #[error("ffmpeg exited with {status} cutting {start_s:.3}s..{end_s:.3}s of {input} into {output}")]
    Transcode {
        input: PathBuf,
        output: PathBuf,
        start_s: f64,
        end_s: f64,
        status: ExitStatus,
    },
}
