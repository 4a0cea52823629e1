use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostprocessError {
    #[error("transform binary exited with status {status}: {stderr}")]
    TransformFailed { status: i32, stderr: String },
    #[error("failed to parse loudnorm stats from transform stderr")]
    LoudnormStatsNotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PostprocessError>;
