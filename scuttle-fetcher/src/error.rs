use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    FetchFailed(String),
    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Postprocess(#[from] scuttle_postprocess::PostprocessError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
