use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("no downloaded file for id {0}")]
    NotFound(String),
    #[error("invalid range header: {0}")]
    InvalidRange(String),
    #[error("requested range not satisfiable")]
    RangeNotSatisfiable,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StreamError>;
