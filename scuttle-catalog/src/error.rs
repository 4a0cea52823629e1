use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown track: {0}")]
    UnknownTrack(String),
    #[error("unknown playlist: {0}")]
    UnknownPlaylist(i64),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
