use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("could not locate playlist id in url: {0}")]
    MissingPlaylistId(String),
    #[error("no JSON data block found in embed page")]
    MissingDataBlock,
    #[error("malformed embed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("track at index {0} is missing a required field: {1}")]
    MissingField(usize, &'static str),
    #[error("playlist contained no tracks")]
    Empty,
}

pub type Result<T> = std::result::Result<T, ImportError>;
