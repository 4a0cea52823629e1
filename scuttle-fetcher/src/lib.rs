mod client;
mod error;
mod parse;
mod process;

pub use client::{action, Fetcher, FetcherConfig, MetadataOverride, FETCHER_NAME};
pub use error::{FetchError, Result};
pub use parse::{parse_line, RawResult};
