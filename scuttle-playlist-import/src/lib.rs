mod error;
mod extractor;
mod json_search;
mod registry;
mod spotify;

pub use error::{ImportError, Result};
pub use extractor::{ImportedTrack, PlaylistExtractor};
pub use registry::PlaylistImportRegistry;
pub use spotify::SpotifyExtractor;
