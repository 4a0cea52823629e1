use crate::extractor::{ImportedTrack, PlaylistExtractor};
use crate::spotify::SpotifyExtractor;

/// Ordered list of known playlist handlers. The first handler whose
/// `matches` returns `true` owns the URL; its failure is logged and
/// produces an empty result — it does not fall through to the next
/// handler.
pub struct PlaylistImportRegistry {
    extractors: Vec<Box<dyn PlaylistExtractor>>,
}

impl PlaylistImportRegistry {
    pub fn new() -> Self {
        Self { extractors: vec![Box::new(SpotifyExtractor::new())] }
    }

    pub fn with_extractors(extractors: Vec<Box<dyn PlaylistExtractor>>) -> Self {
        Self { extractors }
    }

    pub async fn import(&self, url: &str) -> Vec<ImportedTrack> {
        let Some(extractor) = self.extractors.iter().find(|e| e.matches(url)) else {
            tracing::warn!(url, "no playlist extractor matched this url");
            return Vec::new();
        };

        match extractor.fetch(url).await {
            Ok(tracks) => tracks,
            Err(e) => {
                tracing::error!(error = %e, url, "playlist extractor failed");
                Vec::new()
            }
        }
    }
}

impl Default for PlaylistImportRegistry {
    fn default() -> Self {
        Self::new()
    }
}
