use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use crate::error::ImportError;
use crate::extractor::{ImportedTrack, PlaylistExtractor};
use crate::json_search::find_key;
use crate::Result;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Extracts track listings from a Spotify playlist by scraping its public,
/// auth-free embed page — no API credentials required.
pub struct SpotifyExtractor {
    client: Client,
}

impl SpotifyExtractor {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    fn url_pattern() -> Regex {
        Regex::new(r"(?i)(spotify:playlist:|open\.spotify\.com/playlist|spotify\.link/)").expect("static pattern")
    }

    fn script_block_pattern() -> Regex {
        Regex::new(r#"(?s)<script[^>]+type="application/json"[^>]*>(.*?)</script>"#).expect("static pattern")
    }

    fn embed_url(resolved: &str) -> Result<String> {
        let path = resolved.splitn(2, "://").nth(1).unwrap_or(resolved);
        let path = path.splitn(2, '/').nth(1).unwrap_or("");
        let segments: Vec<&str> = path.split(['?', '#']).next().unwrap_or("").split('/').collect();
        let playlist_id = segments
            .iter()
            .position(|s| *s == "playlist")
            .and_then(|idx| segments.get(idx + 1))
            .copied()
            .ok_or_else(|| ImportError::MissingPlaylistId(resolved.to_string()))?;
        Ok(format!("https://open.spotify.com/embed/playlist/{playlist_id}"))
    }

    fn clean(s: &str) -> String {
        s.replace('\u{a0}', " ")
    }
}

impl Default for SpotifyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaylistExtractor for SpotifyExtractor {
    fn matches(&self, url: &str) -> bool {
        Self::url_pattern().is_match(url)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<ImportedTrack>> {
        let resolved = self.client.get(url).send().await?.url().to_string();
        let embed_url = Self::embed_url(&resolved)?;

        let html = self
            .client
            .get(&embed_url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await?
            .text()
            .await?;

        let captures = Self::script_block_pattern().captures(&html).ok_or(ImportError::MissingDataBlock)?;
        let data: serde_json::Value = serde_json::from_str(&captures[1])?;

        let track_list = find_key(&data, "trackList").and_then(|v| v.as_array()).ok_or(ImportError::MissingDataBlock)?;

        for (index, track) in track_list.iter().enumerate() {
            if track.get("title").is_none() {
                return Err(ImportError::MissingField(index, "title"));
            }
            if track.get("subtitle").is_none() {
                return Err(ImportError::MissingField(index, "subtitle"));
            }
        }

        let tracks: Vec<ImportedTrack> = track_list
            .iter()
            .map(|track| {
                let title = Self::clean(track.get("title").and_then(|v| v.as_str()).unwrap_or(""));
                let artist = Self::clean(track.get("subtitle").and_then(|v| v.as_str()).unwrap_or(""));
                ImportedTrack { download_query: format!("{title} by {artist}"), title, artist }
            })
            .collect();

        if tracks.is_empty() {
            return Err(ImportError::Empty);
        }
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_full_playlist_url() {
        let ext = SpotifyExtractor::new();
        assert!(ext.matches("https://open.spotify.com/playlist/3neOUFiSw5j7DVOzesUhh8"));
    }

    #[test]
    fn matches_short_share_link() {
        let ext = SpotifyExtractor::new();
        assert!(ext.matches("https://spotify.link/Gy55yym9CXb"));
    }

    #[test]
    fn matches_uri_form() {
        let ext = SpotifyExtractor::new();
        assert!(ext.matches("spotify:playlist:3neOUFiSw5j7DVOzesUhh8"));
    }

    #[test]
    fn does_not_match_unrelated_url() {
        let ext = SpotifyExtractor::new();
        assert!(!ext.matches("https://example.com/playlist/123"));
    }

    #[test]
    fn embed_url_extracts_id_from_query_suffixed_path() {
        let embed = SpotifyExtractor::embed_url("https://open.spotify.com/playlist/3neOUFiSw5j7DVOzesUhh8?si=abc").unwrap();
        assert_eq!(embed, "https://open.spotify.com/embed/playlist/3neOUFiSw5j7DVOzesUhh8");
    }

    #[test]
    fn embed_url_rejects_non_playlist_path() {
        assert!(SpotifyExtractor::embed_url("https://open.spotify.com/track/abc").is_err());
    }

    #[test]
    fn clean_strips_non_breaking_spaces() {
        assert_eq!(SpotifyExtractor::clean("Daft\u{a0}Punk"), "Daft Punk");
    }
}
