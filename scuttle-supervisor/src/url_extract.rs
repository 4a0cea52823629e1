use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s,;]+").expect("valid regex"));

/// Pulls the first `http(s)://` URL out of a line of tunnel stdout, e.g.
/// `cloudflared`'s `+--------------------------------------------------+\n|  https://random-words.trycloudflare.com  |`.
pub fn extract_url(line: &str) -> Option<String> {
    URL_RE.find(line).map(|m| m.as_str().trim_end_matches(['|', ')']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_url_from_boxed_cloudflared_line() {
        let line = "|  https://cute-otters-fly.trycloudflare.com  |";
        assert_eq!(extract_url(line).as_deref(), Some("https://cute-otters-fly.trycloudflare.com"));
    }

    #[test]
    fn returns_none_when_no_url_present() {
        assert_eq!(extract_url("starting tunnelâ€¦"), None);
    }

    #[test]
    fn stops_at_comma_or_semicolon() {
        let line = "connected to https://example.com/tunnel, retrying in 5s";
        assert_eq!(extract_url(line).as_deref(), Some("https://example.com/tunnel"));
    }
}
