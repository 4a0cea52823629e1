/// A single row printed by the external binary, `U+001F`-delimited:
/// `id\x1ftitle\x1fuploader\x1fduration`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub duration: f64,
}

const DELIMITER: char = '\u{1f}';

/// Parses one line of stdout. Returns `None` (and the caller logs a warning) on any
/// malformed line rather than failing the whole batch.
pub fn parse_line(line: &str) -> Option<RawResult> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let mut fields = line.split(DELIMITER);
    let id = fields.next()?.to_string();
    let title = fields.next()?.to_string();
    let uploader = fields.next()?.to_string();
    let duration: f64 = fields.next()?.trim().parse().ok()?;
    if id.is_empty() {
        return None;
    }
    Some(RawResult { id, title, uploader, duration })
}
