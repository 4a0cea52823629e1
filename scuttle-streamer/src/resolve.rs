use std::path::{Path, PathBuf};

/// Extension probe order for `<download_dir>/<id>.<ext>`. `wav` is tried
/// first since it is the fetcher's raw pre-compression output, `opus`/`mp3`
/// are the post-processor's compressed targets.
pub const EXTENSION_PRIORITY: &[&str] = &["wav", "opus", "mp3"];

/// Finds the on-disk audio file for `id`, probing `EXTENSION_PRIORITY` in
/// order. Returns `None` if none of the candidate paths exist.
pub fn resolve_audio_path(download_dir: &Path, id: &str) -> Option<PathBuf> {
    EXTENSION_PRIORITY.iter().map(|ext| download_dir.join(format!("{id}.{ext}"))).find(|path| path.exists())
}

/// Best-effort MIME type for a resolved audio path, used as the
/// `Content-Type` response header. Falls back to `application/octet-stream`
/// for anything outside `EXTENSION_PRIORITY`.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        Some("opus") => "audio/opus",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}
