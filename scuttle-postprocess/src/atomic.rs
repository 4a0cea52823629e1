use std::path::{Path, PathBuf};

use crate::error::Result;

/// `foo.mp3` -> `foo.tmp.mp3`, preserving the extension the transform writes.
pub fn temp_path(input: &Path) -> PathBuf {
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("");
    let stem = input.with_extension("");
    if ext.is_empty() {
        stem.with_extension("tmp")
    } else {
        stem.with_extension(format!("tmp.{ext}"))
    }
}

/// Atomically replaces `input` with `temp`: remove the original, then rename the
/// temp file into place. A transform failure before this point leaves `input`
/// untouched.
pub async fn replace_file(input: &Path, temp: &Path) -> Result<()> {
    tokio::fs::remove_file(input).await?;
    tokio::fs::rename(temp, input).await?;
    Ok(())
}
