use std::collections::HashSet;
use std::path::Path;

use scuttle_catalog::Catalog;

/// Boot-time orphan sweep: removes every file in `download_dir` whose
/// stem is not present in the catalog's downloads set. Logged per file,
/// never fails the caller — a single bad entry is skipped and logged, not
/// propagated.
pub async fn cleanup_download_folder(catalog: &Catalog, download_dir: &Path) {
    if !download_dir.exists() {
        tracing::warn!(dir = %download_dir.display(), "downloads directory does not exist, skipping cleanup");
        return;
    }

    let valid_ids: HashSet<String> = match catalog.get_downloads_content().await {
        Ok(tracks) => tracks.into_iter().map(|t| t.id).collect(),
        Err(e) => {
            tracing::error!(error = %e, "failed to retrieve download list, skipping cleanup");
            return;
        }
    };

    let mut entries = match tokio::fs::read_dir(download_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, dir = %download_dir.display(), "failed to read downloads directory");
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "error while walking downloads directory");
                break;
            }
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };

        if !valid_ids.contains(stem) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::info!(file = %path.display(), "removed orphaned download file"),
                Err(e) => tracing::warn!(error = %e, file = %path.display(), "failed to remove orphaned file"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_files_not_in_catalog_and_keeps_the_rest() {
        let db_dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&db_dir.path().join("audio.db"), None).unwrap();
        catalog.build_schema().await.unwrap();

        let track = scuttle_catalog::Track {
            id: "keep_me".to_string(),
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            duration: 1.0,
            title_display: None,
            artist_display: None,
        };
        catalog.register_track(&track).await.unwrap();
        catalog.register_download(&track.id).await.unwrap();

        let downloads_dir = tempfile::tempdir().unwrap();
        std::fs::write(downloads_dir.path().join("keep_me.opus"), b"x").unwrap();
        std::fs::write(downloads_dir.path().join("orphan.opus"), b"x").unwrap();

        cleanup_download_folder(&catalog, downloads_dir.path()).await;

        assert!(downloads_dir.path().join("keep_me.opus").exists());
        assert!(!downloads_dir.path().join("orphan.opus").exists());
    }

    #[tokio::test]
    async fn missing_directory_is_a_no_op() {
        let db_dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&db_dir.path().join("audio.db"), None).unwrap();
        catalog.build_schema().await.unwrap();

        cleanup_download_folder(&catalog, std::path::Path::new("/nonexistent/path/for/sure")).await;
    }
}
