use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::FileDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Enumerate the regular files under `roots` on the blocking pool.
pub async fn scan(roots: Vec<PathBuf>) -> Result<Vec<FileDescriptor>, ScanError> {
    tokio::task::spawn_blocking(move || scan_blocking(&roots)).await?
}

/// Enumerate the regular files under `roots`.
///
/// Roots are walked in order, each depth-first with siblings sorted by
/// name. Hidden entries (name starting with `.`) are skipped, and hidden
/// directories are not descended into. Entries that cannot be read are
/// logged and skipped, and so are whole roots that are missing or
/// unmounted. Overlapping roots yield duplicate entries.
pub fn scan_blocking<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<FileDescriptor>, ScanError> {
    let mut files = Vec::new();

    for root in roots {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            continue;
        }
        if let Err(err) = std::fs::metadata(root) {
            tracing::warn!(root = %root.display(), "skipping unreadable root: {err}");
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(root = %root.display(), "skipping unreadable entry: {err}");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            // Follow symlinks for the size, and drop links to directories
            let metadata = match std::fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), "skipping entry: {err}");
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }
            let Some(path) = entry.path().to_str() else {
                tracing::warn!(path = %entry.path().display(), "skipping non utf-8 path");
                continue;
            };
            let name = entry.file_name().to_string_lossy();
            files.push(FileDescriptor::local(path, name, metadata.len()));
        }
    }

    tracing::debug!(count = files.len(), "scanned local roots");
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
