//! Merging local files, remote objects and uploads in flight into one listing

use std::path::PathBuf;

use object_store::{RemoteObject, StoreError};

use crate::catalog::{self, FileDescriptor, RemoteCatalog, ScanError};
use crate::upload::{UploadRegistry, UploadTask};

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("failed to scan local files: {0}")]
    Scan(#[from] ScanError),
    #[error("failed to list remote files: {0}")]
    Remote(#[from] StoreError),
}

/// Merge three snapshots into the listing clients see.
///
/// Local order is kept. Uploads in flight overlay their live progress onto
/// the local entry with the same path. Each remote object then marks the
/// first entry with the same name and size as uploaded, or is appended as a
/// remote-only entry keyed by its link.
///
/// Identity is only `(name, size)`: several remote copies of one file, or
/// several local files with the same name and size, collapse onto the first
/// matching row and the last remote object wins.
pub fn reconcile(
    local: Vec<FileDescriptor>,
    remote: &[RemoteObject],
    inflight: &[UploadTask],
) -> Vec<FileDescriptor> {
    let mut files = local;

    for task in inflight.iter().filter(|t| t.progress < 100.0) {
        if let Some(file) = files.iter_mut().find(|f| f.path == task.path) {
            file.size = task.total_size;
            file.progress = task.progress;
        }
    }

    for object in remote {
        match files
            .iter_mut()
            .find(|f| f.name == object.name && f.size == object.size)
        {
            Some(file) => file.mark_uploaded(object),
            None => files.push(FileDescriptor::remote(object)),
        }
    }

    files
}

/// Builds listings from the live catalogs and registry.
#[derive(Debug, Clone)]
pub struct StatusReconciler {
    roots: Vec<PathBuf>,
    catalog: RemoteCatalog,
    registry: UploadRegistry,
}

impl StatusReconciler {
    pub fn new(roots: Vec<PathBuf>, catalog: RemoteCatalog, registry: UploadRegistry) -> Self {
        Self {
            roots,
            catalog,
            registry,
        }
    }

    /// Scan and list remote in parallel; the first failure wins and the
    /// other fetch's result is thrown away.
    pub async fn list_files(&self) -> Result<Vec<FileDescriptor>, ListingError> {
        let (local, remote) = tokio::try_join!(
            async { catalog::scan(self.roots.clone()).await.map_err(ListingError::from) },
            async { self.catalog.list().await.map_err(ListingError::from) },
        )?;
        let inflight = self.registry.snapshot();
        tracing::debug!(
            local = local.len(),
            remote = remote.len(),
            inflight = inflight.len(),
            "reconciling listing"
        );
        Ok(reconcile(local, &remote, &inflight))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use object_store::{MemoryStore, ObjectKind};
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn object(id: &str, name: &str, size: u64) -> RemoteObject {
        RemoteObject {
            id: id.to_string(),
            name: name.to_string(),
            size,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            link: format!("https://drive/{}", id),
            kind: ObjectKind::File,
        }
    }

    fn task(path: &str, progress: f64) -> UploadTask {
        UploadTask {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap().to_string(),
            total_size: 7,
            progress,
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn test_local_file_matches_remote() {
        let local = vec![
            FileDescriptor::local("/a/x.txt", "x.txt", 3),
            FileDescriptor::local("/a/y.txt", "y.txt", 4),
        ];
        let remote = vec![object("R1", "x.txt", 3), object("R2", "z.txt", 9)];

        let files = reconcile(local, &remote, &[]);

        assert_eq!(files.len(), 3);
        assert_eq!(files[0].path, "/a/x.txt");
        assert_eq!(files[0].upload_id.as_deref(), Some("R1"));
        assert_eq!(files[0].link.as_deref(), Some("https://drive/R1"));
        assert_eq!(files[0].progress, 100.0);
        assert!(!files[1].is_uploaded());
        assert_eq!(files[2].path, "https://drive/R2");
        assert_eq!(files[2].upload_id.as_deref(), Some("R2"));
    }

    #[test]
    fn test_same_name_different_size_does_not_match() {
        let local = vec![FileDescriptor::local("/a/x.txt", "x.txt", 3)];
        let files = reconcile(local, &[object("R1", "x.txt", 4)], &[]);
        assert_eq!(files.len(), 2);
        assert!(!files[0].is_uploaded());
    }

    #[test]
    fn test_duplicate_uploads_share_one_row() {
        let local = vec![FileDescriptor::local("/a/x.txt", "x.txt", 3)];
        let remote = vec![object("R1", "x.txt", 3), object("R2", "x.txt", 3)];

        let files = reconcile(local, &remote, &[]);

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "/a/x.txt");
        assert_eq!(files[0].upload_id.as_deref(), Some("R2"));
        assert_eq!(files[0].link.as_deref(), Some("https://drive/R2"));
    }

    #[test]
    fn test_duplicate_remote_only_objects_share_one_row() {
        let remote = vec![object("R1", "x.txt", 3), object("R2", "x.txt", 3)];

        let files = reconcile(Vec::new(), &remote, &[]);

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "https://drive/R2");
        assert_eq!(files[0].upload_id.as_deref(), Some("R2"));
        assert_eq!(reconcile(files.clone(), &remote, &[]), files);
    }

    #[test]
    fn test_same_name_and_size_match_first_local_only() {
        let local = vec![
            FileDescriptor::local("/a/x.txt", "x.txt", 3),
            FileDescriptor::local("/b/x.txt", "x.txt", 3),
        ];

        let files = reconcile(local, &[object("R1", "x.txt", 3)], &[]);

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].upload_id.as_deref(), Some("R1"));
        assert!(!files[1].is_uploaded());
    }

    #[test]
    fn test_inflight_overlay() {
        let local = vec![
            FileDescriptor::local("/a/x.txt", "x.txt", 3),
            FileDescriptor::local("/a/y.txt", "y.txt", 4),
        ];
        let inflight = vec![
            task("/a/x.txt", 40.0),
            task("/gone/z.txt", 10.0),
            task("/a/y.txt", 100.0),
        ];

        let files = reconcile(local, &[], &inflight);

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].progress, 40.0);
        assert_eq!(files[0].size, 7);
        assert_eq!(files[1].progress, 0.0);
        assert_eq!(files[1].size, 4);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let local = vec![
            FileDescriptor::local("/a/x.txt", "x.txt", 3),
            FileDescriptor::local("/a/y.txt", "y.txt", 4),
        ];
        let remote = vec![object("R1", "x.txt", 3), object("R2", "z.txt", 9)];

        let once = reconcile(local.clone(), &remote, &[]);
        assert_eq!(once, reconcile(local, &remote, &[]));
        assert_eq!(reconcile(once.clone(), &remote, &[]), once);
    }

    #[tokio::test]
    async fn test_list_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"abc").unwrap();
        std::fs::write(dir.path().join("y.txt"), b"abcd").unwrap();
        let store = MemoryStore::with_objects([object("R1", "x.txt", 3)]);
        let reconciler = StatusReconciler::new(
            vec![dir.path().to_path_buf()],
            RemoteCatalog::new(Arc::new(store)),
            UploadRegistry::new(),
        );

        let files = reconciler.list_files().await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "x.txt");
        assert_eq!(files[0].upload_id.as_deref(), Some("R1"));
        assert_eq!(files[1].name, "y.txt");
    }

    #[tokio::test]
    async fn test_list_files_fails_fast() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.fail_list(true);
        let reconciler = StatusReconciler::new(
            vec![dir.path().to_path_buf()],
            RemoteCatalog::new(Arc::new(store)),
            UploadRegistry::new(),
        );
        let err = reconciler.list_files().await.unwrap_err();
        assert!(matches!(err, ListingError::Remote(_)));
    }

    #[tokio::test]
    async fn test_list_files_survives_unmounted_root() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"abc").unwrap();
        let reconciler = StatusReconciler::new(
            vec![dir.path().to_path_buf(), dir.path().join("unmounted")],
            RemoteCatalog::new(Arc::new(MemoryStore::new())),
            UploadRegistry::new(),
        );

        let files = reconciler.list_files().await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "x.txt");
    }
}
