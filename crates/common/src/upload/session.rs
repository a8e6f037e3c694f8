use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use object_store::{CreatedObject, NewObject, ObjectStore, ProgressFn, StoreError};

use super::progress::UploadProgress;
use super::registry::{AlreadyUploading, RegistrySlot, UploadRegistry};
use super::sniff;
use crate::catalog::FileDescriptor;
use crate::events::{EventBroadcaster, RelayEvent};
use crate::quota::QuotaEvictor;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    AlreadyUploading(#[from] AlreadyUploading),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a regular file")]
    NotAFile { path: String },

    #[error("upload of {path} failed: {source}")]
    Remote {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("upload of {0} cancelled")]
    Cancelled(String),

    #[error("upload task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl UploadError {
    fn io(path: &str, source: std::io::Error) -> Self {
        UploadError::Io {
            path: path.to_string(),
            source,
        }
    }

    fn remote(path: &str, source: StoreError) -> Self {
        UploadError::Remote {
            path: path.to_string(),
            source,
        }
    }

    /// True when the failure is about a missing local file.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            UploadError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Result of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    /// Local source path
    pub path: String,
    pub id: String,
    pub link: String,
    pub name: String,
    pub size: u64,
}

impl CompletedUpload {
    /// The completion event payload. The remote link takes the place of the
    /// local path, matching how remote-only rows appear in listings.
    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor {
            path: self.link.clone(),
            name: self.name.clone(),
            size: self.size,
            upload_id: Some(self.id.clone()),
            progress: 100.0,
            link: Some(self.link.clone()),
        }
    }
}

/// A spawned upload.
#[derive(Debug)]
pub struct UploadHandle {
    path: String,
    cancel: CancellationToken,
    task: JoinHandle<Result<CompletedUpload, UploadError>>,
}

impl UploadHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the upload to finish. The outcome has already been published
    /// as an event by the time this returns.
    pub async fn wait(self) -> Result<CompletedUpload, UploadError> {
        self.task.await?
    }
}

/// Everything validated before the upload task is spawned.
struct PreparedUpload {
    path: String,
    name: String,
    size: u64,
    mime_type: String,
    file: File,
    slot: RegistrySlot,
    cancel: CancellationToken,
}

/// Starts uploads and drives them to completion.
#[derive(Debug, Clone)]
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    evictor: QuotaEvictor,
    registry: UploadRegistry,
    events: EventBroadcaster,
    folder_id: Option<String>,
}

impl Uploader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        evictor: QuotaEvictor,
        registry: UploadRegistry,
        events: EventBroadcaster,
        folder_id: Option<String>,
    ) -> Self {
        Self {
            store,
            evictor,
            registry,
            events,
            folder_id,
        }
    }

    /// Validate `path` and spawn its upload.
    ///
    /// Errors returned here have already been published as an error event;
    /// nothing was registered for them.
    pub async fn start(
        &self,
        path: &str,
        cancel: CancellationToken,
    ) -> Result<UploadHandle, UploadError> {
        match self.prepare(path, cancel).await {
            Ok(prepared) => {
                let cancel = prepared.cancel.clone();
                tracing::info!(
                    path = %prepared.path,
                    size = prepared.size,
                    mime_type = %prepared.mime_type,
                    "upload started"
                );
                let task = tokio::spawn(self.clone().run(prepared));
                Ok(UploadHandle {
                    path: path.to_string(),
                    cancel,
                    task,
                })
            }
            Err(err) => {
                tracing::warn!(path, "upload rejected: {err}");
                self.events.publish(RelayEvent::error(err.to_string()));
                Err(err)
            }
        }
    }

    async fn prepare(
        &self,
        path: &str,
        cancel: CancellationToken,
    ) -> Result<PreparedUpload, UploadError> {
        if self.registry.is_active(path) {
            return Err(AlreadyUploading(path.to_string()).into());
        }

        let source = PathBuf::from(path);
        let mut file = File::open(&source)
            .await
            .map_err(|e| UploadError::io(path, e))?;
        let metadata = file.metadata().await.map_err(|e| UploadError::io(path, e))?;
        if !metadata.is_file() {
            return Err(UploadError::NotAFile {
                path: path.to_string(),
            });
        }
        let mime_type = sniff::sniff_file(&mut file, &source)
            .await
            .map_err(|e| UploadError::io(path, e))?;
        let name = file_name(&source);
        let size = metadata.len();

        // Checked again here: another request may have won the race while
        // this one was sniffing.
        let slot = self.registry.reserve(path, &name, size, cancel.clone())?;

        Ok(PreparedUpload {
            path: path.to_string(),
            name,
            size,
            mime_type,
            file,
            slot,
            cancel,
        })
    }

    #[tracing::instrument(name = "upload", skip_all, fields(path = %upload.path))]
    async fn run(self, upload: PreparedUpload) -> Result<CompletedUpload, UploadError> {
        let PreparedUpload {
            path,
            name,
            size,
            mime_type,
            file,
            slot,
            cancel,
        } = upload;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UploadError::Cancelled(path.clone())),
            result = self.transfer(&path, &name, size, mime_type, file) => result,
        };
        // The transfer future, and the file it owned, are gone by now.
        drop(slot);

        match &result {
            Ok(done) => {
                tracing::info!(path = %path, id = %done.id, "upload completed");
                self.events.publish(RelayEvent::Completed(done.descriptor()));
            }
            Err(err) => {
                tracing::warn!(path = %path, "upload failed: {err}");
                self.events.publish(RelayEvent::error(err.to_string()));
            }
        }
        result
    }

    async fn transfer(
        &self,
        path: &str,
        name: &str,
        size: u64,
        mime_type: String,
        file: File,
    ) -> Result<CompletedUpload, UploadError> {
        let report = self
            .evictor
            .ensure_capacity(size)
            .await
            .map_err(|e| UploadError::remote(path, e))?;
        if !report.deleted.is_empty() {
            tracing::info!(
                path,
                evicted = report.deleted.len(),
                satisfied = report.satisfied,
                "made room for upload"
            );
        }

        let object = NewObject {
            name: name.to_string(),
            parent_id: self.folder_id.clone(),
            mime_type,
            total_size: size,
            content: Box::pin(file),
        };
        let CreatedObject { id, link } = self
            .store
            .create(object, self.progress_fn(path, name, size))
            .await
            .map_err(|e| UploadError::remote(path, e))?;

        Ok(CompletedUpload {
            path: path.to_string(),
            id,
            link,
            name: name.to_string(),
            size,
        })
    }

    fn progress_fn(&self, path: &str, name: &str, size: u64) -> ProgressFn {
        let registry = self.registry.clone();
        let events = self.events.clone();
        let path = path.to_string();
        let name = name.to_string();
        Arc::new(move |sent, total| {
            let percent = UploadProgress::new(sent, total).percent();
            tracing::debug!(sent, total, "chunk acknowledged");
            // The registry keeps the running maximum, so events never go back.
            if let Some(progress) = registry.update_progress(&path, percent) {
                events.publish(RelayEvent::Progress(FileDescriptor::uploading(
                    path.as_str(),
                    name.as_str(),
                    size,
                    progress,
                )));
            }
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use object_store::MemoryStore;

    use super::*;
    use crate::catalog::RemoteCatalog;

    fn uploader(store: Arc<MemoryStore>) -> Uploader {
        let store: Arc<dyn ObjectStore> = store;
        let evictor = QuotaEvictor::new(RemoteCatalog::new(store.clone()), 1_000_000);
        Uploader::new(
            store,
            evictor,
            UploadRegistry::new(),
            EventBroadcaster::default(),
            Some("folder".to_string()),
        )
    }

    #[test]
    fn test_completion_descriptor() {
        let done = CompletedUpload {
            path: "/a/x.txt".to_string(),
            id: "R1".to_string(),
            link: "https://drive/R1".to_string(),
            name: "x.txt".to_string(),
            size: 3,
        };
        let file = done.descriptor();
        assert_eq!(file.path, "https://drive/R1");
        assert_eq!(file.upload_id.as_deref(), Some("R1"));
        assert_eq!(file.progress, 100.0);
    }

    #[tokio::test]
    async fn test_directory_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let uploader = uploader(Arc::new(MemoryStore::new()));
        let path = dir.path().to_string_lossy().into_owned();

        let err = uploader
            .start(&path, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotAFile { .. }));
        assert!(uploader.registry.is_empty());
    }

    #[tokio::test]
    async fn test_upload_stores_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"hello").unwrap();
        let store = Arc::new(MemoryStore::new());
        let uploader = uploader(store.clone());

        let handle = uploader
            .start(&path.to_string_lossy(), CancellationToken::new())
            .await
            .unwrap();
        let done = handle.wait().await.unwrap();

        assert_eq!(done.name, "x.txt");
        assert_eq!(done.size, 5);
        assert_eq!(&store.content(&done.id).await.unwrap()[..], b"hello");
        assert!(uploader.registry.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_releases_slot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"hello").unwrap();
        let store = Arc::new(MemoryStore::new());
        store.fail_create(true);
        let uploader = uploader(store);

        let handle = uploader
            .start(&path.to_string_lossy(), CancellationToken::new())
            .await
            .unwrap();
        let err = handle.wait().await.unwrap_err();

        assert!(matches!(err, UploadError::Remote { .. }));
        assert!(uploader.registry.is_empty());
    }
}
