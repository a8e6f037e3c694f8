//! The `ObjectStore` abstraction and backend selection.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use url::Url;

use crate::drive::DriveStore;
use crate::error::{Result, StoreError};
use crate::memory::MemoryStore;
use crate::object::{CreatedObject, RemoteObject};

/// Content source for a new object.
pub type BoxReader = Pin<Box<dyn AsyncRead + Send>>;

/// Progress callback: `(bytes_sent, total_bytes)`.
///
/// Called by the backend after every chunk the remote side acknowledged.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Everything a backend needs to create one object.
pub struct NewObject {
    pub name: String,
    /// Destination folder; `None` puts the object in the store's root
    pub parent_id: Option<String>,
    pub mime_type: String,
    pub total_size: u64,
    pub content: BoxReader,
}

impl std::fmt::Debug for NewObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewObject")
            .field("name", &self.name)
            .field("parent_id", &self.parent_id)
            .field("mime_type", &self.mime_type)
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}

/// A remote store the relay uploads into.
///
/// Implementations must be safe to share between tasks: listing, creating
/// and deleting may all happen concurrently.
#[async_trait]
pub trait ObjectStore: std::fmt::Debug + Send + Sync {
    /// Backend name, used for logging.
    fn name(&self) -> &str;

    /// List every object visible to the relay, folders included.
    async fn list(&self) -> Result<Vec<RemoteObject>>;

    /// Stream `object.content` into a new remote object.
    ///
    /// Dropping the returned future aborts the upload and releases the
    /// content reader.
    async fn create(&self, object: NewObject, on_progress: ProgressFn) -> Result<CreatedObject>;

    /// Delete one object by id.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Which backend to build at startup.
#[derive(Clone)]
pub enum StoreConfig {
    /// Google Drive v3 with a pre-issued OAuth bearer token
    Drive {
        access_token: String,
        /// Override for the API host, e.g. for a local emulator
        api_base: Option<Url>,
    },
    /// Keep everything in process memory
    Memory,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Drive { api_base, .. } => f
                .debug_struct("Drive")
                .field("access_token", &"<redacted>")
                .field("api_base", api_base)
                .finish(),
            StoreConfig::Memory => f.write_str("Memory"),
        }
    }
}

impl StoreConfig {
    pub fn build(&self) -> Result<Arc<dyn ObjectStore>> {
        match self {
            StoreConfig::Drive {
                access_token,
                api_base,
            } => {
                if access_token.trim().is_empty() {
                    return Err(StoreError::Config(
                        "drive backend requires an access token".to_string(),
                    ));
                }
                let store = match api_base {
                    Some(base) => DriveStore::with_api_base(access_token, base.clone())?,
                    None => DriveStore::new(access_token)?,
                };
                tracing::info!(api_base = %store.api_base(), "using drive object store");
                Ok(Arc::new(store))
            }
            StoreConfig::Memory => {
                tracing::warn!("using in-memory object store, uploads are not persisted");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

/// Read up to `size` bytes, stopping early only at end of input.
pub(crate) async fn read_chunk(reader: &mut BoxReader, size: usize) -> std::io::Result<Bytes> {
    let mut buf = vec![0u8; size];
    let mut filled = 0;
    while filled < size {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_chunk_splits_input() {
        let mut reader: BoxReader = Box::pin(&b"hello world"[..]);

        let first = read_chunk(&mut reader, 4).await.unwrap();
        let second = read_chunk(&mut reader, 4).await.unwrap();
        let third = read_chunk(&mut reader, 4).await.unwrap();
        let done = read_chunk(&mut reader, 4).await.unwrap();

        assert_eq!(&first[..], b"hell");
        assert_eq!(&second[..], b"o wo");
        assert_eq!(&third[..], b"rld");
        assert!(done.is_empty());
    }

    #[test]
    fn test_drive_config_requires_token() {
        let config = StoreConfig::Drive {
            access_token: "  ".to_string(),
            api_base: None,
        };
        assert!(matches!(config.build(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_memory_config_builds() {
        let store = StoreConfig::Memory.build().unwrap();
        assert_eq!(store.name(), "memory");
    }
}
