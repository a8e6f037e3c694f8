//! In-memory object store for tests and local dry runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::object::{CreatedObject, ObjectKind, RemoteObject};
use crate::object_store::{read_chunk, NewObject, ObjectStore, ProgressFn};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    meta: RemoteObject,
    data: Bytes,
}

/// Object store that keeps everything in a `Vec` behind a [`RwLock`].
///
/// Content is consumed chunk by chunk with a yield between chunks, so
/// progress reporting and cancellation behave like a real network backend.
/// Failures can be injected to exercise error paths.
#[derive(Debug)]
pub struct MemoryStore {
    objects: RwLock<Vec<StoredObject>>,
    next_id: AtomicU64,
    chunk_size: usize,
    chunk_delay: Option<Duration>,
    fail_list: AtomicBool,
    fail_delete: AtomicBool,
    fail_create: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: None,
            fail_list: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
        }
    }

    /// Create a store pre-populated with object metadata (content is empty).
    pub fn with_objects(objects: impl IntoIterator<Item = RemoteObject>) -> Self {
        let stored = objects
            .into_iter()
            .map(|meta| StoredObject {
                meta,
                data: Bytes::new(),
            })
            .collect();
        Self {
            objects: RwLock::new(stored),
            ..Self::new()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sleep between chunks, to keep uploads in flight long enough to observe.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Stored content for an object, if it exists.
    pub async fn content(&self, id: &str) -> Option<Bytes> {
        self.objects
            .read()
            .await
            .iter()
            .find(|o| o.meta.id == id)
            .map(|o| o.data.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<RemoteObject>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("list failure injected".to_string()));
        }
        Ok(self
            .objects
            .read()
            .await
            .iter()
            .map(|o| o.meta.clone())
            .collect())
    }

    async fn create(&self, object: NewObject, on_progress: ProgressFn) -> Result<CreatedObject> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("create failure injected".to_string()));
        }

        let total = object.total_size;
        let mut content = object.content;
        let mut data = BytesMut::new();

        loop {
            let chunk = read_chunk(&mut content, self.chunk_size).await?;
            if chunk.is_empty() {
                break;
            }
            data.extend_from_slice(&chunk);
            on_progress(data.len() as u64, total);

            match self.chunk_delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
        }
        if data.is_empty() {
            on_progress(0, total);
        }

        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let link = format!("memory://{}", id);
        let meta = RemoteObject {
            id: id.clone(),
            name: object.name,
            size: data.len() as u64,
            created_at: Utc::now().to_rfc3339(),
            link: link.clone(),
            kind: ObjectKind::File,
        };
        self.objects.write().await.push(StoredObject {
            meta,
            data: data.freeze(),
        });

        tracing::debug!(id = %id, "stored object in memory");
        Ok(CreatedObject { id, link })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("delete failure injected".to_string()));
        }
        let mut objects = self.objects.write().await;
        let before = objects.len();
        objects.retain(|o| o.meta.id != id);
        if objects.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
