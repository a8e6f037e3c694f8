use std::sync::Arc;

use object_store::{ObjectStore, RemoteObject, StoreError};

/// Read-only view of what has already been uploaded.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    store: Arc<dyn ObjectStore>,
}

impl RemoteCatalog {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Every uploaded object, folders excluded.
    pub async fn list(&self) -> Result<Vec<RemoteObject>, StoreError> {
        let objects = self.store.list().await?;
        Ok(objects.into_iter().filter(|o| !o.is_folder()).collect())
    }

    /// Bytes currently counted against the quota.
    pub async fn consumed(&self) -> Result<u64, StoreError> {
        Ok(self.list().await?.iter().map(|o| o.size).sum())
    }
}

#[cfg(test)]
mod tests {
    use object_store::{MemoryStore, ObjectKind};

    use super::*;

    fn object(id: &str, size: u64, kind: ObjectKind) -> RemoteObject {
        RemoteObject {
            id: id.to_string(),
            name: id.to_string(),
            size,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            link: format!("memory://{}", id),
            kind,
        }
    }

    #[tokio::test]
    async fn test_list_filters_folders() {
        let store = MemoryStore::with_objects([
            object("a", 10, ObjectKind::File),
            object("dir", 0, ObjectKind::Folder),
            object("b", 5, ObjectKind::File),
        ]);
        let catalog = RemoteCatalog::new(Arc::new(store));

        let ids: Vec<String> = catalog
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(catalog.consumed().await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_list_propagates_store_errors() {
        let store = Arc::new(MemoryStore::new());
        store.fail_list(true);
        let catalog = RemoteCatalog::new(store);
        assert!(catalog.list().await.is_err());
    }
}
