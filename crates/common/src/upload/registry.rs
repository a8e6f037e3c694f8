use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// An upload in flight.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub path: String,
    pub name: String,
    pub total_size: u64,
    /// Percentage, 0 to 100, never decreasing
    pub progress: f64,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("an upload of {0} is already in progress")]
pub struct AlreadyUploading(pub String);

/// Table of active uploads keyed by local path.
///
/// Listings read it while upload tasks write to it; every access goes
/// through one mutex that is never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct UploadRegistry {
    tasks: Arc<Mutex<HashMap<String, UploadTask>>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path` for a new upload.
    ///
    /// The claim lasts as long as the returned slot; dropping it removes
    /// the task.
    pub fn reserve(
        &self,
        path: &str,
        name: &str,
        total_size: u64,
        cancel: CancellationToken,
    ) -> Result<RegistrySlot, AlreadyUploading> {
        let mut tasks = self.tasks.lock();
        match tasks.entry(path.to_string()) {
            Entry::Occupied(_) => Err(AlreadyUploading(path.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(UploadTask {
                    path: path.to_string(),
                    name: name.to_string(),
                    total_size,
                    progress: 0.0,
                    cancel,
                });
                Ok(RegistrySlot {
                    registry: self.clone(),
                    path: path.to_string(),
                })
            }
        }
    }

    /// Record progress for an active upload.
    ///
    /// Progress never moves backwards; the stored (possibly unchanged)
    /// value is returned, or `None` if no upload is active for `path`.
    pub fn update_progress(&self, path: &str, progress: f64) -> Option<f64> {
        let mut tasks = self.tasks.lock();
        let task = tasks.get_mut(path)?;
        task.progress = task.progress.max(progress.clamp(0.0, 100.0));
        Some(task.progress)
    }

    pub fn is_active(&self, path: &str) -> bool {
        self.tasks.lock().contains_key(path)
    }

    /// All active uploads, ordered by path.
    pub fn snapshot(&self) -> Vec<UploadTask> {
        let mut tasks: Vec<UploadTask> = self.tasks.lock().values().cloned().collect();
        tasks.sort_by(|a, b| a.path.cmp(&b.path));
        tasks
    }

    /// Ask the upload for `path` to stop. Returns false if none is active.
    pub fn cancel(&self, path: &str) -> bool {
        match self.tasks.lock().get(path) {
            Some(task) => {
                task.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for task in self.tasks.lock().values() {
            task.cancel.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    fn remove(&self, path: &str) {
        self.tasks.lock().remove(path);
    }
}

/// Ownership of one registry entry; removes it on drop.
#[derive(Debug)]
pub struct RegistrySlot {
    registry: UploadRegistry,
    path: String,
}

impl Drop for RegistrySlot {
    fn drop(&mut self) {
        self.registry.remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_task_per_path() {
        let registry = UploadRegistry::new();
        let slot = registry
            .reserve("/a/x", "x", 10, CancellationToken::new())
            .unwrap();

        let second = registry.reserve("/a/x", "x", 10, CancellationToken::new());
        assert_eq!(second.unwrap_err(), AlreadyUploading("/a/x".to_string()));
        assert_eq!(registry.len(), 1);

        drop(slot);
        assert!(registry.is_empty());
        assert!(registry
            .reserve("/a/x", "x", 10, CancellationToken::new())
            .is_ok());
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let registry = UploadRegistry::new();
        let _slot = registry
            .reserve("/a/x", "x", 10, CancellationToken::new())
            .unwrap();

        assert_eq!(registry.update_progress("/a/x", 40.0), Some(40.0));
        assert_eq!(registry.update_progress("/a/x", 20.0), Some(40.0));
        assert_eq!(registry.update_progress("/a/x", 250.0), Some(100.0));
        assert_eq!(registry.update_progress("/other", 10.0), None);
        assert_eq!(registry.snapshot()[0].progress, 100.0);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let registry = UploadRegistry::new();
        let _b = registry.reserve("/b", "b", 1, CancellationToken::new()).unwrap();
        let _a = registry.reserve("/a", "a", 1, CancellationToken::new()).unwrap();

        let paths: Vec<String> = registry.snapshot().into_iter().map(|t| t.path).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn test_cancel_trips_token() {
        let registry = UploadRegistry::new();
        let token = CancellationToken::new();
        let _slot = registry.reserve("/a", "a", 1, token.clone()).unwrap();

        assert!(registry.cancel("/a"));
        assert!(token.is_cancelled());
        assert!(!registry.cancel("/missing"));
    }

    #[test]
    fn test_clones_share_state() {
        let registry = UploadRegistry::new();
        let other = registry.clone();
        let _slot = registry.reserve("/a", "a", 1, CancellationToken::new()).unwrap();
        assert!(other.is_active("/a"));
    }
}
