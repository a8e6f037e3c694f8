use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::catalog::RemoteCatalog;
use common::events::EventBroadcaster;
use common::quota::QuotaEvictor;
use common::reconcile::StatusReconciler;
use common::upload::{UploadRegistry, Uploader};
use object_store::{ObjectStore, StoreError};

use super::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("failed to set up object store: {0}")]
    Store(#[from] StoreError),
}

/// Main service state: the handles every request works through.
///
/// Built once at startup; clones share the same registry, event bus and
/// store.
#[derive(Debug, Clone)]
pub struct State {
    config: Arc<Config>,
    store: Arc<dyn ObjectStore>,
    registry: UploadRegistry,
    events: EventBroadcaster,
    uploader: Uploader,
    reconciler: StatusReconciler,
    shutdown: CancellationToken,
}

impl State {
    pub fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let store = config.store.build()?;
        tracing::info!(store = store.name(), roots = ?config.roots, "service state ready");
        Ok(Self::with_store(config, store))
    }

    /// Build the state around an existing store.
    pub fn with_store(config: &Config, store: Arc<dyn ObjectStore>) -> Self {
        let catalog = RemoteCatalog::new(store.clone());
        let registry = UploadRegistry::new();
        let events = EventBroadcaster::default();
        let uploader = Uploader::new(
            store.clone(),
            QuotaEvictor::new(catalog.clone(), config.quota_limit),
            registry.clone(),
            events.clone(),
            config.folder_id.clone(),
        );
        let reconciler = StatusReconciler::new(config.roots.clone(), catalog, registry.clone());

        Self {
            config: Arc::new(config.clone()),
            store,
            registry,
            events,
            uploader,
            reconciler,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn registry(&self) -> &UploadRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    pub fn reconciler(&self) -> &StatusReconciler {
        &self.reconciler
    }

    /// Cancelled when the service shuts down. Uploads and push connections
    /// hang their own tokens off this one.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
