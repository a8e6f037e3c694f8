//! Storage quota enforcement
//!
//! Before an upload starts, the evictor checks whether the remote folder can
//! take `pending` more bytes and deletes the oldest objects until it can.
//! Running out of candidates before the quota is met is logged, not failed:
//! the upload is still attempted and the store gets the final say.

use std::cmp::Ordering;

use object_store::{RemoteObject, StoreError};

use crate::catalog::RemoteCatalog;

/// Default quota: 5 GB.
pub const DEFAULT_QUOTA_LIMIT: u64 = 5_000_000_000;

/// Outcome of one [`QuotaEvictor::ensure_capacity`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionReport {
    pub consumed_before: u64,
    pub consumed_after: u64,
    /// Ids of deleted objects, in deletion order
    pub deleted: Vec<String>,
    /// Whether `consumed_after + pending` is under the limit
    pub satisfied: bool,
}

#[derive(Debug, Clone)]
pub struct QuotaEvictor {
    catalog: RemoteCatalog,
    limit: u64,
}

impl QuotaEvictor {
    pub fn new(catalog: RemoteCatalog, limit: u64) -> Self {
        Self { catalog, limit }
    }

    fn fits(&self, consumed: u64, pending: u64) -> bool {
        consumed.saturating_add(pending) < self.limit
    }

    /// Make room for `pending` bytes by deleting the oldest remote objects.
    ///
    /// A failed deletion aborts the pass; objects deleted before it stay
    /// deleted.
    pub async fn ensure_capacity(&self, pending: u64) -> Result<EvictionReport, StoreError> {
        let objects = self.catalog.list().await?;
        let consumed_before: u64 = objects.iter().map(|o| o.size).sum();
        let mut consumed = consumed_before;
        let mut deleted = Vec::new();

        if self.fits(consumed, pending) {
            return Ok(EvictionReport {
                consumed_before,
                consumed_after: consumed,
                deleted,
                satisfied: true,
            });
        }

        tracing::info!(
            consumed,
            pending,
            limit = self.limit,
            "quota would be exceeded, evicting oldest objects"
        );

        let mut satisfied = false;
        for object in eviction_order(objects) {
            if let Err(err) = self.catalog.store().delete(&object.id).await {
                tracing::error!(
                    id = %object.id,
                    evicted = deleted.len(),
                    "eviction aborted: {err}"
                );
                return Err(err);
            }
            consumed = consumed.saturating_sub(object.size);
            tracing::info!(id = %object.id, name = %object.name, size = object.size, "evicted");
            deleted.push(object.id);

            if self.fits(consumed, pending) {
                satisfied = true;
                break;
            }
        }

        if !satisfied {
            tracing::warn!(
                consumed,
                pending,
                limit = self.limit,
                "no eviction candidates left, quota still exceeded"
            );
        }

        Ok(EvictionReport {
            consumed_before,
            consumed_after: consumed,
            deleted,
            satisfied,
        })
    }
}

/// Oldest first. Objects without a readable creation time go last, so they
/// are only evicted once every dated object is gone.
pub fn eviction_order(mut objects: Vec<RemoteObject>) -> Vec<RemoteObject> {
    objects.sort_by(|a, b| match (a.created_time(), b.created_time()) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    objects
}
