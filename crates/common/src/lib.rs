//! Core of the upload relay.
//!
//! Three independently arriving views of file state feed one listing:
//!
//! - [`catalog`]: local files under the configured roots, and the remote
//!   objects already in the store
//! - [`upload`]: uploads in flight, tracked in an [`upload::UploadRegistry`]
//! - [`reconcile`]: merges the three views into one ordered list
//!
//! Uploads run one task each, make room with the [`quota::QuotaEvictor`]
//! first, and report through the [`events::EventBroadcaster`].

pub mod catalog;
pub mod events;
pub mod quota;
pub mod reconcile;
pub mod upload;

pub use object_store;
