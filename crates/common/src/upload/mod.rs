//! Uploads: one task per file, tracked in a shared registry
//!
//! [`Uploader::start`] validates the source file, claims the path in the
//! [`UploadRegistry`] and spawns a task that evicts old objects, streams the
//! file to the store and publishes progress. The registry slot is released
//! on every exit path, so at most one upload per path is ever active.

mod progress;
mod registry;
mod session;
pub mod sniff;

pub use progress::UploadProgress;
pub use registry::{AlreadyUploading, RegistrySlot, UploadRegistry, UploadTask};
pub use session::{CompletedUpload, UploadError, UploadHandle, Uploader};
