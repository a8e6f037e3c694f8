//! Remote object storage for the upload relay.
//!
//! The relay only needs three things from a remote store: list what is
//! there, create a new object from a byte stream while reporting progress,
//! and delete an object by id. [`ObjectStore`] captures exactly that, and
//! two backends implement it:
//!
//! - [`DriveStore`]: Google Drive v3 over HTTPS, using resumable uploads
//! - [`MemoryStore`]: an in-process map, used by tests and dry runs

mod drive;
mod error;
mod memory;
mod object;
mod object_store;

pub use drive::{DriveStore, DEFAULT_CHUNK_SIZE, DRIVE_API_BASE};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use object::{CreatedObject, ObjectKind, RemoteObject, FOLDER_MIME_TYPE};
pub use object_store::{BoxReader, NewObject, ObjectStore, ProgressFn, StoreConfig};
