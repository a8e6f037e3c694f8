//! Local and remote file catalogs
//!
//! Both catalogs produce plain snapshots; nothing here is cached between
//! listings.

mod descriptor;
mod local;
mod remote;

pub use descriptor::FileDescriptor;
pub use local::{scan, scan_blocking, ScanError};
pub use remote::RemoteCatalog;
