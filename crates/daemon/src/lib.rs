// Service modules
pub mod config;
pub mod http_server;
pub mod process;
pub mod state;
pub mod version;

pub use config::{Config as ServiceConfig, ConfigError, StoreKind};
pub use process::{spawn_service, start_service, ServiceError, ShutdownHandle};
pub use state::State as ServiceState;
pub use version::BuildInfo;

/// Build info for this binary.
pub fn build_info() -> BuildInfo {
    BuildInfo::new()
}
