pub mod cancel;
pub mod daemon;
pub mod health;
pub mod ls;
pub mod rm;
pub mod upload;
pub mod version;

pub use cancel::Cancel;
pub use daemon::Daemon;
pub use health::Health;
pub use ls::Ls;
pub use rm::Rm;
pub use upload::Upload;
pub use version::Version;
