use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, ValueEnum};
use url::Url;

use common::quota::DEFAULT_QUOTA_LIMIT;
use object_store::StoreConfig;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreKind {
    /// Google Drive
    #[default]
    Drive,
    /// Process memory; nothing survives a restart
    Memory,
}

/// Service settings as given on the command line or in the environment.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Address the HTTP server binds to
    #[arg(long, env = "RELAY_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Comma-separated list of directories to offer for upload
    #[arg(long, env = "ROOT")]
    pub root: String,

    /// Remote folder that uploads land in
    #[arg(long, env = "FOLDER_ID")]
    pub folder_id: Option<String>,

    /// Quota in bytes; the oldest uploads are deleted to stay under it
    #[arg(long, env = "QUOTA_LIMIT", default_value_t = DEFAULT_QUOTA_LIMIT)]
    pub quota_limit: u64,

    /// Object store backend
    #[arg(long, env = "RELAY_STORE", value_enum, default_value_t = StoreKind::Drive)]
    pub store: StoreKind,

    /// OAuth bearer token for the Drive API
    #[arg(long, env = "DRIVE_ACCESS_TOKEN", hide_env_values = true)]
    pub drive_token: Option<String>,

    /// Override the Drive API host
    #[arg(long, env = "DRIVE_API_BASE")]
    pub drive_api_base: Option<Url>,

    /// Directory of static files served for unmatched routes
    #[arg(long, env = "RELAY_WEB_DIR")]
    pub web_dir: Option<PathBuf>,

    /// Default log level; RUST_LOG takes precedence
    #[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no upload roots configured (set --root or ROOT)")]
    NoRoots,
    #[error("the drive store needs an access token (set --drive-token or DRIVE_ACCESS_TOKEN)")]
    MissingDriveToken,
    #[error("quota limit must be greater than zero")]
    ZeroQuota,
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("web directory {} does not exist", .0.display())]
    WebDirNotFound(PathBuf),
}

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Directories scanned for local files, in listing order
    pub roots: Vec<PathBuf>,
    pub folder_id: Option<String>,
    pub quota_limit: u64,
    pub store: StoreConfig,
    pub web_dir: Option<PathBuf>,
    pub log_level: tracing::Level,
}

impl Config {
    /// A config for tests and embedding: in-memory store, ephemeral port.
    pub fn in_memory(roots: Vec<PathBuf>) -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            roots,
            folder_id: None,
            quota_limit: DEFAULT_QUOTA_LIMIT,
            store: StoreConfig::Memory,
            web_dir: None,
            log_level: tracing::Level::INFO,
        }
    }
}

impl TryFrom<ConfigArgs> for Config {
    type Error = ConfigError;

    fn try_from(args: ConfigArgs) -> Result<Self, Self::Error> {
        let roots = parse_roots(&args.root);
        if roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }
        if args.quota_limit == 0 {
            return Err(ConfigError::ZeroQuota);
        }

        let store = match args.store {
            StoreKind::Drive => {
                let access_token = args
                    .drive_token
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(ConfigError::MissingDriveToken)?;
                StoreConfig::Drive {
                    access_token,
                    api_base: args.drive_api_base,
                }
            }
            StoreKind::Memory => StoreConfig::Memory,
        };

        if let Some(dir) = &args.web_dir {
            if !dir.is_dir() {
                return Err(ConfigError::WebDirNotFound(dir.clone()));
            }
        }

        let log_level = tracing::Level::from_str(&args.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(args.log_level.clone()))?;

        Ok(Self {
            listen_addr: args.listen_addr,
            roots,
            folder_id: args.folder_id.filter(|id| !id.is_empty()),
            quota_limit: args.quota_limit,
            store,
            web_dir: args.web_dir,
            log_level,
        })
    }
}

/// Split a comma-separated root list, dropping empty entries.
pub fn parse_roots(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(PathBuf::from)
        .collect()
}
