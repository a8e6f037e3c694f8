use clap::Args;

use relay_daemon::config::ConfigArgs;
use relay_daemon::{spawn_service, ConfigError, ServiceConfig, ServiceError};

/// Run the relay service in the foreground
#[derive(Args, Debug, Clone)]
pub struct Daemon {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("daemon failed: {0}")]
    Service(#[from] ServiceError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ServiceConfig::try_from(self.config.clone())?;
        spawn_service(&config).await?;
        Ok("daemon ended".to_string())
    }
}
