use clap::Args;

use relay_daemon::build_info;
use relay_daemon::http_server::health::version::VersionRequest;

/// Show the client's version, and the daemon's if it is reachable
#[derive(Args, Debug, Clone)]
pub struct Version;

#[async_trait::async_trait]
impl crate::cli::op::Op for Version {
    type Error = std::convert::Infallible;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let daemon = match client.call(VersionRequest {}).await {
            Ok(info) => info.to_string(),
            Err(_) => "not reachable".to_string(),
        };
        Ok(format!("client: {}\ndaemon: {}", build_info(), daemon))
    }
}
