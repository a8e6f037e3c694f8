use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use relay_daemon::http_server::api::client::ApiError;
use relay_daemon::http_server::health::liveness::LivezRequest;
use relay_daemon::http_server::health::readiness::ReadyzRequest;

/// Check whether the daemon is up and can reach its store
#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug)]
pub enum EndpointStatus {
    Ok,
    Unhealthy(String),
    NotReachable,
}

impl EndpointStatus {
    fn from_result<T>(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(_) => EndpointStatus::Ok,
            Err(ApiError::HttpStatus(status, message)) => {
                EndpointStatus::Unhealthy(format!("{status}: {message}"))
            }
            Err(_) => EndpointStatus::NotReachable,
        }
    }
}

#[derive(Debug)]
pub struct HealthOutput {
    pub url: String,
    pub livez: EndpointStatus,
    pub readyz: EndpointStatus,
}

impl fmt::Display for HealthOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}):", "Daemon".bold(), self.url)?;

        let status_str = |s: &EndpointStatus| -> String {
            match s {
                EndpointStatus::Ok => "OK".green().to_string(),
                EndpointStatus::Unhealthy(reason) => format!("{} ({})", "UNHEALTHY".red(), reason),
                EndpointStatus::NotReachable => "NOT REACHABLE".red().to_string(),
            }
        };

        writeln!(f, "  {} {}", "livez:".dimmed(), status_str(&self.livez))?;
        write!(f, "  {} {}", "readyz:".dimmed(), status_str(&self.readyz))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = std::convert::Infallible;
    type Output = HealthOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let livez = EndpointStatus::from_result(client.call(LivezRequest {}).await);
        let readyz = EndpointStatus::from_result(client.call(ReadyzRequest {}).await);

        Ok(HealthOutput {
            url: ctx.client.base_url().to_string(),
            livez,
            readyz,
        })
    }
}
