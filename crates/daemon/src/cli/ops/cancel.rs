use clap::Args;

use relay_daemon::http_server::api::client::ApiError;
use relay_daemon::http_server::api::{CancelUploadRequest, CancelUploadResponse};

/// Cancel an upload in progress
#[derive(Args, Debug, Clone)]
pub struct Cancel {
    /// Path the upload was started with
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CancelError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Cancel {
    type Error = CancelError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: CancelUploadResponse = client
            .call(CancelUploadRequest {
                path: self.path.clone(),
            })
            .await?;
        Ok(format!("cancelled upload of {}", response.path))
    }
}
