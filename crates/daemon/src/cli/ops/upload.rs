use std::path::PathBuf;

use clap::Args;

use relay_daemon::http_server::api::client::ApiError;
use relay_daemon::http_server::api::{UploadRequest, UploadResponse};

/// Start uploading a local file; follow progress with `relay ls`
#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// Path of the file, as the daemon sees it
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = UploadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        // Relative paths are resolved here; the daemon's working directory may differ
        let path = std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone());
        let response: UploadResponse = client
            .call(UploadRequest {
                path: path.to_string_lossy().into_owned(),
            })
            .await?;
        Ok(response.message)
    }
}
