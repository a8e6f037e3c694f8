use clap::Args;

use relay_daemon::http_server::api::client::ApiError;
use relay_daemon::http_server::api::{DeleteRequest, DeleteResponse};

/// Delete an uploaded file from the remote store
#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// Remote id, as shown by `relay ls`
    pub upload_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: DeleteResponse = client
            .call(DeleteRequest {
                upload_id: self.upload_id.clone(),
            })
            .await?;
        Ok(format!("deleted {}", response.upload_id))
    }
}
