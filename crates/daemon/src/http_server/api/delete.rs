use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use object_store::StoreError;

use super::client::{endpoint, ApiRequest};
use super::error_response;
use crate::ServiceState;

/// Delete one uploaded object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub upload_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub upload_id: String,
}

impl ApiRequest for DeleteRequest {
    type Response = DeleteResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .delete(endpoint(base_url, "/delete"))
            .query(&[("upload_id", self.upload_id)])
    }
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Query(request): Query<DeleteRequest>,
) -> Result<impl IntoResponse, DeleteError> {
    state.store().delete(&request.upload_id).await?;
    tracing::info!(id = %request.upload_id, "deleted remote object");
    Ok((
        StatusCode::OK,
        Json(DeleteResponse {
            upload_id: request.upload_id,
        }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for DeleteError {
    fn into_response(self) -> Response {
        tracing::error!("delete failed: {self}");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self)
    }
}
