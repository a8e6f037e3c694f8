use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::client::{endpoint, ApiRequest};
use super::error_response;
use crate::ServiceState;

/// Cancel the active upload of a local file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelUploadRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelUploadResponse {
    pub path: String,
}

impl ApiRequest for CancelUploadRequest {
    type Response = CancelUploadResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .delete(endpoint(base_url, "/upload"))
            .query(&[("path", self.path)])
    }
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Query(request): Query<CancelUploadRequest>,
) -> Result<impl IntoResponse, CancelUploadError> {
    if !state.registry().cancel(&request.path) {
        return Err(CancelUploadError::NotActive(request.path));
    }
    tracing::info!(path = %request.path, "upload cancellation requested");
    Ok((
        StatusCode::OK,
        Json(CancelUploadResponse { path: request.path }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum CancelUploadError {
    #[error("no upload of {0} is in progress")]
    NotActive(String),
}

impl IntoResponse for CancelUploadError {
    fn into_response(self) -> Response {
        error_response(StatusCode::NOT_FOUND, self)
    }
}
