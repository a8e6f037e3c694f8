use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::upload::UploadError;

use super::client::{endpoint, ApiRequest};
use super::error_response;
use crate::ServiceState;

/// Start uploading one local file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
}

impl ApiRequest for UploadRequest {
    type Response = UploadResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .get(endpoint(base_url, "/upload"))
            .query(&[("path", self.path)])
    }
}

/// Answers as soon as the upload is running; progress and the outcome go
/// out on the push channel.
#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Query(request): Query<UploadRequest>,
) -> Result<impl IntoResponse, StartUploadError> {
    // Tied to the service, not the request: the response goes out right away
    let cancel = state.shutdown_token().child_token();
    let handle = state.uploader().start(&request.path, cancel).await?;

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            message: format!("upload of {} started", handle.path()),
        }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum StartUploadError {
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl IntoResponse for StartUploadError {
    fn into_response(self) -> Response {
        let StartUploadError::Upload(err) = &self;
        let status = match err {
            UploadError::AlreadyUploading(_) => StatusCode::CONFLICT,
            UploadError::NotAFile { .. } => StatusCode::BAD_REQUEST,
            err if err.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self)
    }
}
