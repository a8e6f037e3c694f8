use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::catalog::FileDescriptor;
use common::reconcile::ListingError;

use super::client::{endpoint, ApiRequest};
use super::error_response;
use crate::ServiceState;

/// Request for the merged file listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFilesRequest {}

/// Local files in scan order, then remote-only files.
pub type ListFilesResponse = Vec<FileDescriptor>;

impl ApiRequest for ListFilesRequest {
    type Response = ListFilesResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, "/files"))
    }
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
) -> Result<impl IntoResponse, ListFilesError> {
    let files = state.reconciler().list_files().await?;
    tracing::debug!(count = files.len(), "listed files");
    Ok((StatusCode::OK, Json(files)))
}

#[derive(Debug, thiserror::Error)]
pub enum ListFilesError {
    #[error(transparent)]
    Listing(#[from] ListingError),
}

impl IntoResponse for ListFilesError {
    fn into_response(self) -> Response {
        tracing::error!("listing failed: {self}");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self)
    }
}
