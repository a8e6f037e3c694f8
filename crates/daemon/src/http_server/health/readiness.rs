use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyzRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyzResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiRequest for ReadyzRequest {
    type Response = ReadyzResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, "/_status/readyz"))
    }
}

/// Ready once the object store answers a listing.
#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    match state.store().list().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyzResponse {
                status: "ok".to_string(),
                error: None,
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(store = state.store().name(), "readiness check failed: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyzResponse {
                    status: "unavailable".to_string(),
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}
