//! File API and push channel
//!
//! - `GET /files`: reconciled listing
//! - `GET /upload?path=`: start an upload
//! - `DELETE /upload?path=`: cancel an upload
//! - `DELETE /delete?upload_id=`: delete a remote object
//! - `GET /socket`: WebSocket push channel

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::ServiceState;

pub mod cancel;
pub mod client;
pub mod delete;
pub mod files;
pub mod socket;
pub mod upload;

// Re-export request/response types for use by the CLI and other clients
pub use cancel::{CancelUploadRequest, CancelUploadResponse};
pub use delete::{DeleteRequest, DeleteResponse};
pub use files::{ListFilesRequest, ListFilesResponse};
pub use upload::{UploadRequest, UploadResponse};

pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/files", get(files::handler))
        .route("/upload", get(upload::handler).delete(cancel::handler))
        .route("/delete", delete(delete::handler))
        .route("/socket", get(socket::handler))
        .with_state(state)
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
        .into_response()
}
