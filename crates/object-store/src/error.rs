use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Every failure talking to a remote store.
///
/// Callers in the relay treat all of these uniformly as a remote error; the
/// variants exist for logging and for the HTTP layer's status mapping.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("failed to read upload content: {0}")]
    Read(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Build a status error from a non-success response, consuming its body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        StoreError::Status { status, body }
    }
}
