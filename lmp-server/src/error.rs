//! HTTP error responses
//!
//! Every failed request answers with a status code and a JSON body of the
//! form `{"error": "<message>"}`. Server-side failures are logged in full
//! and reported to the client with the route's fixed message.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lmp_common::Error;
use serde_json::json;
use tracing::error;

/// Result type for HTTP handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// An HTTP error response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Map a domain error; server-side failures become `context`
    pub fn from_error(err: Error, context: &str) -> Self {
        match client_error(&err) {
            Some(api) => api,
            None => {
                error!("{}: {}", context, err);
                Self::internal(context)
            }
        }
    }

    /// Like [`ApiError::from_error`] but keeps the failure detail,
    /// e.g. "Error connecting to device: Failed to connect"
    pub fn with_detail(err: Error, context: &str) -> Self {
        match client_error(&err) {
            Some(api) => api,
            None => {
                error!("{}: {}", context, err);
                Self::internal(format!("{}: {}", context, err.detail()))
            }
        }
    }
}

fn client_error(err: &Error) -> Option<ApiError> {
    let status = match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        _ => return None,
    };
    Some(ApiError::new(status, err.detail()))
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Attach a route's user-facing message to a domain result
pub trait ApiContext<T> {
    fn api_context(self, context: &str) -> ApiResult<T>;
    fn api_detail(self, context: &str) -> ApiResult<T>;
}

impl<T> ApiContext<T> for lmp_common::Result<T> {
    fn api_context(self, context: &str) -> ApiResult<T> {
        self.map_err(|e| ApiError::from_error(e, context))
    }

    fn api_detail(self, context: &str) -> ApiResult<T> {
        self.map_err(|e| ApiError::with_detail(e, context))
    }
}
