//! Route handlers, one module per storage kind. Every handler is thin: pick the binding,
//! call the matching browser in `bindscope-core`, serialise the result.

pub(crate) mod d1;
pub(crate) mod kv;
pub(crate) mod r2;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bindscope_core::{BrowseError, Outcome};

/// [`BrowseError`] rendered as `{outcome, error, ...}` with a status matching its outcome.
#[derive(Debug)]
pub(crate) struct ApiError(BrowseError);

impl From<BrowseError> for ApiError {
    fn from(e: BrowseError) -> Self {
        Self(e)
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let outcome = self.0.outcome();
        let status = match outcome {
            Outcome::NotFound => StatusCode::NOT_FOUND,
            Outcome::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Outcome::Ok | Outcome::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let mut body = serde_json::json!({
            "outcome": outcome,
            "error": self.0.to_string(),
        });
        if let BrowseError::Validation(failure) = &self.0 {
            body["issues"] = serde_json::json!(failure.issues);
            body["input"] = serde_json::json!(failure.input);
        }
        (status, Json(body)).into_response()
    }
}
