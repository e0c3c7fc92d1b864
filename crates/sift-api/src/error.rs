//! API error mapped to HTTP status codes.
//!
//! [`ApiError`] wraps the shared [`Error`] and renders it as
//! `{"error": "message", "kind": "validation"}`:
//!
//! - `Validation` → 400
//! - `NotFound` → 404
//! - `ReferentialIntegrity` → 409
//! - `RetrievalUnavailable`, `Retrieval` → 503
//! - everything else → 500

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sift_core::Error;

/// Handler error type that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// The HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::ReferentialIntegrity { .. } => StatusCode::CONFLICT,
            Error::RetrievalUnavailable { .. } | Error::Retrieval { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), "request failed: {}", self.0);
        } else {
            tracing::debug!(kind = self.0.kind(), "request rejected: {}", self.0);
        }
        let body = axum::Json(json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::Source;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::validation("empty query"), StatusCode::BAD_REQUEST),
            (Error::not_found("document", "d1"), StatusCode::NOT_FOUND),
            (
                Error::ReferentialIntegrity { log_id: 999_999_999 },
                StatusCode::CONFLICT,
            ),
            (
                Error::RetrievalUnavailable {
                    lexical: "down".into(),
                    vector: "down".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (Error::storage("disk full"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::retrieval(Source::Lexical, "refused"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::from(Error::validation("limit must be positive")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
