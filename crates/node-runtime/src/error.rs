//! Maps the wire-transparent `CoreError` taxonomy (§7) onto HTTP status
//! codes and a small JSON envelope. One `match` arm per kind, not a type
//! hierarchy, mirroring how `CoreError` itself is shaped.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nimbus_types::CoreError;
use serde_json::json;

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            CoreError::NotAllowed(_) => (StatusCode::FORBIDDEN, "NotAllowed"),
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            CoreError::VersionNotExists { .. } => (StatusCode::NOT_FOUND, "VersionNotExists"),
            CoreError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            CoreError::QuotaExceeded { .. } => (StatusCode::INSUFFICIENT_STORAGE, "QuotaExceeded"),
            CoreError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            CoreError::IllegalOperation(_) => (StatusCode::CONFLICT, "IllegalOperation"),
            CoreError::InvalidHash(_) => (StatusCode::BAD_REQUEST, "InvalidHash"),
            CoreError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let body = match &self.0 {
            CoreError::QuotaExceeded { context } => json!({
                "kind": kind,
                "message": self.0.to_string(),
                "limit": context.limit,
                "usage": context.usage,
                "requested": context.requested,
                "resource": context.resource,
                "holder": context.holder,
            }),
            other => json!({ "kind": kind, "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
