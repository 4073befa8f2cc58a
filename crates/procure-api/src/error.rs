//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use procure_core::ErrorKind;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Body text for every `Persistence` failure.
pub const STORAGE_FAILURE_MESSAGE: &str = "internal storage error";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or malformed {0} header")]
  Unauthenticated(&'static str),

  #[error(transparent)]
  Engine(#[from] procure_core::Error),
}

/// HTTP status for each engine error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    ErrorKind::DeadlineExceeded | ErrorKind::InvalidItem | ErrorKind::Validation => {
      StatusCode::UNPROCESSABLE_ENTITY
    }
    ErrorKind::InvalidTransition
    | ErrorKind::AlreadyFinalized
    | ErrorKind::AlreadyCancelled
    | ErrorKind::ConcurrencyConflict => StatusCode::CONFLICT,
    ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind, message) = match &self {
      ApiError::Unauthenticated(header) => {
        debug!(header = *header, "rejecting request without a usable caller identity");
        (StatusCode::UNAUTHORIZED, json!("unauthenticated"), self.to_string())
      }
      // Storage details are logged by the engine, never sent to the caller.
      ApiError::Engine(e) if e.kind() == ErrorKind::Persistence => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!(e.kind()),
        STORAGE_FAILURE_MESSAGE.to_owned(),
      ),
      ApiError::Engine(e) => (status_for(e.kind()), json!(e.kind()), e.to_string()),
    };
    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn conflicts_map_to_409() {
    for kind in [
      ErrorKind::InvalidTransition,
      ErrorKind::AlreadyFinalized,
      ErrorKind::AlreadyCancelled,
      ErrorKind::ConcurrencyConflict,
    ] {
      assert_eq!(status_for(kind), StatusCode::CONFLICT);
    }
  }

  #[tokio::test]
  async fn storage_failures_are_opaque() {
    let inner = std::io::Error::other("UNIQUE constraint failed: audit_events.details");
    let resp = ApiError::from(procure_core::Error::Persistence(Box::new(inner))).into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], STORAGE_FAILURE_MESSAGE);
    assert_eq!(body["kind"], "persistence");
    assert!(!String::from_utf8_lossy(&bytes).contains("audit_events"));
  }

  #[test]
  fn missing_solicitation_is_404() {
    let resp = ApiError::from(procure_core::Error::SolicitationNotFound(3)).into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
