//! Mapping core failures onto HTTP responses.

use crate::store::CoreError;
use axum::{
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("{0}")]
  BadRequest(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Core(CoreError::ChannelNotFound(_)) => {
        (StatusCode::NOT_FOUND, "channel not found").into_response()
      }
      ApiError::Core(CoreError::ApplicationNotFound(_)) => {
        (StatusCode::NOT_FOUND, "application not found").into_response()
      }
      ApiError::Core(CoreError::Validation(msg)) | ApiError::BadRequest(msg) => {
        (StatusCode::BAD_REQUEST, msg).into_response()
      }
      ApiError::Core(CoreError::StoreUnavailable(e)) => {
        error!("store error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  #[test]
  fn status_codes_follow_the_error_kind() {
    let status = |e: ApiError| e.into_response().status();
    assert_eq!(
      status(CoreError::ChannelNotFound(Uuid::nil()).into()),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status(CoreError::ApplicationNotFound(Uuid::nil()).into()),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status(CoreError::validation("bad").into()),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      status(ApiError::BadRequest("bad json".into())),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      status(CoreError::StoreUnavailable(sqlx::Error::PoolClosed).into()),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}
