//! Access control for management routes.

use crate::app::AppState;
use axum::{
  extract::{Request, State},
  http::{HeaderMap, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use tracing::warn;

/// Decides whether a request may reach a protected route.
pub trait AccessPolicy: Send + Sync {
  fn permits(&self, headers: &HeaderMap) -> bool;
}

/// Lets everything through.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
  fn permits(&self, _headers: &HeaderMap) -> bool {
    true
  }
}

/// Requires `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken {
  token: String,
}

impl BearerToken {
  pub fn new(token: impl Into<String>) -> Self {
    BearerToken {
      token: token.into(),
    }
  }
}

impl AccessPolicy for BearerToken {
  fn permits(&self, headers: &HeaderMap) -> bool {
    headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))
      .is_some_and(|t| t.trim() == self.token)
  }
}

pub async fn require_access(State(state): State<AppState>, request: Request, next: Next) -> Response {
  if state.policy.permits(request.headers()) {
    return next.run(request).await;
  }
  warn!("rejected unauthorized {} {}", request.method(), request.uri().path());
  (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
}
