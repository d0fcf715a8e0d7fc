//! Log ingestion endpoint. Reachable without credentials.

use super::error::ApiError;
use crate::{app::AppState, models::log::level::Level};
use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestRequest {
  pub level: Level,
  #[serde(default)]
  pub message: Option<String>,
}

pub async fn ingest_log(
  State(state): State<AppState>,
  Path(channel_id): Path<Uuid>,
  payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(req) = payload?;
  let message = req.message.unwrap_or_default();
  let entry = state.core.ingest(channel_id, req.level, &message).await?;
  Ok((StatusCode::CREATED, Json(entry)))
}
