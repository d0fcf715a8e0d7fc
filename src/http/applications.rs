//! Application JSON APIs.

use super::error::ApiError;
use crate::{app::AppState, models::response::application_with_channels::ApplicationWithChannels};
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
pub struct CreateApplication {
  pub name: String,
  pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateApplication {
  pub name: Option<String>,
  pub description: Option<String>,
}

pub async fn list_applications(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(state.core.registry.list_applications().await?))
}

pub async fn create_application(
  State(state): State<AppState>,
  payload: Result<Json<CreateApplication>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(req) = payload?;
  let app = state
    .core
    .registry
    .create_application(&req.name, req.description.as_deref())
    .await?;
  Ok((StatusCode::CREATED, Json(app)))
}

pub async fn get_application(
  State(state): State<AppState>,
  Path(app_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
  let registry = &state.core.registry;
  let application = registry.get_application(app_id).await?;
  let channels = registry.list_channels(app_id).await?;
  Ok(Json(ApplicationWithChannels {
    application,
    channels,
  }))
}

pub async fn update_application(
  State(state): State<AppState>,
  Path(app_id): Path<Uuid>,
  payload: Result<Json<UpdateApplication>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(req) = payload?;
  let app = state
    .core
    .registry
    .update_application(app_id, req.name.as_deref(), req.description.as_deref())
    .await?;
  Ok(Json(app))
}

pub async fn delete_application(
  State(state): State<AppState>,
  Path(app_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.core.registry.delete_application(app_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
