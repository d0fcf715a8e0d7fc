//! Channel JSON APIs: metadata, recent entries, live polling.

use super::error::ApiError;
use crate::{
  app::AppState,
  models::{
    channel::api_channel::Channel, log::log_entry::LogEntry,
    response::channel_with_logs::ChannelWithLogs,
  },
  store::{ChannelUpdate, CoreError, NewChannel},
};
use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entries shown on the channel detail view.
const RECENT_LOGS: u32 = 10;
const DEFAULT_WINDOW_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannel {
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub retention_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateChannel {
  pub name: Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveParams {
  #[serde(rename = "lastLogId")]
  pub last_log_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
  pub period: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct WindowResponse {
  pub period: u64,
  pub logs: Vec<LogEntry>,
}

/// Resolve a channel, treating one filed under another application as missing.
async fn channel_in_app(state: &AppState, app_id: Uuid, channel_id: Uuid) -> Result<Channel, ApiError> {
  let channel = state.core.registry.get(channel_id).await?;
  if channel.application_id != app_id {
    return Err(CoreError::ChannelNotFound(channel_id).into());
  }
  Ok(channel)
}

pub async fn create_channel(
  State(state): State<AppState>,
  Path(app_id): Path<Uuid>,
  payload: Result<Json<CreateChannel>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(req) = payload?;
  let channel = state
    .core
    .registry
    .create(
      app_id,
      NewChannel {
        name: req.name,
        slug: req.slug,
        description: req.description,
        retention_minutes: req
          .retention_minutes
          .unwrap_or(state.default_retention_minutes),
      },
    )
    .await?;
  Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn get_channel(
  State(state): State<AppState>,
  Path((app_id, channel_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
  let channel = channel_in_app(&state, app_id, channel_id).await?;
  let application = state.core.registry.get_application(app_id).await?;
  let logs = state.core.logs.list_recent(channel_id, RECENT_LOGS).await?;
  Ok(Json(ChannelWithLogs {
    channel,
    application,
    logs,
  }))
}

pub async fn update_channel(
  State(state): State<AppState>,
  Path((app_id, channel_id)): Path<(Uuid, Uuid)>,
  payload: Result<Json<UpdateChannel>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(req) = payload?;
  channel_in_app(&state, app_id, channel_id).await?;
  let channel = state
    .core
    .registry
    .update(
      channel_id,
      ChannelUpdate {
        name: req.name,
        description: req.description,
      },
    )
    .await?;
  Ok(Json(channel))
}

pub async fn delete_channel(
  State(state): State<AppState>,
  Path((app_id, channel_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  channel_in_app(&state, app_id, channel_id).await?;
  state.core.registry.delete(channel_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// Incremental poll. A missing or unparsable `lastLogId` only yields entries
/// created from now on.
pub async fn live(
  State(state): State<AppState>,
  Path((app_id, channel_id)): Path<(Uuid, Uuid)>,
  params: Result<Query<LiveParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Query(params) = params?;
  channel_in_app(&state, app_id, channel_id).await?;
  let poll = state
    .core
    .poller
    .poll(channel_id, params.last_log_id.as_deref())
    .await?;
  Ok(Json(poll))
}

pub async fn window(
  State(state): State<AppState>,
  Path((app_id, channel_id)): Path<(Uuid, Uuid)>,
  params: Result<Query<WindowParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Query(params) = params?;
  channel_in_app(&state, app_id, channel_id).await?;
  let period = params.period.unwrap_or(DEFAULT_WINDOW_SECS);
  let logs = state.core.poller.poll_window(channel_id, period).await?;
  Ok(Json(WindowResponse { period, logs }))
}
