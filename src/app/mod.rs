//! Application setup and runtime.

use crate::{
  db,
  http::{self, auth::{AccessPolicy, BearerToken, OpenAccess}},
  store::{Core, DEFAULT_REAP_PROBABILITY, SharedClock, SystemClock},
};
use sqlx::SqlitePool;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_RETENTION_MINUTES: u32 = 1440;

#[derive(Debug, Error, PartialEq)]
#[error("invalid value for {var}: '{value}'")]
pub struct ConfigError {
  pub var: &'static str,
  pub value: String,
}

/// Settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub database_url: String,
  pub addr: SocketAddr,
  pub reap_probability: f64,
  pub sweep_interval: Option<Duration>,
  pub default_retention_minutes: u32,
  pub api_token: Option<String>,
}

impl Config {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Build from any key lookup; unset keys take their defaults.
  pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    fn parsed<T: std::str::FromStr>(var: &'static str, raw: String) -> Result<T, ConfigError> {
      raw.trim().parse().map_err(|_| ConfigError { var, value: raw })
    }

    let database_url =
      get("LOGWATCH_DATABASE").unwrap_or_else(|| "sqlite://logwatch.db".to_string());
    let addr = match get("LOGWATCH_ADDR") {
      Some(v) => parsed("LOGWATCH_ADDR", v)?,
      None => SocketAddr::from(([127, 0, 0, 1], 8030)),
    };
    let reap_probability: f64 = match get("LOGWATCH_REAP_PROBABILITY") {
      Some(v) => parsed("LOGWATCH_REAP_PROBABILITY", v)?,
      None => DEFAULT_REAP_PROBABILITY,
    };
    if !(0.0..=1.0).contains(&reap_probability) {
      return Err(ConfigError {
        var: "LOGWATCH_REAP_PROBABILITY",
        value: reap_probability.to_string(),
      });
    }
    let sweep_interval = match get("LOGWATCH_SWEEP_SECS") {
      Some(v) => match parsed::<u64>("LOGWATCH_SWEEP_SECS", v.clone())? {
        0 => return Err(ConfigError { var: "LOGWATCH_SWEEP_SECS", value: v }),
        secs => Some(Duration::from_secs(secs)),
      },
      None => None,
    };
    let default_retention_minutes = match get("LOGWATCH_DEFAULT_RETENTION") {
      Some(v) => match parsed::<u32>("LOGWATCH_DEFAULT_RETENTION", v.clone())? {
        0 => return Err(ConfigError { var: "LOGWATCH_DEFAULT_RETENTION", value: v }),
        m => m,
      },
      None => DEFAULT_RETENTION_MINUTES,
    };
    let api_token = get("LOGWATCH_API_TOKEN").filter(|t| !t.trim().is_empty());

    Ok(Config {
      database_url,
      addr,
      reap_probability,
      sweep_interval,
      default_retention_minutes,
      api_token,
    })
  }

  pub fn access_policy(&self) -> Arc<dyn AccessPolicy> {
    match &self.api_token {
      Some(token) => Arc::new(BearerToken::new(token.clone())),
      None => Arc::new(OpenAccess),
    }
  }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
  pub db: SqlitePool,
  pub core: Core,
  pub policy: Arc<dyn AccessPolicy>,
  pub default_retention_minutes: u32,
}

impl AppState {
  pub fn new(db: SqlitePool, clock: SharedClock, config: &Config) -> Self {
    AppState {
      core: Core::new(db.clone(), clock, config.reap_probability),
      db,
      policy: config.access_policy(),
      default_retention_minutes: config.default_retention_minutes,
    }
  }
}

/// Start the HTTP server with configured environment.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  crate::util::init_tracing();

  let config = Config::from_env()?;
  let pool = db::connect(&config.database_url, 5).await?;
  db::run_migrations(&pool).await?;
  let recovered = db::recover_sequences(&pool).await?;
  if recovered > 0 {
    info!(channels = recovered, "recovered log id counters");
  }

  let state = AppState::new(pool, Arc::new(SystemClock), &config);
  if let Some(every) = config.sweep_interval {
    state.core.reaper.spawn_sweeper(every);
    info!("retention sweep every {}s", every.as_secs());
  }

  let app = http::build_router(state);

  info!("logwatch API:         http://{}/api/applications", config.addr);
  info!("ingest endpoint:      POST http://{}/api/log/:channel_id", config.addr);
  info!(
    "reap probability:     {} per append, auth {}",
    config.reap_probability,
    if config.api_token.is_some() { "bearer token" } else { "open" }
  );

  let listener = tokio::net::TcpListener::bind(config.addr).await?;
  axum::serve(listener, app).await?;
  Ok(())
}
