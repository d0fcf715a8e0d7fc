//! logwatch library entrypoint.
//!
//! Modules:
//! - `app`: startup, configuration, shared state
//! - `http`: Axum router and handlers
//! - `store`: channel registry, log store, poll engine, retention reaper
//! - `db`: connection, migrations and SQLite helpers
//! - `models`: typed records used across layers
//! - `util`: helpers for tracing, timestamps and input trimming

pub mod app;
pub mod db;
pub mod http;
pub mod models;
pub mod store;
pub mod util;
