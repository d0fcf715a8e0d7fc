//! Utility functions: tracing, timestamps, input trimming.

use chrono::{DateTime, Utc};
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize pretty CLI logging.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  fmt()
    .with_env_filter(filter)
    .with_target(false)
    .pretty()
    .init();
}

/// Convert stored epoch milliseconds back to a UTC timestamp.
pub fn datetime_from_millis(ms: i64) -> DateTime<Utc> {
  DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

/// Trimmed copy of `s`, or `None` when nothing but whitespace is left.
pub fn non_blank(s: &str) -> Option<String> {
  let t = s.trim();
  if t.is_empty() {
    None
  } else {
    Some(t.to_string())
  }
}
