//! Log entry returned by the store and exposed via API.

use super::{db_log::DbLog, level::Level};
use crate::util::datetime_from_millis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub channel_id: Uuid,
    pub level: Level,
    pub message: String,
    pub created: DateTime<Utc>,
}

impl From<DbLog> for LogEntry {
    fn from(d: DbLog) -> Self {
        LogEntry {
            id: d.id,
            channel_id: d.channel_id,
            level: d.level,
            message: d.message,
            created: datetime_from_millis(d.created_ms),
        }
    }
}
