//! Database row for a log entry.

use super::level::Level;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct DbLog {
    pub channel_id: Uuid,
    pub id: i64,
    pub level: Level,
    pub message: String,
    pub created_ms: i64,
}
