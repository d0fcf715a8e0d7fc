//! Database row for a channel.

use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct DbChannel {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub retention_minutes: i64,
    pub created_ms: i64,
}
