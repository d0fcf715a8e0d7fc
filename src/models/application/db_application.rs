//! Database row for an application.

use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct DbApplication {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_ms: i64,
}
