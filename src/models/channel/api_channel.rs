//! Channel metadata as handed out by the registry.

use super::db_channel::DbChannel;
use crate::util::datetime_from_millis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Minutes an entry is kept. Zero means entries are never reaped.
    pub retention_minutes: u32,
    pub created: DateTime<Utc>,
}

impl From<DbChannel> for Channel {
    fn from(d: DbChannel) -> Self {
        Channel {
            id: d.id,
            application_id: d.application_id,
            name: d.name,
            slug: d.slug,
            description: d.description,
            retention_minutes: u32::try_from(d.retention_minutes).unwrap_or(0),
            created: datetime_from_millis(d.created_ms),
        }
    }
}
