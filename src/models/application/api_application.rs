//! API representation of an application.

use super::db_application::DbApplication;
use crate::util::datetime_from_millis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created: DateTime<Utc>,
}

impl From<DbApplication> for Application {
    fn from(d: DbApplication) -> Self {
        Application {
            id: d.id,
            name: d.name,
            description: d.description,
            created: datetime_from_millis(d.created_ms),
        }
    }
}
