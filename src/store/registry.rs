//! Channel registry: authoritative metadata for applications and channels.

use super::{clock::SharedClock, error::CoreError};
use crate::{
    models::{
        application::{api_application::Application, db_application::DbApplication},
        channel::{api_channel::Channel, db_channel::DbChannel},
        response::application_with_channels::ApplicationWithChannels,
    },
    util::non_blank,
};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Input for [`Registry::create`].
#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub retention_minutes: u32,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ChannelUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct Registry {
    pool: SqlitePool,
    clock: SharedClock,
}

impl Registry {
    pub fn new(pool: SqlitePool, clock: SharedClock) -> Self {
        Registry { pool, clock }
    }

    pub async fn create_application(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Application, CoreError> {
        let name =
            non_blank(name).ok_or_else(|| CoreError::validation("application name must not be empty"))?;
        let row = DbApplication {
            id: Uuid::new_v4(),
            name,
            description: description.unwrap_or_default().trim().to_string(),
            created_ms: self.clock.now_ms(),
        };
        sqlx::query("INSERT INTO applications (id, name, description, created_ms) VALUES (?, ?, ?, ?)")
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.description)
            .bind(row.created_ms)
            .execute(&self.pool)
            .await?;
        info!(application = %row.id, name = %row.name, "created application");
        Ok(row.into())
    }

    pub async fn get_application(&self, id: Uuid) -> Result<Application, CoreError> {
        sqlx::query_as::<_, DbApplication>(
            "SELECT id, name, description, created_ms FROM applications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Application::from)
        .ok_or(CoreError::ApplicationNotFound(id))
    }

    /// All applications, oldest first, each with its channels newest first.
    pub async fn list_applications(&self) -> Result<Vec<ApplicationWithChannels>, CoreError> {
        let apps: Vec<DbApplication> = sqlx::query_as(
            "SELECT id, name, description, created_ms FROM applications ORDER BY created_ms ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        let channels: Vec<DbChannel> = sqlx::query_as(
            "SELECT id, application_id, name, slug, description, retention_minutes, created_ms FROM channels ORDER BY created_ms DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_app: HashMap<Uuid, Vec<Channel>> = HashMap::new();
        for c in channels {
            by_app.entry(c.application_id).or_default().push(c.into());
        }
        Ok(apps
            .into_iter()
            .map(|a| {
                let channels = by_app.remove(&a.id).unwrap_or_default();
                ApplicationWithChannels {
                    application: a.into(),
                    channels,
                }
            })
            .collect())
    }

    pub async fn update_application(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Application, CoreError> {
        let name = match name {
            Some(n) => Some(
                non_blank(n).ok_or_else(|| CoreError::validation("application name must not be empty"))?,
            ),
            None => None,
        };
        sqlx::query_as::<_, DbApplication>(
            "UPDATE applications SET name = COALESCE(?, name), description = COALESCE(?, description) WHERE id = ? RETURNING id, name, description, created_ms",
        )
        .bind(name)
        .bind(description.map(|d| d.trim().to_string()))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Application::from)
        .ok_or(CoreError::ApplicationNotFound(id))
    }

    /// Delete an application together with its channels and their logs.
    pub async fn delete_application(&self, id: Uuid) -> Result<(), CoreError> {
        let done = sqlx::query("DELETE FROM applications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(CoreError::ApplicationNotFound(id));
        }
        info!(application = %id, "deleted application");
        Ok(())
    }

    pub async fn create(&self, application_id: Uuid, new: NewChannel) -> Result<Channel, CoreError> {
        let name =
            non_blank(&new.name).ok_or_else(|| CoreError::validation("channel name must not be empty"))?;
        let slug =
            non_blank(&new.slug).ok_or_else(|| CoreError::validation("channel slug must not be empty"))?;
        if new.retention_minutes == 0 {
            return Err(CoreError::validation("retention must be at least one minute"));
        }
        self.get_application(application_id).await?;

        let row = DbChannel {
            id: Uuid::new_v4(),
            application_id,
            name,
            slug,
            description: new.description.unwrap_or_default().trim().to_string(),
            retention_minutes: i64::from(new.retention_minutes),
            created_ms: self.clock.now_ms(),
        };
        let inserted = sqlx::query(
            "INSERT INTO channels (id, application_id, name, slug, description, retention_minutes, created_ms) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(row.application_id)
        .bind(&row.name)
        .bind(&row.slug)
        .bind(&row.description)
        .bind(row.retention_minutes)
        .bind(row.created_ms)
        .execute(&self.pool)
        .await
        .map_err(CoreError::from);
        match inserted {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                return Err(CoreError::validation(format!(
                    "slug '{}' is already used in this application",
                    row.slug
                )));
            }
            // The application may have been deleted since the lookup above.
            Err(CoreError::StoreUnavailable(e))
                if e
                    .as_database_error()
                    .is_some_and(|d| d.is_foreign_key_violation()) =>
            {
                return Err(CoreError::ApplicationNotFound(application_id));
            }
            Err(e) => return Err(e),
        }
        info!(channel = %row.id, application = %application_id, slug = %row.slug, "created channel");
        Ok(row.into())
    }

    pub async fn get(&self, channel_id: Uuid) -> Result<Channel, CoreError> {
        sqlx::query_as::<_, DbChannel>(
            "SELECT id, application_id, name, slug, description, retention_minutes, created_ms FROM channels WHERE id = ?",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Channel::from)
        .ok_or(CoreError::ChannelNotFound(channel_id))
    }

    pub async fn update(&self, channel_id: Uuid, update: ChannelUpdate) -> Result<Channel, CoreError> {
        let name = match update.name {
            Some(n) => {
                Some(non_blank(&n).ok_or_else(|| CoreError::validation("channel name must not be empty"))?)
            }
            None => None,
        };
        let channel = sqlx::query_as::<_, DbChannel>(
            "UPDATE channels SET name = COALESCE(?, name), description = COALESCE(?, description) WHERE id = ? RETURNING id, application_id, name, slug, description, retention_minutes, created_ms",
        )
        .bind(name)
        .bind(update.description.map(|d| d.trim().to_string()))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Channel::from)
        .ok_or(CoreError::ChannelNotFound(channel_id))?;
        debug!(channel = %channel_id, "updated channel");
        Ok(channel)
    }

    /// Channels of one application, newest first.
    pub async fn list_channels(&self, application_id: Uuid) -> Result<Vec<Channel>, CoreError> {
        let rows: Vec<DbChannel> = sqlx::query_as(
            "SELECT id, application_id, name, slug, description, retention_minutes, created_ms FROM channels WHERE application_id = ? ORDER BY created_ms DESC, id ASC",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Channel::from).collect())
    }

    /// Delete a channel and every log entry it owns.
    pub async fn delete(&self, channel_id: Uuid) -> Result<(), CoreError> {
        let done = sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(CoreError::ChannelNotFound(channel_id));
        }
        info!(channel = %channel_id, "deleted channel");
        Ok(())
    }

    pub async fn channel_ids(&self) -> Result<Vec<Uuid>, CoreError> {
        let ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM channels")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
