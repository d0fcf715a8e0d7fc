//! The retention-bounded log core.
//!
//! - `registry`: applications and channel metadata
//! - `logs`: append-only per-channel entries with durable identifiers
//! - `poll`: cursor and window queries over `logs`
//! - `reaper`: retention enforcement
//! - `clock`: injected time source

pub mod clock;
pub mod error;
pub mod logs;
pub mod poll;
pub mod reaper;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::CoreError;
pub use logs::LogStore;
pub use poll::{Cursor, Poll, PollEngine};
pub use reaper::{DEFAULT_REAP_PROBABILITY, ReapFailure, Reaper};
pub use registry::{ChannelUpdate, NewChannel, Registry};

use crate::models::log::{level::Level, log_entry::LogEntry};
use sqlx::SqlitePool;
use uuid::Uuid;

/// The four core components wired over one pool and one clock.
#[derive(Clone)]
pub struct Core {
    pub registry: Registry,
    pub logs: LogStore,
    pub poller: PollEngine,
    pub reaper: Reaper,
}

impl Core {
    pub fn new(pool: SqlitePool, clock: SharedClock, reap_probability: f64) -> Self {
        let registry = Registry::new(pool.clone(), clock.clone());
        let logs = LogStore::new(pool, clock.clone());
        let poller = PollEngine::new(logs.clone(), clock.clone());
        let reaper = Reaper::new(registry.clone(), logs.clone(), clock, reap_probability);
        Core {
            registry,
            logs,
            poller,
            reaper,
        }
    }

    /// Append an entry and maybe kick off a reap of its channel.
    ///
    /// The reap never delays or fails the append.
    pub async fn ingest(
        &self,
        channel_id: Uuid,
        level: Level,
        message: &str,
    ) -> Result<LogEntry, CoreError> {
        let entry = self.logs.append(channel_id, level, message).await?;
        self.reaper.after_append(channel_id);
        Ok(entry)
    }
}
