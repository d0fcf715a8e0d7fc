//! Shared fixture for store tests: a throwaway SQLite file and a manual clock.

use super::{
    Core, LogStore, ManualClock, NewChannel, PollEngine, Reaper, Registry,
};
use crate::db;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub(crate) struct Fixture {
    _dir: TempDir,
    pub pool: SqlitePool,
    pub clock: Arc<ManualClock>,
    pub registry: Registry,
    pub logs: LogStore,
    pub poller: PollEngine,
    pub reaper: Reaper,
    app: Uuid,
}

pub(crate) async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("store.db").display());
    let pool = db::connect(&url, 5).await.expect("connect sqlite");
    db::run_migrations(&pool).await.expect("migrate");

    let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("valid start");
    let clock = Arc::new(ManualClock::new(start));
    let core = Core::new(pool.clone(), clock.clone(), 0.0);
    let app = core
        .registry
        .create_application("fixture", None)
        .await
        .expect("fixture application");
    Fixture {
        _dir: dir,
        pool,
        clock,
        registry: core.registry,
        logs: core.logs,
        poller: core.poller,
        reaper: core.reaper,
        app: app.id,
    }
}

impl Fixture {
    pub fn now(&self) -> DateTime<Utc> {
        use super::Clock;
        crate::util::datetime_from_millis(self.clock.now_ms())
    }

    /// Create a channel in the fixture application and return its id.
    pub async fn channel(&self, retention_minutes: u32) -> Uuid {
        self.registry
            .create(
                self.app,
                NewChannel {
                    name: "test".into(),
                    slug: Uuid::new_v4().to_string(),
                    description: None,
                    retention_minutes,
                },
            )
            .await
            .expect("fixture channel")
            .id
    }
}
