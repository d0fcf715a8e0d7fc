//! Retention reaper.
//!
//! Reaps piggyback on appends: each append rolls against
//! [`Reaper::probability`] and, on a hit, purges that channel in a spawned
//! task. An optional sweeper covers channels that stop receiving writes.

use super::{clock::SharedClock, error::CoreError, logs::LogStore, registry::Registry};
use crate::util::datetime_from_millis;
use chrono::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_REAP_PROBABILITY: f64 = 0.05;

/// A reap that could not finish. Logged, never returned to a writer.
#[derive(Debug, Error)]
#[error("reap of channel {channel} failed: {source}")]
pub struct ReapFailure {
    pub channel: Uuid,
    #[source]
    pub source: CoreError,
}

#[derive(Clone)]
pub struct Reaper {
    registry: Registry,
    logs: LogStore,
    clock: SharedClock,
    probability: f64,
}

impl Reaper {
    pub fn new(registry: Registry, logs: LogStore, clock: SharedClock, probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Reaper {
            registry,
            logs,
            clock,
            probability,
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Purge entries older than the channel's retention window.
    ///
    /// A channel that no longer exists, or has a zero window, is left alone.
    pub async fn reap(&self, channel_id: Uuid) -> Result<u64, ReapFailure> {
        let channel = match self.registry.get(channel_id).await {
            Ok(c) => c,
            Err(CoreError::ChannelNotFound(_)) => {
                debug!(channel = %channel_id, "reap skipped: channel gone");
                return Ok(0);
            }
            Err(source) => {
                return Err(ReapFailure {
                    channel: channel_id,
                    source,
                });
            }
        };
        if channel.retention_minutes == 0 {
            return Ok(0);
        }

        let cutoff = datetime_from_millis(self.clock.now_ms())
            - Duration::minutes(i64::from(channel.retention_minutes));
        let purged = self
            .logs
            .delete_older_than(channel_id, cutoff)
            .await
            .map_err(|source| ReapFailure {
                channel: channel_id,
                source,
            })?;
        if purged > 0 {
            debug!(channel = %channel_id, purged, %cutoff, "reaped expired entries");
        }
        Ok(purged)
    }

    /// [`Reaper::reap`], with failures logged and counted as nothing purged.
    pub async fn reap_quietly(&self, channel_id: Uuid) -> u64 {
        match self.reap(channel_id).await {
            Ok(n) => n,
            Err(e) => {
                warn!("{e}");
                0
            }
        }
    }

    pub fn should_reap(&self) -> bool {
        self.probability > 0.0 && rand::random::<f64>() < self.probability
    }

    /// Roll for a reap after an append. The reap runs detached from the caller.
    pub fn after_append(&self, channel_id: Uuid) -> Option<JoinHandle<u64>> {
        if !self.should_reap() {
            return None;
        }
        let reaper = self.clone();
        Some(tokio::spawn(async move { reaper.reap_quietly(channel_id).await }))
    }

    /// Reap every channel once. Returns the total purged.
    pub async fn sweep(&self) -> u64 {
        let ids = match self.registry.channel_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("sweep could not list channels: {e}");
                return 0;
            }
        };
        let mut total = 0;
        for id in ids {
            total += self.reap_quietly(id).await;
        }
        total
    }

    /// Run [`Reaper::sweep`] every `every`, starting one interval from now.
    pub fn spawn_sweeper(&self, every: std::time::Duration) -> JoinHandle<()> {
        let reaper = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = reaper.sweep().await;
                debug!(purged, "retention sweep finished");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::log::level::Level, store::testing::fixture};
    use sqlx::SqlitePool;

    #[tokio::test]
    async fn expired_entries_are_purged_after_the_window() {
        let fx = fixture().await;
        let c = fx.channel(10).await;
        let e1 = fx.logs.append(c, Level::Info, "E1").await.unwrap();

        fx.clock.advance(Duration::minutes(11));
        assert_eq!(fx.reaper.reap(c).await.unwrap(), 1);

        let recent = fx.logs.list_recent(c, 100).await.unwrap();
        assert!(recent.iter().all(|e| e.id != e1.id));
    }

    #[tokio::test]
    async fn entries_inside_the_window_survive() {
        let fx = fixture().await;
        let c = fx.channel(10).await;
        fx.logs.append(c, Level::Info, "old").await.unwrap();
        fx.clock.advance(Duration::minutes(9));
        let kept = fx.logs.append(c, Level::Info, "kept").await.unwrap();
        fx.clock.advance(Duration::minutes(2));

        assert_eq!(fx.reaper.reap(c).await.unwrap(), 1);
        assert_eq!(fx.logs.list_recent(c, 10).await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn reaping_twice_deletes_once() {
        let fx = fixture().await;
        let c = fx.channel(1).await;
        for _ in 0..3 {
            fx.logs.append(c, Level::Debug, "x").await.unwrap();
        }
        fx.clock.advance(Duration::minutes(2));
        assert_eq!(fx.reaper.reap(c).await.unwrap(), 3);
        assert_eq!(fx.reaper.reap(c).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_channel_is_a_silent_no_op() {
        let fx = fixture().await;
        assert_eq!(fx.reaper.reap(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn zero_retention_keeps_everything() {
        let fx = fixture().await;
        let c = fx.channel(5).await;
        fx.logs.append(c, Level::Info, "forever").await.unwrap();
        sqlx::query("UPDATE channels SET retention_minutes = 0 WHERE id = ?")
            .bind(c)
            .execute(&fx.pool)
            .await
            .unwrap();
        fx.clock.advance(Duration::days(365));
        assert_eq!(fx.reaper.reap(c).await.unwrap(), 0);
        assert_eq!(fx.logs.list_recent(c, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ids_keep_growing_after_a_reap() {
        let fx = fixture().await;
        let c = fx.channel(1).await;
        let first = fx.logs.append(c, Level::Info, "a").await.unwrap();
        fx.clock.advance(Duration::minutes(5));
        fx.reaper.reap(c).await.unwrap();

        let next = fx.logs.append(c, Level::Info, "b").await.unwrap();
        assert!(next.id > first.id);
        assert_eq!(fx.logs.list_since(c, 0).await.unwrap(), vec![next]);
    }

    #[tokio::test]
    async fn store_failure_is_reported_not_panicked() {
        let fx = fixture().await;
        let c = fx.channel(1).await;
        fx.pool.close().await;
        let err = fx.reaper.reap(c).await.unwrap_err();
        assert_eq!(err.channel, c);
        assert!(matches!(err.source, CoreError::StoreUnavailable(_)));
        assert_eq!(fx.reaper.reap_quietly(c).await, 0);
    }

    #[tokio::test]
    async fn probability_bounds_the_trigger() {
        let fx = fixture().await;
        let make = |p: f64, pool: SqlitePool| {
            Reaper::new(
                Registry::new(pool.clone(), fx.clock.clone()),
                LogStore::new(pool, fx.clock.clone()),
                fx.clock.clone(),
                p,
            )
        };
        let never = make(0.0, fx.pool.clone());
        let always = make(1.0, fx.pool.clone());
        assert!((0..100).all(|_| !never.should_reap()));
        assert!((0..100).all(|_| always.should_reap()));
        assert_eq!(make(7.5, fx.pool.clone()).probability(), 1.0);
        assert_eq!(make(-1.0, fx.pool.clone()).probability(), 0.0);
        assert_eq!(make(f64::NAN, fx.pool.clone()).probability(), 0.0);
        assert_eq!(DEFAULT_REAP_PROBABILITY, 0.05);
    }

    #[tokio::test]
    async fn sweep_reaps_every_channel() {
        let fx = fixture().await;
        let a = fx.channel(1).await;
        let b = fx.channel(1).await;
        fx.logs.append(a, Level::Info, "a").await.unwrap();
        fx.logs.append(b, Level::Info, "b").await.unwrap();
        fx.clock.advance(Duration::minutes(2));
        assert_eq!(fx.reaper.sweep().await, 2);
    }

    #[tokio::test]
    async fn after_append_spawns_only_on_a_hit() {
        let fx = fixture().await;
        let c = fx.channel(1).await;
        fx.logs.append(c, Level::Info, "a").await.unwrap();
        fx.clock.advance(Duration::minutes(2));

        let never = Reaper::new(fx.registry.clone(), fx.logs.clone(), fx.clock.clone(), 0.0);
        assert!(never.after_append(c).is_none());

        let always = Reaper::new(fx.registry.clone(), fx.logs.clone(), fx.clock.clone(), 1.0);
        let handle = always.after_append(c).expect("reap spawned");
        assert_eq!(handle.await.unwrap(), 1);
    }
}
