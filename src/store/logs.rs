//! Append-only per-channel log storage.
//!
//! Identifiers come from a counter on the channel row that is bumped in the
//! same transaction as the insert, so they survive restarts and reaping.
//! Appends are serialized in-process; each `list_*` is a single SELECT and
//! therefore sees one committed prefix of every channel's sequence.

use super::{clock::SharedClock, error::CoreError};
use crate::models::log::{db_log::DbLog, level::Level, log_entry::LogEntry};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

#[derive(Clone)]
pub struct LogStore {
    pool: SqlitePool,
    clock: SharedClock,
    writer: Arc<Mutex<()>>,
}

impl LogStore {
    pub fn new(pool: SqlitePool, clock: SharedClock) -> Self {
        LogStore {
            pool,
            clock,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Store a new entry under the channel's next identifier.
    ///
    /// The timestamp never goes below the channel's previous one, so append
    /// order and timestamp order agree even if the clock steps back.
    pub async fn append(
        &self,
        channel_id: Uuid,
        level: Level,
        message: &str,
    ) -> Result<LogEntry, CoreError> {
        let _guard = self.writer.lock().await;
        let now = self.clock.now_ms();
        let mut tx = self.pool.begin().await?;

        let assigned: Option<(i64, i64)> = sqlx::query_as(
            "UPDATE channels SET last_log_id = last_log_id + 1, last_log_ms = MAX(last_log_ms, ?) WHERE id = ? RETURNING last_log_id, last_log_ms",
        )
        .bind(now)
        .bind(channel_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((id, created_ms)) = assigned else {
            return Err(CoreError::ChannelNotFound(channel_id));
        };

        sqlx::query(
            "INSERT INTO logs (channel_id, id, level, message, created_ms) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(channel_id)
        .bind(id)
        .bind(level)
        .bind(message)
        .bind(created_ms)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        trace!(channel = %channel_id, id, %level, "appended log entry");
        Ok(
            DbLog {
                channel_id,
                id,
                level,
                message: message.to_string(),
                created_ms,
            }
            .into(),
        )
    }

    /// Entries with identifier greater than `after_id`, newest first.
    pub async fn list_since(&self, channel_id: Uuid, after_id: i64) -> Result<Vec<LogEntry>, CoreError> {
        let rows: Vec<DbLog> = sqlx::query_as(
            "SELECT channel_id, id, level, message, created_ms FROM logs WHERE channel_id = ? AND id > ? ORDER BY id DESC",
        )
        .bind(channel_id)
        .bind(after_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    /// Entries created strictly after `after`, newest first.
    ///
    /// Entries sharing a millisecond are listed in identifier order. Prefer
    /// [`LogStore::list_since`]: timestamps are only an approximate cursor.
    pub async fn list_since_timestamp(
        &self,
        channel_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>, CoreError> {
        let rows: Vec<DbLog> = sqlx::query_as(
            "SELECT channel_id, id, level, message, created_ms FROM logs WHERE channel_id = ? AND created_ms > ? ORDER BY created_ms DESC, id ASC",
        )
        .bind(channel_id)
        .bind(after.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    /// The `limit` most recent entries, newest first.
    pub async fn list_recent(&self, channel_id: Uuid, limit: u32) -> Result<Vec<LogEntry>, CoreError> {
        let rows: Vec<DbLog> = sqlx::query_as(
            "SELECT channel_id, id, level, message, created_ms FROM logs WHERE channel_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(channel_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    /// Remove entries stamped at or before `cutoff`. Returns how many went.
    pub async fn delete_older_than(
        &self,
        channel_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CoreError> {
        let done = sqlx::query("DELETE FROM logs WHERE channel_id = ? AND created_ms <= ?")
            .bind(channel_id)
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// Highest identifier ever handed out for the channel (0 before the first append).
    pub async fn last_assigned_id(&self, channel_id: Uuid) -> Result<i64, CoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT last_log_id FROM channels WHERE id = ?")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(id,)| id)
            .ok_or(CoreError::ChannelNotFound(channel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::fixture;
    use chrono::Duration;

    #[tokio::test]
    async fn append_assigns_increasing_ids_and_lists_newest_first() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        let mut ids = Vec::new();
        for i in 0..5 {
            let e = fx.logs.append(c, Level::Info, &format!("line {i}")).await.unwrap();
            ids.push(e.id);
        }
        assert_eq!(ids, [1, 2, 3, 4, 5]);

        let recent = fx.logs.list_recent(c, 5).await.unwrap();
        let got: Vec<i64> = recent.iter().map(|e| e.id).collect();
        assert_eq!(got, [5, 4, 3, 2, 1]);
        assert_eq!(recent[0].message, "line 4");

        let two = fx.logs.list_recent(c, 2).await.unwrap();
        assert_eq!(two.iter().map(|e| e.id).collect::<Vec<_>>(), [5, 4]);
    }

    #[tokio::test]
    async fn append_to_unknown_channel_fails() {
        let fx = fixture().await;
        let missing = Uuid::new_v4();
        let err = fx.logs.append(missing, Level::Info, "x").await.unwrap_err();
        assert!(matches!(err, CoreError::ChannelNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn list_since_excludes_the_cursor_entry() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        let e1 = fx.logs.append(c, Level::Info, "one").await.unwrap();
        let e2 = fx.logs.append(c, Level::Info, "two").await.unwrap();
        let e3 = fx.logs.append(c, Level::Info, "three").await.unwrap();

        let since = fx.logs.list_since(c, e1.id).await.unwrap();
        assert_eq!(since, vec![e3, e2]);
    }

    #[tokio::test]
    async fn entries_round_trip_unchanged() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        let e = fx.logs.append(c, Level::Warn, "disk low").await.unwrap();
        assert_eq!(e.level, Level::Warn);
        assert_eq!(e.message, "disk low");

        assert_eq!(fx.logs.list_recent(c, 10).await.unwrap(), vec![e.clone()]);
        assert_eq!(fx.logs.list_since(c, 0).await.unwrap(), vec![e.clone()]);
        let before = e.created - Duration::seconds(1);
        assert_eq!(
            fx.logs.list_since_timestamp(c, before).await.unwrap(),
            vec![e]
        );
    }

    #[tokio::test]
    async fn empty_message_is_allowed() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        let e = fx.logs.append(c, Level::Trace, "").await.unwrap();
        assert_eq!(fx.logs.list_recent(c, 1).await.unwrap()[0].message, "");
        assert_eq!(e.message, "");
    }

    #[tokio::test]
    async fn timestamps_never_run_backwards() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        let first = fx.logs.append(c, Level::Info, "a").await.unwrap();
        fx.clock.advance(Duration::minutes(-5));
        let second = fx.logs.append(c, Level::Info, "b").await.unwrap();
        assert!(second.id > first.id);
        assert_eq!(second.created, first.created);
    }

    #[tokio::test]
    async fn timestamp_listing_breaks_ties_by_ascending_id() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        let start = fx.now();
        let a = fx.logs.append(c, Level::Info, "a").await.unwrap();
        let b = fx.logs.append(c, Level::Info, "b").await.unwrap();
        fx.clock.advance(Duration::seconds(1));
        let d = fx.logs.append(c, Level::Info, "d").await.unwrap();

        let listed = fx
            .logs
            .list_since_timestamp(c, start - Duration::milliseconds(1))
            .await
            .unwrap();
        assert_eq!(listed, vec![d.clone(), a, b]);

        let strictly_after = fx.logs.list_since_timestamp(c, start).await.unwrap();
        assert_eq!(strictly_after, vec![d]);
    }

    #[tokio::test]
    async fn channels_have_independent_counters() {
        let fx = fixture().await;
        let a = fx.channel(60).await;
        let b = fx.channel(60).await;
        for _ in 0..3 {
            fx.logs.append(a, Level::Info, "a").await.unwrap();
        }
        let first_b = fx.logs.append(b, Level::Info, "b").await.unwrap();
        assert_eq!(first_b.id, 1);
        assert_eq!(fx.logs.last_assigned_id(a).await.unwrap(), 3);
        assert!(fx.logs.list_since(b, 0).await.unwrap().iter().all(|e| e.channel_id == b));
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_everything_is_deleted() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        fx.logs.append(c, Level::Info, "a").await.unwrap();
        fx.logs.append(c, Level::Info, "b").await.unwrap();
        let purged = fx.logs.delete_older_than(c, fx.now()).await.unwrap();
        assert_eq!(purged, 2);

        let next = fx.logs.append(c, Level::Info, "c").await.unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn delete_older_than_is_inclusive_of_the_cutoff() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        let old = fx.logs.append(c, Level::Info, "old").await.unwrap();
        fx.clock.advance(Duration::seconds(10));
        let young = fx.logs.append(c, Level::Info, "young").await.unwrap();

        assert_eq!(fx.logs.delete_older_than(c, old.created).await.unwrap(), 1);
        assert_eq!(fx.logs.list_recent(c, 10).await.unwrap(), vec![young]);
        assert_eq!(fx.logs.delete_older_than(c, old.created).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_get_distinct_gapless_ids() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        fx.logs.append(c, Level::Info, "seed").await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..32 {
            let logs = fx.logs.clone();
            tasks.push(tokio::spawn(async move {
                logs.append(c, Level::Debug, &format!("w{i}")).await.unwrap().id
            }));
        }
        let mut ids = Vec::new();
        for t in tasks {
            ids.push(t.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (2..=33).collect::<Vec<i64>>());
    }

    fn assert_consecutive(entries: &[LogEntry]) {
        for pair in entries.windows(2) {
            assert_eq!(pair[0].id, pair[1].id + 1, "gap in {:?}", ids_of(entries));
        }
    }

    fn ids_of(entries: &[LogEntry]) -> Vec<i64> {
        entries.iter().map(|e| e.id).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reads_stay_gapless_under_concurrent_appends_and_reaps() {
        let fx = fixture().await;
        let a = fx.channel(1).await;
        let b = fx.channel(1).await;

        let mut writers = Vec::new();
        for w in 0..4 {
            let logs = fx.logs.clone();
            let target = if w % 2 == 0 { a } else { b };
            writers.push(tokio::spawn(async move {
                for i in 0..50 {
                    logs.append(target, Level::Info, &format!("w{w} #{i}"))
                        .await
                        .unwrap();
                }
            }));
        }

        let reaping = {
            let reaper = fx.reaper.clone();
            let clock = fx.clock.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    clock.advance(Duration::seconds(20));
                    reaper.reap(a).await.unwrap();
                    reaper.reap(b).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let reading = {
            let logs = fx.logs.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let all = logs.list_since(a, 0).await.unwrap();
                    assert_consecutive(&all);
                    assert!(all.iter().all(|e| e.channel_id == a));
                    if let Some(mid) = all.get(all.len() / 2) {
                        let since = logs.list_since(a, mid.id).await.unwrap();
                        assert!(since.iter().all(|e| e.id > mid.id));
                        assert_consecutive(&since);
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for w in writers {
            w.await.unwrap();
        }
        reaping.await.unwrap();
        reading.await.unwrap();

        // With everything settled, list_since is exactly the entries above the cursor.
        let all = fx.logs.list_since(a, 0).await.unwrap();
        assert_consecutive(&all);
        assert_eq!(fx.logs.last_assigned_id(a).await.unwrap(), 100);
        if let Some(last) = all.first() {
            assert_eq!(last.id, 100);
        }
        for cursor in [0, 50, 99, 100] {
            let since = fx.logs.list_since(a, cursor).await.unwrap();
            let expected: Vec<i64> = ids_of(&all).into_iter().filter(|id| *id > cursor).collect();
            assert_eq!(ids_of(&since), expected);
        }
    }

    #[tokio::test]
    async fn deleting_channel_removes_its_entries() {
        let fx = fixture().await;
        let c = fx.channel(60).await;
        fx.logs.append(c, Level::Info, "a").await.unwrap();
        fx.registry.delete(c).await.unwrap();

        let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM logs")
            .fetch_one(&fx.pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
        assert!(matches!(
            fx.logs.append(c, Level::Info, "b").await,
            Err(CoreError::ChannelNotFound(_))
        ));
    }
}
