//! Incremental polling over the log store.

use super::{clock::SharedClock, error::CoreError, logs::LogStore};
use crate::{models::log::log_entry::LogEntry, util::datetime_from_millis};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Where a poll resumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Everything after this identifier.
    After(i64),
    /// Everything created after this instant.
    Since(DateTime<Utc>),
}

impl Cursor {
    /// Interpret a client-supplied cursor.
    ///
    /// Anything other than a non-negative integer means "from `now` on",
    /// so a first poll never replays the channel's history.
    pub fn parse(raw: Option<&str>, now: DateTime<Utc>) -> Self {
        match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
            Some(id) if id >= 0 => Cursor::After(id),
            _ => Cursor::Since(now),
        }
    }
}

/// Result of a poll: new entries, newest first, and the cursor to send next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Poll {
    pub logs: Vec<LogEntry>,
    pub cursor: i64,
}

#[derive(Clone)]
pub struct PollEngine {
    logs: LogStore,
    clock: SharedClock,
}

impl PollEngine {
    pub fn new(logs: LogStore, clock: SharedClock) -> Self {
        PollEngine { logs, clock }
    }

    fn now(&self) -> DateTime<Utc> {
        datetime_from_millis(self.clock.now_ms())
    }

    async fn ensure_channel(&self, channel_id: Uuid) -> Result<(), CoreError> {
        self.logs.last_assigned_id(channel_id).await.map(|_| ())
    }

    pub async fn poll(&self, channel_id: Uuid, cursor: Option<&str>) -> Result<Poll, CoreError> {
        // Read before listing: anything assigned later is newer than `last`.
        let last = self.logs.last_assigned_id(channel_id).await?;
        match Cursor::parse(cursor, self.now()) {
            Cursor::After(after) => {
                let logs = self.logs.list_since(channel_id, after).await?;
                let cursor = logs.first().map_or(after, |e| e.id.max(after));
                Ok(Poll { logs, cursor })
            }
            Cursor::Since(since) => {
                let logs = self.logs.list_since_timestamp(channel_id, since).await?;
                Ok(Poll {
                    cursor: contiguous_end(last, &logs),
                    logs,
                })
            }
        }
    }

    /// Entries created within the last `period_seconds`, newest first.
    pub async fn poll_window(
        &self,
        channel_id: Uuid,
        period_seconds: u64,
    ) -> Result<Vec<LogEntry>, CoreError> {
        self.ensure_channel(channel_id).await?;
        let now = self.now();
        let since = i64::try_from(period_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|period| now.checked_sub_signed(period))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.logs.list_since_timestamp(channel_id, since).await
    }
}

/// Advance `from` over returned ids for as long as they follow on without a gap.
///
/// A timestamp poll can leave out entries sharing the baseline millisecond;
/// stopping at the first gap means the next poll picks those up.
fn contiguous_end(from: i64, logs: &[LogEntry]) -> i64 {
    let mut ids: Vec<i64> = logs.iter().map(|e| e.id).collect();
    ids.sort_unstable();
    let mut end = from;
    for id in ids {
        if id == end + 1 {
            end = id;
        } else if id > end + 1 {
            break;
        }
    }
    end
}
