//! Database helpers: connection, migrations, and path handling.

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{path::Path, str::FromStr, time::Duration};

/// Open a pool for a sqlx SQLite URL.
///
/// File databases run in WAL mode so readers proceed while a write is in flight.
pub async fn connect(db_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let db_url = ensure_sqlite_path(db_url);
    let mut options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    if !is_in_memory(&db_url) {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Run SQLite migrations to create tables if absent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_ms INTEGER NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS channels (
            id TEXT PRIMARY KEY,
            application_id TEXT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            retention_minutes INTEGER NOT NULL CHECK (retention_minutes >= 0),
            last_log_id INTEGER NOT NULL DEFAULT 0,
            last_log_ms INTEGER NOT NULL DEFAULT 0,
            created_ms INTEGER NOT NULL,
            UNIQUE (application_id, slug)
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS logs (
            channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
            id INTEGER NOT NULL,
            level TEXT NOT NULL,
            message TEXT NOT NULL,
            created_ms INTEGER NOT NULL,
            PRIMARY KEY (channel_id, id)
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS logs_channel_created ON logs (channel_id, created_ms)")
        .execute(pool)
        .await?;
    Ok(())
}

/// Raise every channel counter to at least its highest stored log id.
///
/// Counters live on the channel row, so this only matters for databases
/// whose `logs` table was written without going through the counter.
pub async fn recover_sequences(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let done = sqlx::query(
        r#"UPDATE channels SET
            last_log_id = (SELECT MAX(id) FROM logs WHERE logs.channel_id = channels.id),
            last_log_ms = MAX(last_log_ms, (SELECT MAX(created_ms) FROM logs WHERE logs.channel_id = channels.id))
        WHERE last_log_id < (SELECT COALESCE(MAX(id), 0) FROM logs WHERE logs.channel_id = channels.id)"#,
    )
    .execute(pool)
    .await?;
    Ok(done.rows_affected())
}

fn is_in_memory(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

/// Ensure the parent folder of a SQLite file exists for a given sqlx URL.
pub fn ensure_sqlite_path(db_url: &str) -> String {
    if !db_url.starts_with("sqlite:") || is_in_memory(db_url) {
        return db_url.to_string();
    }
    let path_part = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path_only = match path_part.split_once('?') {
        Some((p, _)) => p,
        None => path_part,
    };
    if !path_only.is_empty() {
        if let Some(parent) = Path::new(path_only).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
    }
    db_url.to_string()
}
