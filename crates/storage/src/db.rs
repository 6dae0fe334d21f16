use labelcheck_core::LogRecord;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

use crate::store::LogError;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verification_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_name TEXT NOT NULL,
            ocr_text TEXT NOT NULL,
            field_count INTEGER NOT NULL,
            matched_count INTEGER NOT NULL,
            record_json TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_verification_logs_image ON verification_logs(image_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Store one run. The full record is kept as JSON next to a few columns for
/// querying; returns the new row id.
pub async fn insert_log_record(pool: &DbPool, record: &LogRecord) -> Result<i64, LogError> {
    let json = serde_json::to_string(record)?;
    let result = sqlx::query(
        "INSERT INTO verification_logs (image_name, ocr_text, field_count, matched_count, record_json, recorded_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.image_name)
    .bind(&record.ocr_text)
    .bind(record.results.len() as i64)
    .bind(record.matched_count() as i64)
    .bind(json)
    .bind(&record.timestamp)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent records first.
pub async fn recent_log_records(pool: &DbPool, limit: usize) -> Result<Vec<LogRecord>, LogError> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT record_json FROM verification_logs ORDER BY id DESC LIMIT ?",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(json,)| serde_json::from_str(&json).map_err(LogError::from))
        .collect()
}
