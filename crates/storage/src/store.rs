use labelcheck_core::LogRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::db::{self, DbPool};
use crate::json_log::JsonFileLog;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Log serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Which backing store verification runs are logged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStoreKind {
    #[default]
    Json,
    Sqlite,
}

impl LogStoreKind {
    /// File name used when no explicit path is configured.
    pub fn default_file_name(self) -> &'static str {
        match self {
            LogStoreKind::Json => "verifications.json",
            LogStoreKind::Sqlite => "labelcheck.db",
        }
    }
}

pub enum LogStore {
    Json(JsonFileLog),
    Sqlite(DbPool),
}

impl LogStore {
    pub async fn open(kind: LogStoreKind, path: &Path) -> Result<Self, LogError> {
        match kind {
            LogStoreKind::Json => Ok(LogStore::Json(JsonFileLog::new(path))),
            LogStoreKind::Sqlite => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Ok(LogStore::Sqlite(db::create_db(path).await?))
            }
        }
    }

    pub async fn append(&self, record: &LogRecord) -> Result<(), LogError> {
        match self {
            LogStore::Json(log) => log.append(record).await,
            LogStore::Sqlite(pool) => db::insert_log_record(pool, record).await.map(|_| ()),
        }
    }

    /// Up to `limit` records, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, LogError> {
        match self {
            LogStore::Json(log) => log.recent(limit).await,
            LogStore::Sqlite(pool) => db::recent_log_records(pool, limit).await,
        }
    }
}
