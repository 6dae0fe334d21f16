use labelcheck_core::LogRecord;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::store::LogError;

/// Verification history kept as one pretty-printed JSON array on disk.
///
/// Appends rewrite the whole file through a sibling temp file and a rename,
/// so readers never observe a half-written array.
pub struct JsonFileLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &LogRecord) -> Result<(), LogError> {
        let _guard = self.write_lock.lock().await;

        // Entries written by other tools are carried over untouched.
        let mut entries = self.read_values().await?;
        entries.push(serde_json::to_value(record)?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), entries = entries.len(), "Appended log record");
        Ok(())
    }

    /// Up to `limit` records, newest first. Entries that are not log records
    /// are skipped.
    pub async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, LogError> {
        let entries = self.read_values().await?;
        Ok(entries
            .into_iter()
            .rev()
            .filter_map(|v| match serde_json::from_value::<LogRecord>(v) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!(path = %self.path.display(), error = %e, "Skipping foreign log entry");
                    None
                }
            })
            .take(limit)
            .collect())
    }

    async fn read_values(&self) -> Result<Vec<serde_json::Value>, LogError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
