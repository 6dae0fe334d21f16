pub mod db;
pub mod json_log;
pub mod store;

pub use db::{create_db, insert_log_record, recent_log_records, DbPool};
pub use json_log::JsonFileLog;
pub use store::{LogError, LogStore, LogStoreKind};
