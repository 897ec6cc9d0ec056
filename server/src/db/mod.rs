pub mod migrations;
pub mod models;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Type alias for the shared database connection.
/// rusqlite is synchronous; we wrap in Arc<Mutex> for thread safety
/// with tokio::task::spawn_blocking for DB operations.
pub type DbPool = Arc<Mutex<Connection>>;

/// Initialize the SQLite database: create data directory if needed,
/// open (or create) the database file, enable WAL mode, and run migrations.
pub fn init_db(data_dir: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = Path::new(data_dir).join("messenger.db");
    let mut conn = Connection::open(&db_path)?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    migrations::migrations().to_latest(&mut conn)?;

    tracing::info!("Database initialized at {}", db_path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

/// Current time truncated to the microsecond precision the schema stores.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

pub fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}
