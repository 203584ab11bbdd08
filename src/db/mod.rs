pub mod courses;
pub mod enrollments;
pub mod lesson_progress;
pub mod schema;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{types::Type, Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use schema::run_migrations;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

/// Open (creating if needed) the application database and bring its schema up to date
pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    if let Err(e) = std::fs::create_dir_all(parent) {
      tracing::warn!("Could not create database directory {}: {}", parent.display(), e);
    }
  }

  let conn = Connection::open(path)?;
  configure(&conn)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Connection-level settings every connection needs
pub fn configure(conn: &Connection) -> Result<()> {
  conn.pragma_update(None, "foreign_keys", true)?;
  conn.busy_timeout(std::time::Duration::from_secs(5))
}

// ==================== Timestamps ====================

/// Format a timestamp for storage.
/// Fixed-width UTC so stored values compare correctly as text.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in storage format
pub fn now_timestamp() -> String {
  format_timestamp(Utc::now())
}

/// Parse a stored timestamp, reporting failures against column `idx`
pub fn parse_timestamp(idx: usize, value: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(value)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a nullable stored timestamp column
pub fn parse_optional_timestamp(idx: usize, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
  value.map(|v| parse_timestamp(idx, &v)).transpose()
}

/// Map an enum stored as text, reporting unknown values against column `idx`
pub(crate) fn parse_enum<T>(idx: usize, value: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
  parse(value).ok_or_else(|| {
    rusqlite::Error::FromSqlConversionFailure(
      idx,
      Type::Text,
      format!("unexpected value {:?}", value).into(),
    )
  })
}
