use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::config::{ConnectOptions, DateTimeFormat};
use crate::error::SqlGatewayError;

/// `SQLite` settings resolved from [`ConnectOptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    /// File path, or `:memory:`.
    pub db_path: String,
    pub read_only: bool,
    pub busy_timeout: Option<Duration>,
    pub foreign_keys: bool,
    pub date_format: DateTimeFormat,
    pub date_time_format: DateTimeFormat,
}

impl SqliteOptions {
    /// Resolve `SQLite` settings from generic connect options.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` for a malformed target and
    /// `SqlGatewayError::ConfigError` for malformed knobs.
    pub fn from_connect_options(opts: &ConnectOptions) -> Result<Self, SqlGatewayError> {
        let location = opts.location()?;
        let db_path = location.strip_prefix("//").unwrap_or(location).trim();
        if db_path.is_empty() {
            return Err(SqlGatewayError::ConnectionError(format!(
                "connection target '{}' names no database file",
                opts.target
            )));
        }
        Ok(Self {
            db_path: db_path.to_owned(),
            read_only: opts.bool_option("read_only")?.unwrap_or(false),
            busy_timeout: opts.u64_option("busy_timeout_ms")?.map(Duration::from_millis),
            foreign_keys: opts.bool_option("foreign_keys")?.unwrap_or(false),
            date_format: opts.date_format(),
            date_time_format: opts.date_time_format(),
        })
    }

    /// Open the native connection and apply the connection-level pragmas.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` if the database cannot be opened or configured.
    pub fn open(&self) -> Result<Connection, SqlGatewayError> {
        let flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        let conn = Connection::open_with_flags(&self.db_path, flags).map_err(|e| {
            SqlGatewayError::ConnectionError(format!(
                "Failed to open SQLite database '{}': {e}",
                self.db_path
            ))
        })?;

        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout).map_err(|e| {
                SqlGatewayError::ConnectionError(format!("Failed to set SQLite busy timeout: {e}"))
            })?;
        }
        if self.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(|e| {
                SqlGatewayError::ConnectionError(format!("Failed to enable SQLite foreign keys: {e}"))
            })?;
        }
        Ok(conn)
    }
}
