use std::fmt;
use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rusqlite::Connection;
use tracing::debug;

use crate::config::{ConnectOptions, DateTimeFormat, DEFAULT_DATE_TIME_FORMAT};
use crate::driver::{Capabilities, Dialect, Driver, ResultDriver};
use crate::error::SqlGatewayError;
use crate::reflection::{ColumnInfo, ForeignKeyInfo, IndexInfo, TableInfo};
use crate::types::{DatabaseType, RowValues};

use super::config::SqliteOptions;
use super::errors::translate;
use super::query::build_result;
use super::reflection;

pub static SQLITE_DIALECT: Dialect = Dialect {
    name: "sqlite",
    database_type: Some(DatabaseType::Sqlite),
    capabilities: Capabilities {
        sequence: false,
        select_ungrouped_columns: true,
        multi_insert_as_select: true,
        multi_column_as_or_cond: false,
        subselect: true,
        schema: false,
    },
};

/// Bracket-delimited `SQLite` dialect over a rusqlite connection.
pub struct SqliteDriver {
    conn: Connection,
    opts: SqliteOptions,
    affected_rows: Option<usize>,
}

impl SqliteDriver {
    /// Open the database named by `opts.target`.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` if the target is malformed or the file cannot be opened.
    pub fn connect(opts: &ConnectOptions) -> Result<Self, SqlGatewayError> {
        let sqlite_opts = SqliteOptions::from_connect_options(opts)?;
        let conn = sqlite_opts.open()?;
        debug!(path = %sqlite_opts.db_path, "sqlite connection opened");
        Ok(Self {
            conn,
            opts: sqlite_opts,
            affected_rows: None,
        })
    }

    /// Registry constructor for the `sqlite` scheme.
    ///
    /// # Errors
    /// See [`SqliteDriver::connect`].
    pub fn boxed(opts: &ConnectOptions) -> Result<Box<dyn Driver>, SqlGatewayError> {
        Ok(Box::new(Self::connect(opts)?))
    }

    /// Run synchronous `rusqlite` logic against the underlying connection.
    pub fn with_connection<R>(&mut self, func: impl FnOnce(&mut Connection) -> R) -> R {
        func(&mut self.conn)
    }

    fn exec(&mut self, sql: &str) -> Result<(), SqlGatewayError> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| translate(e, sql, &[]))
    }

    fn escape_text(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn format_with(format: &DateTimeFormat, value: &NaiveDateTime) -> String {
        match format {
            DateTimeFormat::Unix => value.and_utc().timestamp().to_string(),
            DateTimeFormat::Pattern(pattern) => {
                let mut rendered = String::new();
                if write!(rendered, "{}", value.format(pattern)).is_err() {
                    rendered = value.format(DEFAULT_DATE_TIME_FORMAT).to_string();
                }
                Self::escape_text(&rendered)
            }
        }
    }
}

impl fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("db_path", &self.opts.db_path)
            .field("in_transaction", &!self.conn.is_autocommit())
            .finish()
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> &'static Dialect {
        &SQLITE_DIALECT
    }

    fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Box<dyn ResultDriver>, SqlGatewayError> {
        let unix_dates = self.opts.date_time_format.is_unix();
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| translate(e, sql, params))?;
        let result = build_result(&mut stmt, sql, params, unix_dates)?;
        if let Some(affected) = result.affected_rows() {
            self.affected_rows = Some(affected);
        }
        Ok(Box::new(result))
    }

    fn affected_rows(&self) -> Option<usize> {
        self.affected_rows
    }

    fn insert_id(&mut self, _sequence: Option<&str>) -> Result<Option<String>, SqlGatewayError> {
        let id = self.conn.last_insert_rowid();
        Ok((id != 0).then(|| id.to_string()))
    }

    fn begin_transaction(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        let sql = match savepoint {
            Some(name) => format!("SAVEPOINT {}", self.delimite(name)),
            None => "BEGIN".to_owned(),
        };
        self.exec(&sql)
    }

    fn commit(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        let sql = match savepoint {
            Some(name) => format!("RELEASE SAVEPOINT {}", self.delimite(name)),
            None => "COMMIT".to_owned(),
        };
        self.exec(&sql)
    }

    fn rollback(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        let sql = match savepoint {
            Some(name) => format!("ROLLBACK TO SAVEPOINT {}", self.delimite(name)),
            None => "ROLLBACK".to_owned(),
        };
        self.exec(&sql)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn quote(&self, value: &RowValues) -> String {
        match value {
            RowValues::Null => "NULL".to_owned(),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) if !f.is_finite() => "NULL".to_owned(),
            RowValues::Float(f) => f.to_string(),
            RowValues::Bool(b) => if *b { "1" } else { "0" }.to_owned(),
            RowValues::Text(s) => Self::escape_text(s),
            RowValues::JSON(json) => Self::escape_text(&json.to_string()),
            RowValues::Timestamp(ts) => self.format_date_time(ts),
            RowValues::Blob(bytes) => {
                let mut hex = String::with_capacity(bytes.len() * 2 + 3);
                hex.push_str("X'");
                for b in bytes {
                    let _ = write!(hex, "{b:02X}");
                }
                hex.push('\'');
                hex
            }
        }
    }

    fn delimite(&self, identifier: &str) -> String {
        format!("[{}]", identifier.replace(['[', ']'], " "))
    }

    fn format_date(&self, value: &NaiveDate) -> String {
        let midnight = value.and_time(chrono::NaiveTime::MIN);
        Self::format_with(&self.opts.date_format, &midnight)
    }

    fn format_date_time(&self, value: &NaiveDateTime) -> String {
        Self::format_with(&self.opts.date_time_format, value)
    }

    fn format_date_interval(&self, _value: &TimeDelta) -> Result<String, SqlGatewayError> {
        Err(SqlGatewayError::NotSupported(
            "SQLite has no date interval literal".into(),
        ))
    }

    fn format_like(&self, value: &str, position: i32) -> String {
        let mut escaped = String::with_capacity(value.len() + 8);
        for ch in value.chars() {
            match ch {
                '%' | '_' | '\\' => {
                    escaped.push('\\');
                    escaped.push(ch);
                }
                '\'' => escaped.push_str("''"),
                _ => escaped.push(ch),
            }
        }
        format!(
            "'{}{}{}' ESCAPE '\\'",
            if position <= 0 { "%" } else { "" },
            escaped,
            if position >= 0 { "%" } else { "" },
        )
    }

    fn apply_limit(
        &self,
        sql: &mut String,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<(), SqlGatewayError> {
        if limit.is_some_and(|l| l < 0) || offset.is_some_and(|o| o < 0) {
            return Err(SqlGatewayError::InvalidArgument(
                "Negative offset or limit.".into(),
            ));
        }
        let offset = offset.filter(|o| *o > 0);
        if limit.is_some() || offset.is_some() {
            let _ = write!(sql, " LIMIT {}", limit.unwrap_or(-1));
            if let Some(offset) = offset {
                let _ = write!(sql, " OFFSET {offset}");
            }
        }
        Ok(())
    }

    fn get_tables(&mut self) -> Result<Vec<TableInfo>, SqlGatewayError> {
        reflection::get_tables(&self.conn)
    }

    fn get_columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>, SqlGatewayError> {
        reflection::get_columns(&self.conn, table, &self.delimite(table))
    }

    fn get_indexes(&mut self, table: &str) -> Result<Vec<IndexInfo>, SqlGatewayError> {
        let delimited = self.delimite(table);
        reflection::get_indexes(&self.conn, table, &delimited, |name| self.delimite(name))
    }

    fn get_foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyInfo>, SqlGatewayError> {
        reflection::get_foreign_keys(&self.conn, &self.delimite(table))
    }
}
