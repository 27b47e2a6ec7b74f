//! The dialect strategy: one [`Driver`] per engine, plus the native result handle it returns.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::SqlGatewayError;
use crate::reflection::{ColumnInfo, ForeignKeyInfo, IndexInfo, TableInfo};
use crate::types::{ColumnType, DatabaseType, RowValues};

/// A SQL feature a dialect may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Sequence,
    SelectUngroupedColumns,
    MultiInsertAsSelect,
    MultiColumnAsOrCond,
    Subselect,
    Schema,
}

/// Fixed capability set of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub sequence: bool,
    pub select_ungrouped_columns: bool,
    pub multi_insert_as_select: bool,
    pub multi_column_as_or_cond: bool,
    pub subselect: bool,
    pub schema: bool,
}

impl Capabilities {
    #[must_use]
    pub const fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Sequence => self.sequence,
            Capability::SelectUngroupedColumns => self.select_ungrouped_columns,
            Capability::MultiInsertAsSelect => self.multi_insert_as_select,
            Capability::MultiColumnAsOrCond => self.multi_column_as_or_cond,
            Capability::Subselect => self.subselect,
            Capability::Schema => self.schema,
        }
    }
}

/// Static description of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Scheme the dialect is registered under by default.
    pub name: &'static str,
    /// `None` for dialects implemented outside this crate.
    pub database_type: Option<DatabaseType>,
    pub capabilities: Capabilities,
}

/// Name and declared type of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    pub native_type: Option<String>,
}

/// Native handle over one executed statement.
///
/// `fetch` is forward-only. After `free` the cursor is closed but column metadata stays readable.
pub trait ResultDriver: Send {
    fn columns(&self) -> &[ResultColumn];

    /// Rows produced by the statement, when the engine can tell.
    fn row_count(&self) -> Option<usize>;

    /// Rows changed by a DML statement; `None` for row-returning statements.
    fn affected_rows(&self) -> Option<usize>;

    /// Pull the next native row, or `None` once the cursor is drained.
    ///
    /// # Errors
    /// Returns `SqlGatewayError` if the engine fails while stepping the cursor.
    fn fetch(&mut self) -> Result<Option<Vec<RowValues>>, SqlGatewayError>;

    /// Close the native cursor. Calling it twice is harmless.
    fn free(&mut self);

    /// Semantic type of every column, in column order.
    fn column_types(&self) -> Vec<Option<ColumnType>>;
}

/// One SQL dialect: connection, quoting, formatting, pagination, reflection and error translation.
///
/// Transaction methods map 1:1 onto native primitives. Nesting is handled by
/// [`Connection`](crate::Connection), never here.
pub trait Driver: Send {
    fn dialect(&self) -> &'static Dialect;

    /// Execute `sql`, binding `params` by position.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::Query` carrying the SQL and params when the engine rejects the statement.
    fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Box<dyn ResultDriver>, SqlGatewayError>;

    /// Rows changed by the last DML statement.
    fn affected_rows(&self) -> Option<usize>;

    /// Last generated identifier, optionally scoped to a sequence.
    ///
    /// # Errors
    /// Returns `SqlGatewayError` if the engine cannot be asked.
    fn insert_id(&mut self, sequence: Option<&str>) -> Result<Option<String>, SqlGatewayError>;

    /// # Errors
    /// Returns `SqlGatewayError` if the native BEGIN (or SAVEPOINT) fails.
    fn begin_transaction(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError>;

    /// # Errors
    /// Returns `SqlGatewayError` if the native COMMIT (or RELEASE) fails.
    fn commit(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError>;

    /// # Errors
    /// Returns `SqlGatewayError` if the native ROLLBACK fails.
    fn rollback(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError>;

    fn in_transaction(&self) -> bool;

    /// Render `value` as a literal of this dialect.
    fn quote(&self, value: &RowValues) -> String;

    /// Delimit an identifier.
    fn delimite(&self, identifier: &str) -> String;

    fn format_date(&self, value: &NaiveDate) -> String;

    fn format_date_time(&self, value: &NaiveDateTime) -> String;

    /// # Errors
    /// Returns `SqlGatewayError::NotSupported` when the dialect has no interval literal.
    fn format_date_interval(&self, value: &TimeDelta) -> Result<String, SqlGatewayError>;

    /// Quoted LIKE pattern; negative `position` anchors at the end, positive at the start, zero matches anywhere.
    fn format_like(&self, value: &str, position: i32) -> String;

    /// Append pagination to `sql`.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::InvalidArgument` for a negative limit or offset.
    fn apply_limit(
        &self,
        sql: &mut String,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<(), SqlGatewayError>;

    /// # Errors
    /// Returns `SqlGatewayError` if a catalog query fails.
    fn get_tables(&mut self) -> Result<Vec<TableInfo>, SqlGatewayError>;

    /// # Errors
    /// Returns `SqlGatewayError` if a catalog query fails.
    fn get_columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>, SqlGatewayError>;

    /// # Errors
    /// Returns `SqlGatewayError` if a catalog query fails.
    fn get_indexes(&mut self, table: &str) -> Result<Vec<IndexInfo>, SqlGatewayError>;

    /// # Errors
    /// Returns `SqlGatewayError` if a catalog query fails.
    fn get_foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyInfo>, SqlGatewayError>;

    fn is_supported(&self, capability: Capability) -> bool {
        self.dialect().capabilities.supports(capability)
    }
}
