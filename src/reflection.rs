//! Catalog metadata returned by driver reflection.
//!
//! Everything here is produced from the engine's catalog, never by parsing user SQL.

use serde::Serialize;

/// A table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub view: bool,
}

/// A column of a table, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub table: String,
    /// `table.column`
    pub full_name: String,
    /// Declared type without its size suffix, upper-cased.
    pub native_type: String,
    /// Size from a declared type such as `VARCHAR(20)`.
    pub size: Option<u32>,
    pub nullable: bool,
    pub default: Option<String>,
    pub autoincrement: bool,
    /// Part of the table's primary key.
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    pub primary: bool,
    /// Participating columns in declared order.
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyInfo {
    /// Native constraint identifier.
    pub name: String,
    pub local: Vec<String>,
    /// Referenced table.
    pub table: String,
    /// Referenced columns; `None` when the reference targets an implicit row id.
    pub foreign: Option<Vec<String>>,
    pub on_delete: String,
    pub on_update: String,
}
