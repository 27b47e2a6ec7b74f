use std::collections::VecDeque;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::driver::{ResultColumn, ResultDriver};
use crate::error::SqlGatewayError;
use crate::helpers::detect_type;
use crate::types::{ColumnType, RowValues};

use super::errors::translate;
use super::params::Params;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlGatewayError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlGatewayError> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Native `SQLite` result: column metadata plus the rows stepped out of the statement.
///
/// rusqlite ties a cursor to the borrowed statement, so the statement is stepped to
/// completion while the connection is held and the rows are handed out from here.
#[derive(Debug)]
pub struct SqliteResult {
    columns: Vec<ResultColumn>,
    rows: VecDeque<Vec<RowValues>>,
    row_count: Option<usize>,
    affected_rows: Option<usize>,
    unix_dates: bool,
    freed: bool,
}

impl SqliteResult {
    #[must_use]
    pub fn rows(columns: Vec<ResultColumn>, rows: VecDeque<Vec<RowValues>>, unix_dates: bool) -> Self {
        Self {
            columns,
            row_count: Some(rows.len()),
            rows,
            affected_rows: None,
            unix_dates,
            freed: false,
        }
    }

    #[must_use]
    pub fn affected(affected_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows: VecDeque::new(),
            row_count: None,
            affected_rows: Some(affected_rows),
            unix_dates: false,
            freed: false,
        }
    }
}

impl ResultDriver for SqliteResult {
    fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    fn affected_rows(&self) -> Option<usize> {
        self.affected_rows
    }

    fn fetch(&mut self) -> Result<Option<Vec<RowValues>>, SqlGatewayError> {
        if self.freed {
            return Ok(None);
        }
        Ok(self.rows.pop_front())
    }

    fn free(&mut self) {
        self.rows = VecDeque::new();
        self.freed = true;
    }

    fn column_types(&self) -> Vec<Option<ColumnType>> {
        self.columns
            .iter()
            .map(|col| {
                let ty = col.native_type.as_deref().and_then(detect_type)?;
                Some(match ty {
                    ColumnType::Date | ColumnType::DateTime if self.unix_dates => {
                        ColumnType::UnixTimestamp
                    }
                    other => other,
                })
            })
            .collect()
    }
}

/// Execute a prepared statement: row-returning statements are stepped to completion,
/// anything else reports the number of changed rows.
///
/// # Errors
/// Returns `SqlGatewayError::Query` with the SQL and params if binding or stepping fails.
pub fn build_result(
    stmt: &mut Statement<'_>,
    sql: &str,
    params: &[RowValues],
    unix_dates: bool,
) -> Result<SqliteResult, SqlGatewayError> {
    let converted = Params::convert(params);
    let bound = rusqlite::params_from_iter(converted.as_values());

    if stmt.column_count() == 0 {
        let affected = stmt.execute(bound).map_err(|e| translate(e, sql, params))?;
        return Ok(SqliteResult::affected(affected));
    }

    let columns: Vec<ResultColumn> = stmt
        .columns()
        .iter()
        .map(|col| ResultColumn {
            name: col.name().to_string(),
            native_type: col.decl_type().map(str::to_string),
        })
        .collect();
    let col_count = columns.len();

    let mut rows = VecDeque::new();
    let mut rows_iter = stmt.query(bound).map_err(|e| translate(e, sql, params))?;
    while let Some(row) = rows_iter.next().map_err(|e| translate(e, sql, params))? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        rows.push_back(row_values);
    }

    Ok(SqliteResult::rows(columns, rows, unix_dates))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_dates_switch_date_columns_to_timestamps() {
        let columns = vec![
            ResultColumn {
                name: "created".into(),
                native_type: Some("DATETIME".into()),
            },
            ResultColumn {
                name: "n".into(),
                native_type: Some("INTEGER".into()),
            },
            ResultColumn {
                name: "expr".into(),
                native_type: None,
            },
        ];
        let res = SqliteResult::rows(columns.clone(), VecDeque::new(), true);
        assert_eq!(
            res.column_types(),
            vec![Some(ColumnType::UnixTimestamp), Some(ColumnType::Integer), None]
        );
        let res = SqliteResult::rows(columns, VecDeque::new(), false);
        assert_eq!(res.column_types()[0], Some(ColumnType::DateTime));
    }

    #[test]
    fn freed_result_stops_yielding_rows() {
        let mut rows = VecDeque::new();
        rows.push_back(vec![RowValues::Int(1)]);
        let mut res = SqliteResult::rows(Vec::new(), rows, false);
        res.free();
        assert_eq!(res.fetch().unwrap(), None);
        assert_eq!(res.row_count(), Some(1));
    }
}
