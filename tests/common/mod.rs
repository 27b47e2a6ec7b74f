#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use sql_gateway::driver::{Capabilities, Dialect, Driver, ResultColumn, ResultDriver};
use sql_gateway::reflection::{ColumnInfo, ForeignKeyInfo, IndexInfo, TableInfo};
use sql_gateway::{ConnectOptions, Connection, DriverRegistry, RowValues, SqlGatewayError};

pub static MOCK_DIALECT: Dialect = Dialect {
    name: "mock",
    database_type: None,
    capabilities: Capabilities {
        sequence: true,
        select_ungrouped_columns: false,
        multi_insert_as_select: false,
        multi_column_as_or_cond: false,
        subselect: true,
        schema: true,
    },
};

/// Everything the mock driver was asked to do, in order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// How many native cursors the mock driver has released.
pub type FreeCount = Arc<Mutex<usize>>;

/// Driver that records native calls instead of talking to an engine.
///
/// Statements containing `FAIL` raise a driver error; everything else
/// returns the canned rows. Results of statements containing `BROKEN`
/// raise an error from `fetch` once their rows run out.
pub struct RecordingDriver {
    log: CallLog,
    freed: FreeCount,
    rows: Vec<Vec<RowValues>>,
    columns: Vec<ResultColumn>,
    in_tx: bool,
}

impl RecordingDriver {
    pub fn new(log: CallLog) -> Self {
        Self::with_free_count(log, Arc::new(Mutex::new(0)))
    }

    pub fn with_free_count(log: CallLog, freed: FreeCount) -> Self {
        Self {
            log,
            freed,
            rows: vec![
                vec![RowValues::Int(1), RowValues::Text("one".into())],
                vec![RowValues::Int(2), RowValues::Text("two".into())],
            ],
            columns: vec![
                ResultColumn {
                    name: "id".into(),
                    native_type: Some("INTEGER".into()),
                },
                ResultColumn {
                    name: "name".into(),
                    native_type: Some("TEXT".into()),
                },
            ],
            in_tx: false,
        }
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }
}

pub struct CannedResult {
    columns: Vec<ResultColumn>,
    rows: std::collections::VecDeque<Vec<RowValues>>,
    total: usize,
    broken: bool,
    released: bool,
    freed: FreeCount,
}

impl ResultDriver for CannedResult {
    fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    fn row_count(&self) -> Option<usize> {
        Some(self.total)
    }

    fn affected_rows(&self) -> Option<usize> {
        None
    }

    fn fetch(&mut self) -> Result<Option<Vec<RowValues>>, SqlGatewayError> {
        match self.rows.pop_front() {
            None if self.broken && !self.released => {
                Err(SqlGatewayError::Other("mock cursor broke".into()))
            }
            next => Ok(next),
        }
    }

    fn free(&mut self) {
        if !self.released {
            *self.freed.lock().unwrap() += 1;
            self.released = true;
        }
        self.rows.clear();
    }

    fn column_types(&self) -> Vec<Option<sql_gateway::ColumnType>> {
        vec![None; self.columns.len()]
    }
}

impl Driver for RecordingDriver {
    fn dialect(&self) -> &'static Dialect {
        &MOCK_DIALECT
    }

    fn query(
        &mut self,
        sql: &str,
        _params: &[RowValues],
    ) -> Result<Box<dyn ResultDriver>, SqlGatewayError> {
        self.record(format!("query {sql}"));
        if sql.contains("FAIL") {
            return Err(SqlGatewayError::Other(format!("mock failure: {sql}")));
        }
        Ok(Box::new(CannedResult {
            columns: self.columns.clone(),
            rows: self.rows.clone().into(),
            total: self.rows.len(),
            broken: sql.contains("BROKEN"),
            released: false,
            freed: Arc::clone(&self.freed),
        }))
    }

    fn affected_rows(&self) -> Option<usize> {
        None
    }

    fn insert_id(&mut self, _sequence: Option<&str>) -> Result<Option<String>, SqlGatewayError> {
        Ok(None)
    }

    fn begin_transaction(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        self.record(format!("begin {}", savepoint.unwrap_or("-")));
        self.in_tx = true;
        Ok(())
    }

    fn commit(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        self.record(format!("commit {}", savepoint.unwrap_or("-")));
        self.in_tx = false;
        Ok(())
    }

    fn rollback(&mut self, savepoint: Option<&str>) -> Result<(), SqlGatewayError> {
        self.record(format!("rollback {}", savepoint.unwrap_or("-")));
        self.in_tx = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_tx
    }

    fn quote(&self, value: &RowValues) -> String {
        format!("{value:?}")
    }

    fn delimite(&self, identifier: &str) -> String {
        format!("\"{identifier}\"")
    }

    fn format_date(&self, value: &NaiveDate) -> String {
        value.to_string()
    }

    fn format_date_time(&self, value: &NaiveDateTime) -> String {
        value.to_string()
    }

    fn format_date_interval(&self, value: &TimeDelta) -> Result<String, SqlGatewayError> {
        Ok(format!("{} seconds", value.num_seconds()))
    }

    fn format_like(&self, value: &str, _position: i32) -> String {
        format!("'%{value}%'")
    }

    fn apply_limit(
        &self,
        _sql: &mut String,
        _limit: Option<i64>,
        _offset: Option<i64>,
    ) -> Result<(), SqlGatewayError> {
        Ok(())
    }

    fn get_tables(&mut self) -> Result<Vec<TableInfo>, SqlGatewayError> {
        Ok(Vec::new())
    }

    fn get_columns(&mut self, _table: &str) -> Result<Vec<ColumnInfo>, SqlGatewayError> {
        Ok(Vec::new())
    }

    fn get_indexes(&mut self, _table: &str) -> Result<Vec<IndexInfo>, SqlGatewayError> {
        Ok(Vec::new())
    }

    fn get_foreign_keys(&mut self, _table: &str) -> Result<Vec<ForeignKeyInfo>, SqlGatewayError> {
        Ok(Vec::new())
    }
}

/// A lazy connection to `mock:` whose drivers all write to the returned log.
pub fn mock_connection() -> (Connection, CallLog) {
    let (conn, log, _freed) = mock_connection_with_frees();
    (conn, log)
}

/// Like [`mock_connection`], also counting every native cursor release.
pub fn mock_connection_with_frees() -> (Connection, CallLog, FreeCount) {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let freed: FreeCount = Arc::new(Mutex::new(0));
    let mut registry = DriverRegistry::empty();
    let factory_log = Arc::clone(&log);
    let factory_freed = Arc::clone(&freed);
    registry.register("mock", move |_opts| {
        factory_log.lock().unwrap().push("connect".into());
        Ok(Box::new(RecordingDriver::with_free_count(
            Arc::clone(&factory_log),
            Arc::clone(&factory_freed),
        )) as Box<dyn Driver>)
    });
    (
        Connection::with_registry(ConnectOptions::new("mock:test"), registry),
        log,
        freed,
    )
}

pub fn frees(count: &FreeCount) -> usize {
    *count.lock().unwrap()
}

/// Log entries that touched the native transaction.
pub fn tx_calls(log: &CallLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|entry| {
            entry.starts_with("begin") || entry.starts_with("commit") || entry.starts_with("rollback")
        })
        .cloned()
        .collect()
}

pub fn sqlite_memory() -> Result<Connection, SqlGatewayError> {
    Connection::open(ConnectOptions::new("sqlite::memory:"))
}
