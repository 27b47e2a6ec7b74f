use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::assoc::{self, AssocNode, PairValue};
use super::row::{Row, collapse_pairs, index_cache};
use crate::driver::{Driver, ResultDriver};
use crate::error::SqlGatewayError;
use crate::helpers::normalize_value;
use crate::types::{ColumnType, RowValues};

/// Hook applied to every fetched row before it becomes a [`Row`].
pub type RowNormalizer =
    Box<dyn Fn(Vec<(String, RowValues)>) -> Vec<(String, RowValues)> + Send>;

/// Where the forward-only cursor stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing fetched yet.
    Pending,
    /// At least one row has been handed out and more may follow.
    HasRow,
    /// Drained; the native cursor is closed.
    Exhausted,
}

type SharedNames = (Arc<Vec<String>>, Arc<HashMap<String, usize>>);

/// The result of one executed statement.
///
/// Rows are pulled forward-only from the native handle and can optionally be
/// materialized once with [`fetch_all`](Self::fetch_all). The native cursor is
/// closed when the rows run out or when the set is dropped, whichever comes first.
pub struct ResultSet {
    native: Box<dyn ResultDriver>,
    sql: String,
    elapsed: Duration,
    state: CursorState,
    position: usize,
    column_names: Vec<String>,
    normalize_types: bool,
    normalizer: Option<RowNormalizer>,
    column_types: Option<Vec<Option<ColumnType>>>,
    duplicates: Option<Vec<String>>,
    shared_names: Option<SharedNames>,
    materialized: Option<Vec<Row>>,
}

impl ResultSet {
    /// Wrap an already executed native handle.
    #[must_use]
    pub fn new(native: Box<dyn ResultDriver>, sql: impl Into<String>, elapsed: Duration) -> Self {
        let column_names = native.columns().iter().map(|c| c.name.clone()).collect();
        Self {
            native,
            sql: sql.into(),
            elapsed,
            state: CursorState::Pending,
            position: 0,
            column_names,
            normalize_types: true,
            normalizer: None,
            column_types: None,
            duplicates: None,
            shared_names: None,
            materialized: None,
        }
    }

    /// Run `sql` through `driver` right away and time it.
    ///
    /// # Errors
    /// Returns whatever the driver raised for the statement.
    pub fn execute(
        driver: &mut dyn Driver,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Self, SqlGatewayError> {
        let started = Instant::now();
        let native = driver.query(sql, params)?;
        let elapsed = started.elapsed();
        debug!(sql, params = params.len(), ?elapsed, "statement executed");
        Ok(Self::new(native, sql, elapsed))
    }

    /// Toggle column-type-aware value normalization (on by default).
    pub fn set_normalize_types(&mut self, normalize: bool) {
        self.normalize_types = normalize;
    }

    /// Install a hook that rewrites each `(column, value)` list before it becomes a row.
    pub fn set_row_normalizer(
        &mut self,
        normalizer: impl Fn(Vec<(String, RowValues)>) -> Vec<(String, RowValues)> + Send + 'static,
    ) {
        self.normalizer = Some(Box::new(normalizer));
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Wall-clock time the statement took to execute.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Column names as the statement declared them.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of result columns; `None` for statements that return no rows.
    #[must_use]
    pub fn column_count(&self) -> Option<usize> {
        if self.column_names.is_empty() && self.native.affected_rows().is_some() {
            None
        } else {
            Some(self.column_names.len())
        }
    }

    /// Number of rows produced, when known.
    #[must_use]
    pub fn row_count(&self) -> Option<usize> {
        self.native.row_count()
    }

    /// Rows changed by a DML statement.
    #[must_use]
    pub fn affected_rows(&self) -> Option<usize> {
        self.native.affected_rows()
    }

    /// Column names reported by the duplicate-column diagnostic, once the first row was fetched.
    #[must_use]
    pub fn duplicate_columns(&self) -> Option<&[String]> {
        self.duplicates.as_deref()
    }

    /// Semantic type of every column, asked from the driver once and then cached.
    pub fn column_types(&mut self) -> &[Option<ColumnType>] {
        self.column_types
            .get_or_insert_with(|| self.native.column_types())
    }

    /// Next row, or `None` once the rows are exhausted (and on every call after that).
    ///
    /// # Errors
    /// Returns `SqlGatewayError` if the native cursor fails; the cursor is closed in that case.
    pub fn fetch(&mut self) -> Result<Option<Row>, SqlGatewayError> {
        if self.state == CursorState::Exhausted {
            return Ok(None);
        }
        let values = match self.native.fetch() {
            Ok(Some(values)) => values,
            Ok(None) => {
                self.close();
                return Ok(None);
            }
            Err(err) => {
                self.close();
                return Err(err);
            }
        };
        if self.duplicates.is_none() {
            self.report_duplicates();
        }
        let row = self.materialize(values);
        self.state = CursorState::HasRow;
        self.position += 1;
        Ok(Some(row))
    }

    /// First column of the next row.
    ///
    /// # Errors
    /// Returns `SqlGatewayError` if fetching fails.
    pub fn fetch_field(&mut self) -> Result<Option<RowValues>, SqlGatewayError> {
        Ok(self
            .fetch()?
            .and_then(|row| row.into_values().into_iter().next()))
    }

    /// Drain the remaining rows. Later calls return the same rows without touching the cursor.
    ///
    /// # Errors
    /// Returns `SqlGatewayError` if fetching fails.
    pub fn fetch_all(&mut self) -> Result<&[Row], SqlGatewayError> {
        if self.materialized.is_none() {
            let mut rows = Vec::with_capacity(
                self.row_count()
                    .unwrap_or(0)
                    .saturating_sub(self.position),
            );
            while let Some(row) = self.fetch()? {
                rows.push(row);
            }
            self.materialized = Some(rows);
        }
        Ok(self.materialized.as_deref().unwrap_or_default())
    }

    /// First column of every materialized row.
    ///
    /// # Errors
    /// Returns `SqlGatewayError` if fetching fails.
    pub fn fetch_fields(&mut self) -> Result<Vec<RowValues>, SqlGatewayError> {
        Ok(self
            .fetch_all()?
            .iter()
            .map(|row| row.get_by_index(0).cloned().unwrap_or(RowValues::Null))
            .collect())
    }

    /// Key/value projection of the materialized rows.
    ///
    /// The key defaults to the row's position and the value to the whole row.
    /// A repeated key overwrites the earlier value in place.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::InvalidArgument` for an unknown column.
    pub fn fetch_pairs(
        &mut self,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<Vec<(RowValues, PairValue)>, SqlGatewayError> {
        assoc::build_pairs(self.fetch_all()?, key, value)
    }

    /// Nested tree keyed by a dotted column path such as `country.city`.
    ///
    /// A trailing `[]` segment (`country.[]`) collects rows into lists instead of keeping the last one.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::InvalidArgument` for a malformed path or unknown column.
    pub fn fetch_assoc(&mut self, path: &str) -> Result<AssocNode, SqlGatewayError> {
        assoc::build_assoc(self.fetch_all()?, path)
    }

    /// Skip forward so the next `fetch` returns row `row` (zero-based).
    ///
    /// # Errors
    /// Returns `SqlGatewayError::InvalidState` when seeking backwards or after exhaustion,
    /// `SqlGatewayError::InvalidArgument` when `row` is past the end.
    pub fn seek(&mut self, row: usize) -> Result<(), SqlGatewayError> {
        if self.state == CursorState::Exhausted {
            return Err(SqlGatewayError::InvalidState(
                "result set is exhausted and cannot be repositioned".into(),
            ));
        }
        if row < self.position {
            return Err(SqlGatewayError::InvalidState(format!(
                "result set is forward-only: cannot seek back to row {row} from row {}",
                self.position
            )));
        }
        while self.position < row {
            if self.fetch()?.is_none() {
                return Err(SqlGatewayError::InvalidArgument(format!(
                    "row {row} is out of range"
                )));
            }
        }
        Ok(())
    }

    /// Iterate over the remaining rows.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::InvalidState` if the rows were already exhausted; the
    /// native cursor is single-pass and cannot be rewound.
    pub fn iter(&mut self) -> Result<RowIter<'_>, SqlGatewayError> {
        if self.state == CursorState::Exhausted {
            return Err(SqlGatewayError::InvalidState(
                "result set was already iterated to the end and cannot be rewound".into(),
            ));
        }
        Ok(RowIter { set: self })
    }

    fn close(&mut self) {
        self.native.free();
        self.state = CursorState::Exhausted;
    }

    fn report_duplicates(&mut self) {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for name in &self.column_names {
            if !seen.insert(name.as_str()) && !duplicates.contains(name) {
                duplicates.push(name.clone());
            }
        }
        if !duplicates.is_empty() {
            warn!(
                sql = %self.sql,
                "Found duplicate columns in database result set: {}",
                duplicates.join(", ")
            );
        }
        self.duplicates = Some(duplicates);
    }

    fn materialize(&mut self, mut values: Vec<RowValues>) -> Row {
        if self.normalize_types {
            let types = self
                .column_types
                .get_or_insert_with(|| self.native.column_types());
            values = values
                .into_iter()
                .enumerate()
                .map(|(i, v)| match types.get(i).copied().flatten() {
                    Some(ty) => normalize_value(v, ty),
                    None => v,
                })
                .collect();
        }

        let mut pairs: Vec<(String, RowValues)> =
            self.column_names.iter().cloned().zip(values).collect();
        if let Some(normalizer) = &self.normalizer {
            pairs = normalizer(pairs);
        }

        let (names, row_values) = collapse_pairs(pairs);

        if let Some((shared, cache)) = &self.shared_names
            && **shared == names
        {
            return Row::with_cache(Arc::clone(shared), row_values, Arc::clone(cache));
        }
        let cache = Arc::new(index_cache(&names));
        let shared = Arc::new(names);
        self.shared_names = Some((Arc::clone(&shared), Arc::clone(&cache)));
        Row::with_cache(shared, row_values, cache)
    }
}

impl Drop for ResultSet {
    fn drop(&mut self) {
        if self.state != CursorState::Exhausted {
            self.native.free();
        }
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("columns", &self.column_names)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

/// Forward iterator over a [`ResultSet`]; see [`ResultSet::iter`].
pub struct RowIter<'a> {
    set: &'a mut ResultSet,
}

impl Iterator for RowIter<'_> {
    type Item = Result<Row, SqlGatewayError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.set.fetch().transpose()
    }
}
