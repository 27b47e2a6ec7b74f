use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// A row from a database query result
///
/// An ordered column-name to value mapping. Column order matches the statement's
/// column order; rows from the same result set share one name list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl Row {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `values` - The values for this row, in column order
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = Arc::new(index_cache(&column_names));
        Self::with_cache(column_names, values, cache)
    }

    pub(crate) fn with_cache(
        column_names: Arc<Vec<String>>,
        values: Vec<RowValues>,
        column_index_cache: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
        }
    }

    /// Build a row from `(name, value)` pairs; a repeated name keeps its first position
    /// and takes the later value. Pairs with an empty name are dropped.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, RowValues)>) -> Self {
        let (names, values) = collapse_pairs(pairs);
        Self::new(Arc::new(names), values)
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index_cache.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }
}

/// Split pairs into parallel names and values, merging repeated names and
/// dropping empty ones.
pub(crate) fn collapse_pairs(pairs: Vec<(String, RowValues)>) -> (Vec<String>, Vec<RowValues>) {
    let mut names: Vec<String> = Vec::with_capacity(pairs.len());
    let mut values: Vec<RowValues> = Vec::with_capacity(pairs.len());
    for (name, value) in pairs {
        if name.is_empty() {
            continue;
        }
        if let Some(pos) = names.iter().position(|n| *n == name) {
            values[pos] = value;
        } else {
            names.push(name);
            values.push(value);
        }
    }
    (names, values)
}

pub(crate) fn index_cache(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_by_name_and_index() {
        let row = Row::new(
            Arc::new(vec!["id".into(), "name".into()]),
            vec![RowValues::Int(1), RowValues::Text("ann".into())],
        );
        assert_eq!(row.get("name"), Some(&RowValues::Text("ann".into())));
        assert_eq!(row.get_by_index(0), Some(&RowValues::Int(1)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
        let names: Vec<&str> = row.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["id", "name"]);
    }

    #[test]
    fn repeated_names_keep_first_position_and_last_value() {
        let row = Row::from_pairs(vec![
            ("id".into(), RowValues::Int(1)),
            ("name".into(), RowValues::Text("a".into())),
            ("id".into(), RowValues::Int(2)),
        ]);
        assert_eq!(row.column_names(), ["id".to_string(), "name".to_string()]);
        assert_eq!(row.get("id"), Some(&RowValues::Int(2)));
    }

    #[test]
    fn empty_names_are_dropped_when_collapsing() {
        let (names, values) = collapse_pairs(vec![
            (String::new(), RowValues::Int(0)),
            ("a".into(), RowValues::Int(1)),
            (String::new(), RowValues::Int(2)),
            ("a".into(), RowValues::Int(3)),
        ]);
        assert_eq!(names, ["a".to_string()]);
        assert_eq!(values, [RowValues::Int(3)]);
    }
}
