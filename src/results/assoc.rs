use std::collections::HashMap;

use super::row::Row;
use crate::error::SqlGatewayError;
use crate::types::RowValues;

/// Value side of [`ResultSet::fetch_pairs`](super::ResultSet::fetch_pairs).
#[derive(Debug, Clone, PartialEq)]
pub enum PairValue {
    Value(RowValues),
    Row(Row),
}

impl PairValue {
    #[must_use]
    pub fn as_value(&self) -> Option<&RowValues> {
        match self {
            PairValue::Value(v) => Some(v),
            PairValue::Row(_) => None,
        }
    }

    #[must_use]
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            PairValue::Row(r) => Some(r),
            PairValue::Value(_) => None,
        }
    }
}

/// Nested tree built by [`ResultSet::fetch_assoc`](super::ResultSet::fetch_assoc).
#[derive(Debug, Clone, PartialEq)]
pub enum AssocNode {
    /// One level of the path, keyed by that column's value in first-seen order.
    Branch(Vec<(RowValues, AssocNode)>),
    Row(Row),
    /// Leaf of a path ending in `[]`.
    Rows(Vec<Row>),
}

impl AssocNode {
    #[must_use]
    pub fn get(&self, key: &RowValues) -> Option<&AssocNode> {
        match self {
            AssocNode::Branch(children) => children.iter().find(|(k, _)| k == key).map(|(_, n)| n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            AssocNode::Row(row) => Some(row),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            AssocNode::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Number of direct children (branches) or rows (leaves).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            AssocNode::Branch(children) => children.len(),
            AssocNode::Row(_) => 1,
            AssocNode::Rows(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn require_column(row: &Row, column: &str) -> Result<usize, SqlGatewayError> {
    row.get_column_index(column).ok_or_else(|| {
        SqlGatewayError::InvalidArgument(format!("unknown column '{column}' in result set"))
    })
}

fn cell(row: &Row, idx: usize) -> RowValues {
    row.get_by_index(idx).cloned().unwrap_or(RowValues::Null)
}

pub(super) fn build_pairs(
    rows: &[Row],
    key: Option<&str>,
    value: Option<&str>,
) -> Result<Vec<(RowValues, PairValue)>, SqlGatewayError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    let key_idx = key.map(|k| require_column(first, k)).transpose()?;
    let value_idx = value.map(|v| require_column(first, v)).transpose()?;

    let mut pairs: Vec<(RowValues, PairValue)> = Vec::with_capacity(rows.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (n, row) in rows.iter().enumerate() {
        let k = match key_idx {
            Some(idx) => cell(row, idx),
            None => RowValues::Int(i64::try_from(n).unwrap_or(i64::MAX)),
        };
        let v = match value_idx {
            Some(idx) => PairValue::Value(cell(row, idx)),
            None => PairValue::Row(row.clone()),
        };
        let fingerprint = format!("{k:?}");
        if let Some(&pos) = seen.get(&fingerprint) {
            pairs[pos].1 = v;
        } else {
            seen.insert(fingerprint, pairs.len());
            pairs.push((k, v));
        }
    }
    Ok(pairs)
}

pub(super) fn build_assoc(rows: &[Row], path: &str) -> Result<AssocNode, SqlGatewayError> {
    let mut segments: Vec<&str> = path.split('.').map(str::trim).collect();
    let collect = segments.last() == Some(&"[]");
    if collect {
        segments.pop();
    }
    if segments.is_empty() || segments.iter().any(|s| s.is_empty() || *s == "[]") {
        return Err(SqlGatewayError::InvalidArgument(format!(
            "invalid associative path '{path}'"
        )));
    }

    let mut root = Vec::new();
    let Some(first) = rows.first() else {
        return Ok(AssocNode::Branch(root));
    };
    let indexes = segments
        .iter()
        .map(|s| require_column(first, s))
        .collect::<Result<Vec<_>, _>>()?;

    for row in rows {
        let keys: Vec<RowValues> = indexes.iter().map(|&idx| cell(row, idx)).collect();
        insert(&mut root, &keys, row, collect);
    }
    Ok(AssocNode::Branch(root))
}

fn insert(children: &mut Vec<(RowValues, AssocNode)>, keys: &[RowValues], row: &Row, collect: bool) {
    let Some((key, rest)) = keys.split_first() else {
        return;
    };
    let pos = children.iter().position(|(k, _)| k == key);

    if rest.is_empty() && !collect {
        match pos {
            Some(i) => children[i].1 = AssocNode::Row(row.clone()),
            None => children.push((key.clone(), AssocNode::Row(row.clone()))),
        }
        return;
    }

    let idx = pos.unwrap_or_else(|| {
        let fresh = if rest.is_empty() {
            AssocNode::Rows(Vec::new())
        } else {
            AssocNode::Branch(Vec::new())
        };
        children.push((key.clone(), fresh));
        children.len() - 1
    });

    match &mut children[idx].1 {
        AssocNode::Rows(list) => list.push(row.clone()),
        AssocNode::Branch(next) => insert(next, rest, row, collect),
        AssocNode::Row(_) => {}
    }
}
