use std::collections::HashMap;

use crate::types::{RowValues, SqlLiteral};

/// A SQL string and its bound parameters bundled together.
///
/// This is what the preprocessor hands to a driver:
/// ```rust
/// use sql_gateway::prelude::*;
///
/// let qp = QueryAndParams::new(
///     "INSERT INTO t (id, name) VALUES (?, ?)",
///     vec![RowValues::Int(1), RowValues::Text("alice".into())],
/// );
/// # let _ = qp;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// The parameters to be bound to the query
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    /// Create a new `QueryAndParams` with the given query string and parameters
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }
}

/// One argument for a SQL template.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Bound as a parameter.
    Value(RowValues),
    /// Inlined verbatim, with its own parameters appended.
    Literal(SqlLiteral),
}

impl From<SqlLiteral> for Arg {
    fn from(value: SqlLiteral) -> Self {
        Arg::Literal(value)
    }
}

impl From<RowValues> for Arg {
    fn from(value: RowValues) -> Self {
        Arg::Value(value)
    }
}

macro_rules! value_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Value(RowValues::from(value))
                }
            }
        )*
    };
}

value_arg!(
    i64,
    i32,
    f64,
    bool,
    &str,
    String,
    chrono::NaiveDateTime,
    Vec<u8>,
    serde_json::Value,
    Option<i64>,
    Option<String>,
    Option<&str>,
);

/// Positional and named arguments for a SQL template.
///
/// ```rust
/// use sql_gateway::prelude::*;
///
/// let args = QueryArgs::new().arg(1).arg("bob").named("limit", 10);
/// assert_eq!(args.positional().len(), 2);
/// assert!(args.get_named("limit").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs {
    positional: Vec<Arg>,
    named: HashMap<String, Arg>,
}

impl QueryArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<Arg>) -> Self {
        self.positional.push(value.into());
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn positional(&self) -> &[Arg] {
        &self.positional
    }

    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&Arg> {
        self.named.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

impl From<()> for QueryArgs {
    fn from((): ()) -> Self {
        QueryArgs::default()
    }
}

impl From<Vec<Arg>> for QueryArgs {
    fn from(positional: Vec<Arg>) -> Self {
        QueryArgs {
            positional,
            named: HashMap::new(),
        }
    }
}

impl From<Vec<RowValues>> for QueryArgs {
    fn from(values: Vec<RowValues>) -> Self {
        values.into_iter().map(Arg::Value).collect::<Vec<_>>().into()
    }
}

impl From<&[RowValues]> for QueryArgs {
    fn from(values: &[RowValues]) -> Self {
        values.to_vec().into()
    }
}
