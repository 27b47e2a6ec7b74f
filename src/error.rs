use std::fmt;

use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;

use crate::types::RowValues;

#[derive(Debug, Error)]
pub enum SqlGatewayError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Query(Box<QueryError>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Logic error: {0}")]
    LogicError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlGatewayError {
    /// The translated query failure, if this error came from executing a statement.
    #[must_use]
    pub fn query_error(&self) -> Option<&QueryError> {
        match self {
            Self::Query(err) => Some(err),
            _ => None,
        }
    }

    /// Structured kind of a query failure.
    #[must_use]
    pub fn kind(&self) -> Option<QueryErrorKind> {
        self.query_error().map(|err| err.kind)
    }

    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.kind() == Some(QueryErrorKind::UniqueConstraintViolation)
    }

    #[must_use]
    pub fn is_not_null_violation(&self) -> bool {
        self.kind() == Some(QueryErrorKind::NotNullConstraintViolation)
    }

    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        self.kind() == Some(QueryErrorKind::ForeignKeyConstraintViolation)
    }

    /// True for every constraint flavour, including the generic one.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        self.kind().is_some_and(QueryErrorKind::is_constraint)
    }
}

impl From<QueryError> for SqlGatewayError {
    fn from(err: QueryError) -> Self {
        SqlGatewayError::Query(Box::new(err))
    }
}

/// Classification of a native query failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// Not a constraint failure; a plain driver error.
    Driver,
    UniqueConstraintViolation,
    NotNullConstraintViolation,
    ForeignKeyConstraintViolation,
    /// A constraint failure the driver could not narrow down further.
    ConstraintViolation,
}

impl QueryErrorKind {
    #[must_use]
    pub fn is_constraint(self) -> bool {
        !matches!(self, QueryErrorKind::Driver)
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QueryErrorKind::Driver => "Driver error",
            QueryErrorKind::UniqueConstraintViolation => "Unique constraint violation",
            QueryErrorKind::NotNullConstraintViolation => "Not null constraint violation",
            QueryErrorKind::ForeignKeyConstraintViolation => "Foreign key constraint violation",
            QueryErrorKind::ConstraintViolation => "Constraint violation",
        };
        f.write_str(label)
    }
}

/// A native failure raised while executing a statement, with the statement attached.
#[derive(Debug, Error)]
#[error("{kind}: {message} (SQL: {sql})")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
    /// Native error code, when the engine reports one.
    pub code: Option<i32>,
    pub sql: String,
    pub params: Vec<RowValues>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    #[must_use]
    pub fn new(kind: QueryErrorKind, message: impl Into<String>, sql: &str, params: &[RowValues]) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            sql: sql.to_owned(),
            params: params.to_vec(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}
