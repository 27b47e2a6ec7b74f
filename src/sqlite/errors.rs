use rusqlite::ffi;

use crate::error::{QueryError, QueryErrorKind, SqlGatewayError};
use crate::types::RowValues;

/// Narrow a native failure down to a constraint kind.
///
/// Only `SQLITE_CONSTRAINT` (including its extended codes) is considered; the
/// message decides which constraint, first match wins. `None` means the failure
/// is not a constraint violation.
#[must_use]
pub fn classify(code: i32, message: &str) -> Option<QueryErrorKind> {
    if code & 0xff != ffi::SQLITE_CONSTRAINT {
        return None;
    }
    let kind = if message.contains("must be unique")
        || message.contains("is not unique")
        || message.contains("UNIQUE constraint failed")
    {
        QueryErrorKind::UniqueConstraintViolation
    } else if message.contains("may not be NULL")
        || message.contains("may not be null")
        || message.contains("NOT NULL constraint failed")
    {
        QueryErrorKind::NotNullConstraintViolation
    } else if message.contains("foreign key constraint failed")
        || message.contains("FOREIGN KEY constraint failed")
    {
        QueryErrorKind::ForeignKeyConstraintViolation
    } else {
        QueryErrorKind::ConstraintViolation
    };
    Some(kind)
}

/// Turn a rusqlite failure into a `SqlGatewayError::Query` carrying the statement.
pub(crate) fn translate(err: rusqlite::Error, sql: &str, params: &[RowValues]) -> SqlGatewayError {
    let (code, message) = match &err {
        rusqlite::Error::SqliteFailure(ffi::Error { extended_code, .. }, msg) => (
            Some(*extended_code),
            msg.clone().unwrap_or_else(|| err.to_string()),
        ),
        other => (None, other.to_string()),
    };
    let kind = code
        .and_then(|c| classify(c, &message))
        .unwrap_or(QueryErrorKind::Driver);
    let mut query_err = QueryError::new(kind, message, sql, params);
    if let Some(code) = code {
        query_err = query_err.with_code(code);
    }
    query_err.with_source(err).into()
}
