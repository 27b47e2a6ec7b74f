//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types
//! to make it easier to get started with the library.

pub use crate::config::{ConnectOptions, ConnectOptionsBuilder, DateTimeFormat};
pub use crate::connection::{Connection, ConnectionState, QueryEvent};
pub use crate::driver::{Capability, Driver};
pub use crate::error::{QueryErrorKind, SqlGatewayError};
pub use crate::query::{QueryAndParams, QueryArgs};
pub use crate::registry::DriverRegistry;
pub use crate::results::{AssocNode, CursorState, PairValue, ResultSet, Row};
pub use crate::translation::Preprocessor;
pub use crate::types::{ColumnType, DatabaseType, RowValues, SqlLiteral};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteDriver;
