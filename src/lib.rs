//! One synchronous API over SQL engines whose quoting, pagination, date literals,
//! catalogs and error codes all differ.
//!
//! A [`Connection`] picks a [`Driver`] from the scheme of its target string,
//! preprocesses templated SQL, and hands back forward-only [`ResultSet`]s.
//!
//! ```rust
//! use sql_gateway::prelude::*;
//!
//! let mut conn = Connection::open(ConnectOptions::new("sqlite::memory:")).unwrap();
//! conn.query("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT UNIQUE)", ()).unwrap();
//! conn.query("INSERT INTO t (name) VALUES (?)", QueryArgs::new().arg("a")).unwrap();
//! let err = conn
//!     .query("INSERT INTO t (name) VALUES (?)", QueryArgs::new().arg("a"))
//!     .unwrap_err();
//! assert!(err.is_unique_violation());
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod helpers;
pub mod prelude;
pub mod query;
pub mod reflection;
pub mod registry;
pub mod results;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod translation;
pub mod types;

pub use config::{ConnectOptions, ConnectOptionsBuilder, DateTimeFormat};
pub use connection::{Connection, ConnectionState, QueryEvent};
pub use driver::{Capabilities, Capability, Dialect, Driver, ResultColumn, ResultDriver};
pub use error::{QueryError, QueryErrorKind, SqlGatewayError};
pub use query::{Arg, QueryAndParams, QueryArgs};
pub use reflection::{ColumnInfo, ForeignKeyInfo, IndexInfo, TableInfo};
pub use registry::{DriverFactory, DriverRegistry};
pub use results::{AssocNode, CursorState, PairValue, ResultSet, Row};
pub use translation::{PlaceholderPreprocessor, Preprocessor};
pub use types::{ColumnType, DatabaseType, RowValues, SqlLiteral};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;
