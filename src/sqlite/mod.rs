// SQLite dialect.
//
// - config: target parsing and native open
// - params: RowValues to rusqlite binding
// - query: statement execution and the native result handle
// - errors: constraint classification
// - reflection: catalog queries
// - driver: the `Driver` implementation tying the above together

pub mod config;
pub mod driver;
pub mod errors;
pub mod params;
pub mod query;
pub mod reflection;

pub use config::SqliteOptions;
pub use driver::{SQLITE_DIALECT, SqliteDriver};
pub use params::Params;
pub use query::{SqliteResult, build_result};
