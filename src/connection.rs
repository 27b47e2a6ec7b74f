//! The user-facing handle: lazily connects a driver, runs templated SQL and nests transactions.

mod hooks;
mod transaction;

use std::fmt;
use std::time::Instant;

use tracing::debug;

use crate::config::ConnectOptions;
use crate::driver::Driver;
use crate::error::SqlGatewayError;
use crate::query::QueryArgs;
use crate::registry::DriverRegistry;
use crate::results::{AssocNode, PairValue, ResultSet, Row};
use crate::translation::{PlaceholderPreprocessor, Preprocessor};
use crate::types::RowValues;

pub use hooks::{ConnectHook, QueryEvent, QueryHook};

/// Lifecycle of the driver behind a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// A driver is being built and its `on_connect` hooks are running.
    Connecting,
    Connected,
}

/// One logical database connection.
///
/// The driver is picked from the target scheme the first time it is needed and
/// dropped again by [`disconnect`](Self::disconnect). A `Connection` runs one
/// statement at a time; share it across threads only behind a lock.
///
/// ```rust
/// use sql_gateway::prelude::*;
///
/// let mut conn = Connection::new(ConnectOptions::new("sqlite::memory:"));
/// assert!(!conn.is_connected());
/// conn.query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", ()).unwrap();
/// conn.query("INSERT INTO users (name) VALUES (?)", QueryArgs::new().arg("alice")).unwrap();
/// let row = conn.fetch("SELECT * FROM users WHERE name = :name", QueryArgs::new().named("name", "alice"))
///     .unwrap()
///     .unwrap();
/// assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
/// ```
pub struct Connection {
    options: ConnectOptions,
    registry: DriverRegistry,
    driver: Option<Box<dyn Driver>>,
    state: ConnectionState,
    preprocessor: Box<dyn Preprocessor>,
    depth: usize,
    on_connect: Vec<ConnectHook>,
    on_query: Vec<QueryHook>,
}

impl Connection {
    /// Create a connection that connects on first use.
    #[must_use]
    pub fn new(options: ConnectOptions) -> Self {
        Self::with_registry(options, DriverRegistry::default())
    }

    /// Create a connection and connect right away.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` for an unknown scheme or an unreachable database.
    pub fn open(options: ConnectOptions) -> Result<Self, SqlGatewayError> {
        let mut conn = Self::new(options);
        conn.connect()?;
        Ok(conn)
    }

    /// Like [`new`](Self::new), resolving schemes against `registry`.
    #[must_use]
    pub fn with_registry(options: ConnectOptions, registry: DriverRegistry) -> Self {
        Self {
            options,
            registry,
            driver: None,
            state: ConnectionState::Disconnected,
            preprocessor: Box::new(PlaceholderPreprocessor),
            depth: 0,
            on_connect: Vec::new(),
            on_query: Vec::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    /// Depth of nested [`transaction`](Self::transaction) blocks currently running.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.depth
    }

    /// Replace the SQL template preprocessor.
    pub fn set_preprocessor(&mut self, preprocessor: impl Preprocessor + 'static) {
        self.preprocessor = Box::new(preprocessor);
    }

    /// Register a hook that runs every time a driver connects.
    pub fn on_connect(
        &mut self,
        hook: impl FnMut(&mut dyn Driver) -> Result<(), SqlGatewayError> + Send + 'static,
    ) -> &mut Self {
        self.on_connect.push(Box::new(hook));
        self
    }

    /// Register a hook that observes every executed statement.
    pub fn on_query(&mut self, hook: impl FnMut(&QueryEvent<'_>) + Send + 'static) -> &mut Self {
        self.on_query.push(Box::new(hook));
        self
    }

    /// Connect the driver if there is none yet.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` for an unknown scheme, or the first failing
    /// `on_connect` hook's error.
    pub fn connect(&mut self) -> Result<(), SqlGatewayError> {
        if self.driver.is_some() {
            return Ok(());
        }
        self.state = ConnectionState::Connecting;
        let hooks = &mut self.on_connect;
        let connected = self.registry.connect(&self.options).and_then(|mut driver| {
            for hook in hooks.iter_mut() {
                hook(driver.as_mut())?;
            }
            Ok(driver)
        });
        match connected {
            Ok(driver) => {
                debug!(target = %self.options.target, dialect = driver.dialect().name, "connected");
                self.driver = Some(driver);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Drop the driver. Any open native transaction goes with it.
    pub fn disconnect(&mut self) {
        if self.driver.take().is_some() {
            debug!(target = %self.options.target, "disconnected");
        }
        self.depth = 0;
        self.state = ConnectionState::Disconnected;
    }

    /// # Errors
    /// See [`connect`](Self::connect).
    pub fn reconnect(&mut self) -> Result<(), SqlGatewayError> {
        self.disconnect();
        self.connect()
    }

    /// The connected driver, connecting first if needed.
    ///
    /// # Errors
    /// See [`connect`](Self::connect).
    pub fn driver(&mut self) -> Result<&mut dyn Driver, SqlGatewayError> {
        self.connect()?;
        match self.driver.as_mut() {
            Some(driver) => Ok(driver.as_mut()),
            None => Err(SqlGatewayError::InvalidState(
                "driver missing after connect".into(),
            )),
        }
    }

    /// Preprocess `sql` with `args`, execute it and wrap the outcome.
    ///
    /// `on_query` hooks see the result set or the error before it is returned.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ParameterError` if `args` do not fit the template,
    /// `SqlGatewayError::Query` if the engine rejects the statement.
    pub fn query(
        &mut self,
        sql: &str,
        args: impl Into<QueryArgs>,
    ) -> Result<ResultSet, SqlGatewayError> {
        let args = args.into();
        let started = Instant::now();
        let prepared = match self.preprocessor.process(sql, &args) {
            Ok(prepared) => prepared,
            Err(err) => {
                hooks::notify(
                    &mut self.on_query,
                    &QueryEvent {
                        sql,
                        params: &[],
                        elapsed: started.elapsed(),
                        outcome: Err(&err),
                    },
                );
                return Err(err);
            }
        };

        let normalize_types = self.options.normalize_types;
        let outcome = ResultSet::execute(self.driver()?, &prepared.query, &prepared.params).map(
            |mut result| {
                result.set_normalize_types(normalize_types);
                result
            },
        );
        let elapsed = outcome
            .as_ref()
            .map_or_else(|_| started.elapsed(), ResultSet::elapsed);
        hooks::notify(
            &mut self.on_query,
            &QueryEvent {
                sql: &prepared.query,
                params: &prepared.params,
                elapsed,
                outcome: outcome.as_ref(),
            },
        );
        outcome
    }

    /// Rows changed by the last DML statement.
    #[must_use]
    pub fn affected_rows(&self) -> Option<usize> {
        self.driver.as_ref().and_then(|driver| driver.affected_rows())
    }

    /// Last generated identifier.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::InvalidState` when the engine reports no generated id.
    pub fn insert_id(&mut self, sequence: Option<&str>) -> Result<String, SqlGatewayError> {
        self.driver()?.insert_id(sequence)?.ok_or_else(|| {
            SqlGatewayError::InvalidState("no generated identifier is available".into())
        })
    }

    /// First row of the result.
    ///
    /// # Errors
    /// See [`query`](Self::query).
    pub fn fetch(
        &mut self,
        sql: &str,
        args: impl Into<QueryArgs>,
    ) -> Result<Option<Row>, SqlGatewayError> {
        self.query(sql, args)?.fetch()
    }

    /// First column of the first row.
    ///
    /// # Errors
    /// See [`query`](Self::query).
    pub fn fetch_field(
        &mut self,
        sql: &str,
        args: impl Into<QueryArgs>,
    ) -> Result<Option<RowValues>, SqlGatewayError> {
        self.query(sql, args)?.fetch_field()
    }

    /// First column of every row.
    ///
    /// # Errors
    /// See [`query`](Self::query).
    pub fn fetch_fields(
        &mut self,
        sql: &str,
        args: impl Into<QueryArgs>,
    ) -> Result<Vec<RowValues>, SqlGatewayError> {
        self.query(sql, args)?.fetch_fields()
    }

    /// # Errors
    /// See [`query`](Self::query) and [`ResultSet::fetch_pairs`].
    pub fn fetch_pairs(
        &mut self,
        sql: &str,
        args: impl Into<QueryArgs>,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<Vec<(RowValues, PairValue)>, SqlGatewayError> {
        self.query(sql, args)?.fetch_pairs(key, value)
    }

    /// # Errors
    /// See [`query`](Self::query) and [`ResultSet::fetch_assoc`].
    pub fn fetch_assoc(
        &mut self,
        sql: &str,
        args: impl Into<QueryArgs>,
        path: &str,
    ) -> Result<AssocNode, SqlGatewayError> {
        self.query(sql, args)?.fetch_assoc(path)
    }

    /// Every row of the result.
    ///
    /// # Errors
    /// See [`query`](Self::query).
    pub fn fetch_all(
        &mut self,
        sql: &str,
        args: impl Into<QueryArgs>,
    ) -> Result<Vec<Row>, SqlGatewayError> {
        Ok(self.query(sql, args)?.fetch_all()?.to_vec())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.options.target)
            .field("state", &self.state)
            .field("depth", &self.depth)
            .field("on_connect", &self.on_connect.len())
            .field("on_query", &self.on_query.len())
            .finish_non_exhaustive()
    }
}
