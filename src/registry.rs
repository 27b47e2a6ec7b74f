use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ConnectOptions;
use crate::driver::Driver;
use crate::error::SqlGatewayError;

/// Constructs a connected driver from connect options.
pub type DriverFactory =
    Arc<dyn Fn(&ConnectOptions) -> Result<Box<dyn Driver>, SqlGatewayError> + Send + Sync>;

/// Maps target schemes (`sqlite` in `sqlite::memory:`) to driver factories.
///
/// `DriverRegistry::default()` knows every dialect compiled into the crate;
/// `DriverRegistry::empty()` starts blank for callers that bring their own.
#[derive(Clone)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` under `scheme`, replacing any earlier registration.
    /// Schemes are matched case-insensitively.
    pub fn register<F>(&mut self, scheme: &str, factory: F) -> &mut Self
    where
        F: Fn(&ConnectOptions) -> Result<Box<dyn Driver>, SqlGatewayError> + Send + Sync + 'static,
    {
        self.factories
            .insert(scheme.to_ascii_lowercase(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn contains(&self, scheme: &str) -> bool {
        self.factories.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Look up the factory for `scheme`.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` if no driver is registered for it.
    pub fn resolve(&self, scheme: &str) -> Result<DriverFactory, SqlGatewayError> {
        self.factories
            .get(&scheme.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                SqlGatewayError::ConnectionError(format!(
                    "no driver registered for scheme '{scheme}'"
                ))
            })
    }

    /// Resolve the scheme of `opts.target` and build a connected driver.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConnectionError` for an unknown scheme, or whatever the factory raises.
    pub fn connect(&self, opts: &ConnectOptions) -> Result<Box<dyn Driver>, SqlGatewayError> {
        let factory = self.resolve(opts.scheme()?)?;
        factory(opts)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "sqlite")]
        {
            use crate::sqlite::SqliteDriver;
            use crate::types::DatabaseType;
            registry.register(DatabaseType::Sqlite.scheme(), SqliteDriver::boxed);
            registry.register("sqlite3", SqliteDriver::boxed);
        }
        registry
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        f.debug_struct("DriverRegistry")
            .field("schemes", &schemes)
            .finish()
    }
}
