use std::time::Duration;

use crate::driver::Driver;
use crate::error::SqlGatewayError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Runs right after a driver connects, in registration order.
///
/// A failing hook fails the connect and the fresh driver is dropped.
pub type ConnectHook = Box<dyn FnMut(&mut dyn Driver) -> Result<(), SqlGatewayError> + Send>;

/// Observes every statement sent through a [`Connection`](crate::Connection), successful or not.
pub type QueryHook = Box<dyn FnMut(&QueryEvent<'_>) + Send>;

/// What an `on_query` hook sees.
#[derive(Debug)]
pub struct QueryEvent<'a> {
    /// Final SQL, or the template when preprocessing failed.
    pub sql: &'a str,
    pub params: &'a [RowValues],
    pub elapsed: Duration,
    pub outcome: Result<&'a ResultSet, &'a SqlGatewayError>,
}

impl QueryEvent<'_> {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&SqlGatewayError> {
        self.outcome.err()
    }
}

pub(super) fn notify(hooks: &mut [QueryHook], event: &QueryEvent<'_>) {
    for hook in hooks {
        hook(event);
    }
}
