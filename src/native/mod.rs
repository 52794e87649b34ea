//! Boundary with the native database client.
//!
//! Every operation takes an error-first completion callback and returns immediately;
//! the client performs the work elsewhere and reports exactly one settlement through
//! the callback, in the order operations were issued on that session. `connected` is
//! the only synchronous query; it is consulted alongside the connection state before
//! every operation.
//!
//! The callback is `FnMut` because nothing at this boundary stops a client from
//! invoking it more than once, or with both slots filled. The session layer guards
//! against both (see [`crate::adapt`]).

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use crate::config::ConnectionParams;
use crate::error::NativeError;
use crate::results::{QueryOutcome, ResultSet};
use crate::types::QueryValue;

/// Error-first completion: `(Some(error), None)` on failure, `(None, Some(result))` on success.
pub type Callback<T> = Box<dyn FnMut(Option<NativeError>, Option<T>) + Send + 'static>;

/// One physical connection to the database server.
pub trait NativeSession: Send + Sync {
    fn connect(&self, params: &ConnectionParams, callback: Callback<()>);

    /// Close the connection, releasing every statement prepared on it.
    fn disconnect(&self, callback: Callback<()>);

    fn exec(&self, sql: String, params: Vec<QueryValue>, callback: Callback<QueryOutcome>);

    fn prepare(&self, sql: String, callback: Callback<Arc<dyn NativeStatement>>);

    fn commit(&self, callback: Callback<()>);

    fn rollback(&self, callback: Callback<()>);

    /// Whether the physical link is up. Must turn true before a successful `connect`
    /// settles. Once it reads false, the session layer rejects further work on the
    /// connection and invalidates its statements until it reads true again.
    fn connected(&self) -> bool;
}

/// A prepared statement living on a [`NativeSession`].
pub trait NativeStatement: Send + Sync {
    fn exec(&self, params: Vec<QueryValue>, callback: Callback<QueryOutcome>);

    /// Advance to the next result set of the last execution.
    ///
    /// Fails with [`NativeError::procedure_completed`] once none remain.
    fn get_more_results(&self, callback: Callback<ResultSet>);

    fn drop_statement(&self, callback: Callback<()>);
}

/// Settle a native callback from a `Result`.
pub fn complete<T>(mut callback: Callback<T>, outcome: Result<T, NativeError>) {
    match outcome {
        Ok(value) => callback(None, Some(value)),
        Err(err) => callback(Some(err), None),
    }
}
