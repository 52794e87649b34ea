//! Connection lifecycle: `Unconnected -> Connected -> Disconnected`.

mod core;
mod state;

use std::sync::Arc;

use crate::adapt::settle;
use crate::callback::CallbackConnection;
use crate::config::ConnectionParams;
use crate::error::SessionError;
use crate::native::NativeSession;
use crate::results::QueryOutcome;
use crate::statement::Statement;
use crate::types::QueryValue;

pub(crate) use self::core::ConnectionCore;
pub use state::ConnectionState;

/// Awaitable connection over a native session.
///
/// Issue one operation at a time and await it before the next; operations settle in
/// the order they were issued. A closed connection cannot be reopened.
pub struct Connection {
    core: Arc<ConnectionCore>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.core.id())
            .field("state", &self.core.state())
            .finish()
    }
}

#[cfg(feature = "sqlite")]
impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// A new, unconnected connection over the bundled `SQLite` session.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn new() -> Self {
        Self::with_native(crate::native::sqlite::SqliteSession::new())
    }

    #[must_use]
    pub fn with_native(native: impl NativeSession + 'static) -> Self {
        Self::from_shared(Arc::new(native))
    }

    /// Like [`with_native`](Self::with_native) for an already shared session.
    #[must_use]
    pub fn from_shared(native: Arc<dyn NativeSession>) -> Self {
        Self {
            core: ConnectionCore::new(native),
        }
    }

    pub(crate) fn from_core(core: Arc<ConnectionCore>) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.core.id()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.core.state()
    }

    /// True only between a successful connect and the next disconnect.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.core.connected()
    }

    /// # Errors
    /// `ConnectionState` unless unconnected; the native error if connecting fails, in
    /// which case the connection stays unconnected.
    pub async fn connect(&self, params: &ConnectionParams) -> Result<(), SessionError> {
        settle(|reply| self.core.connect(params, reply)).await
    }

    /// Close the connection. It is disconnected afterwards even if this fails.
    ///
    /// # Errors
    /// `ConnectionState` unless connected, or the native disconnect error.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        settle(|reply| self.core.disconnect(reply)).await
    }

    /// Alias for [`disconnect`](Self::disconnect).
    ///
    /// # Errors
    /// See [`disconnect`](Self::disconnect).
    pub async fn close(&self) -> Result<(), SessionError> {
        self.disconnect().await
    }

    /// Execute SQL with positional parameters.
    ///
    /// # Errors
    /// `ConnectionState` unless connected, or the native execution error verbatim.
    pub async fn exec(
        &self,
        sql: impl Into<String>,
        params: Vec<QueryValue>,
    ) -> Result<QueryOutcome, SessionError> {
        let sql = sql.into();
        settle(|reply| self.core.exec(sql, params, reply)).await
    }

    /// # Errors
    /// `ConnectionState` unless connected, or the native error if the SQL does not
    /// compile.
    pub async fn prepare(&self, sql: impl Into<String>) -> Result<Statement, SessionError> {
        let sql = sql.into();
        settle(|reply| self.core.prepare(sql, reply))
            .await
            .map(Statement::from_core)
    }

    /// Make all work since the last commit or rollback durable.
    ///
    /// # Errors
    /// `ConnectionState` unless connected, or the native error.
    pub async fn commit(&self) -> Result<(), SessionError> {
        settle(|reply| self.core.commit(reply)).await
    }

    /// Discard all work since the last commit or rollback, prepared statements included.
    ///
    /// # Errors
    /// `ConnectionState` unless connected, or the native error.
    pub async fn rollback(&self) -> Result<(), SessionError> {
        settle(|reply| self.core.rollback(reply)).await
    }

    /// Switch to the callback front-end over the same connection.
    #[must_use]
    pub fn callbacks(self) -> CallbackConnection {
        CallbackConnection::from_core(self.core)
    }
}
