//! Completion-callback front-end.
//!
//! Same connection and statement core as the awaitable API, for callers that drive
//! their own scheduling. Each completion runs exactly once, possibly on the native
//! session's thread, so keep it short and hand work off rather than blocking.

use std::sync::Arc;

use crate::config::ConnectionParams;
use crate::connection::{Connection, ConnectionCore, ConnectionState};
use crate::error::SessionError;
use crate::native::NativeSession;
use crate::results::{QueryOutcome, ResultSet};
use crate::statement::{CursorPosition, Statement, StatementCore};
use crate::types::QueryValue;

/// Connection whose operations report through completion callbacks.
pub struct CallbackConnection {
    core: Arc<ConnectionCore>,
}

impl CallbackConnection {
    #[must_use]
    pub fn with_native(native: impl NativeSession + 'static) -> Self {
        Connection::with_native(native).callbacks()
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

    #[must_use]
    pub fn connected(&self) -> bool {
        self.core.connected()
    }

    pub fn connect<F>(&self, params: &ConnectionParams, done: F)
    where
        F: FnOnce(Result<(), SessionError>) + Send + 'static,
    {
        self.core.connect(params, Box::new(done));
    }

    pub fn disconnect<F>(&self, done: F)
    where
        F: FnOnce(Result<(), SessionError>) + Send + 'static,
    {
        self.core.disconnect(Box::new(done));
    }

    pub fn close<F>(&self, done: F)
    where
        F: FnOnce(Result<(), SessionError>) + Send + 'static,
    {
        self.disconnect(done);
    }

    pub fn exec<F>(&self, sql: impl Into<String>, params: Vec<QueryValue>, done: F)
    where
        F: FnOnce(Result<QueryOutcome, SessionError>) + Send + 'static,
    {
        self.core.exec(sql.into(), params, Box::new(done));
    }

    pub fn prepare<F>(&self, sql: impl Into<String>, done: F)
    where
        F: FnOnce(Result<CallbackStatement, SessionError>) + Send + 'static,
    {
        self.core.prepare(
            sql.into(),
            Box::new(move |outcome| done(outcome.map(CallbackStatement::from_core))),
        );
    }

    pub fn commit<F>(&self, done: F)
    where
        F: FnOnce(Result<(), SessionError>) + Send + 'static,
    {
        self.core.commit(Box::new(done));
    }

    pub fn rollback<F>(&self, done: F)
    where
        F: FnOnce(Result<(), SessionError>) + Send + 'static,
    {
        self.core.rollback(Box::new(done));
    }

    /// Switch back to the awaitable front-end.
    #[must_use]
    pub fn into_async(self) -> Connection {
        Connection::from_core(self.core)
    }
}

/// Prepared statement whose operations report through completion callbacks.
#[derive(Clone)]
pub struct CallbackStatement {
    core: Arc<StatementCore>,
}

impl CallbackStatement {
    pub(crate) fn from_core(core: Arc<StatementCore>) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.core.id()
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        self.core.sql()
    }

    #[must_use]
    pub fn cursor(&self) -> CursorPosition {
        self.core.cursor()
    }

    pub fn exec<F>(&self, params: Vec<QueryValue>, done: F)
    where
        F: FnOnce(Result<QueryOutcome, SessionError>) + Send + 'static,
    {
        self.core.exec(params, Box::new(done));
    }

    pub fn get_more_results<F>(&self, done: F)
    where
        F: FnOnce(Result<ResultSet, SessionError>) + Send + 'static,
    {
        self.core.get_more_results(Box::new(done));
    }

    pub fn drop<F>(&self, done: F)
    where
        F: FnOnce(Result<(), SessionError>) + Send + 'static,
    {
        self.core.drop_statement(Box::new(done));
    }

    #[must_use]
    pub fn into_async(self) -> Statement {
        Statement::from_core(self.core)
    }
}
