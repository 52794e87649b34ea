//! Prepared statements and the result iteration protocol.
//!
//! A statement produces its first result set from [`Statement::exec`]; each further
//! one comes from [`Statement::get_more_results`] until the native layer reports
//! exhaustion. [`Statement::next_result_set`] exposes the same walk with exhaustion
//! mapped to `None`.

mod core;
pub mod cursor;

use std::sync::Arc;

use crate::adapt::{BoxFuture, settle};
use crate::callback::CallbackStatement;
use crate::error::SessionError;
use crate::results::{QueryOutcome, ResultSet};
use crate::types::QueryValue;

pub(crate) use self::core::StatementCore;
pub use cursor::CursorPosition;

/// Awaitable handle to a statement prepared on a [`Connection`](crate::Connection).
///
/// Does not keep the connection alive. Once the connection closes or the statement is
/// dropped, every operation fails with [`SessionError::StatementInvalid`].
#[derive(Clone)]
pub struct Statement {
    core: Arc<StatementCore>,
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("id", &self.core.id())
            .field("sql", &self.core.sql())
            .field("cursor", &self.core.cursor())
            .finish()
    }
}

impl Statement {
    pub(crate) fn from_core(core: Arc<StatementCore>) -> Self {
        Self { core }
    }

    /// Process-unique id used in log events.
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

    /// Execute with positional parameters.
    ///
    /// # Errors
    /// `StatementInvalid` if the statement was dropped or its connection is closed;
    /// otherwise whatever the native layer reports, e.g. a parameter-binding error.
    pub async fn exec(&self, params: Vec<QueryValue>) -> Result<QueryOutcome, SessionError> {
        settle(|reply| self.core.exec(params, reply)).await
    }

    /// Advance to the next result set of the last execution.
    ///
    /// # Errors
    /// [`SessionError::Exhausted`] once no result sets remain, on every further call too.
    pub async fn get_more_results(&self) -> Result<ResultSet, SessionError> {
        settle(|reply| self.core.get_more_results(reply)).await
    }

    /// Like [`get_more_results`](Self::get_more_results), with exhaustion as `Ok(None)`.
    ///
    /// # Errors
    /// Any failure other than exhaustion.
    pub async fn next_result_set(&self) -> Result<Option<ResultSet>, SessionError> {
        match self.get_more_results().await {
            Ok(result_set) => Ok(Some(result_set)),
            Err(err) if err.is_exhausted() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Execute and drain every result set in production order.
    ///
    /// A row-count execution contributes no result set of its own.
    ///
    /// # Errors
    /// The first failure from the execution or from advancing.
    pub async fn collect_result_sets(
        &self,
        params: Vec<QueryValue>,
    ) -> Result<Vec<ResultSet>, SessionError> {
        let mut result_sets = Vec::new();
        if let QueryOutcome::Rows(first) = self.exec(params).await? {
            result_sets.push(first);
        }
        while let Some(next) = self.next_result_set().await? {
            result_sets.push(next);
        }
        Ok(result_sets)
    }

    /// Release the statement's native resources.
    ///
    /// Call once; the statement is unusable afterwards whatever the outcome.
    ///
    /// # Errors
    /// `StatementInvalid` if already dropped or the connection is closed, or the
    /// native layer's error.
    pub async fn drop(&self) -> Result<(), SessionError> {
        settle(|reply| self.core.drop_statement(reply)).await
    }

    /// `exec` as an owned operation that outlives this handle.
    pub fn exec_fn(
        &self,
    ) -> impl Fn(Vec<QueryValue>) -> BoxFuture<Result<QueryOutcome, SessionError>>
    + Send
    + Sync
    + 'static {
        let core = Arc::clone(&self.core);
        move |params: Vec<QueryValue>| -> BoxFuture<Result<QueryOutcome, SessionError>> {
            let core = Arc::clone(&core);
            Box::pin(async move { settle(|reply| core.exec(params, reply)).await })
        }
    }

    pub fn get_more_results_fn(
        &self,
    ) -> impl Fn() -> BoxFuture<Result<ResultSet, SessionError>> + Send + Sync + 'static {
        let core = Arc::clone(&self.core);
        move || -> BoxFuture<Result<ResultSet, SessionError>> {
            let core = Arc::clone(&core);
            Box::pin(async move { settle(|reply| core.get_more_results(reply)).await })
        }
    }

    pub fn drop_fn(
        &self,
    ) -> impl Fn() -> BoxFuture<Result<(), SessionError>> + Send + Sync + 'static {
        let core = Arc::clone(&self.core);
        move || -> BoxFuture<Result<(), SessionError>> {
            let core = Arc::clone(&core);
            Box::pin(async move { settle(|reply| core.drop_statement(reply)).await })
        }
    }

    /// Switch to the callback front-end over the same statement.
    #[must_use]
    pub fn callbacks(&self) -> CallbackStatement {
        CallbackStatement::from_core(Arc::clone(&self.core))
    }
}
