use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use crate::adapt::{Reply, guard};
use crate::connection::ConnectionCore;
use crate::error::SessionError;
use crate::native::NativeStatement;
use crate::results::{QueryOutcome, ResultSet};
use crate::types::QueryValue;

use super::cursor::CursorPosition;

static NEXT_STATEMENT_ID: AtomicU64 = AtomicU64::new(1);

struct StatementState {
    /// `None` once the statement has been dropped.
    native: Option<Arc<dyn NativeStatement>>,
    cursor: CursorPosition,
}

/// Prepared statement shared by both front-ends.
///
/// Holds only a weak reference to its connection; validity is checked against the
/// connection's state before every native call.
pub(crate) struct StatementCore {
    id: u64,
    connection: Weak<ConnectionCore>,
    sql: String,
    state: Mutex<StatementState>,
}

impl StatementCore {
    pub(crate) fn new(
        connection: Weak<ConnectionCore>,
        sql: String,
        native: Arc<dyn NativeStatement>,
    ) -> Arc<Self> {
        let id = NEXT_STATEMENT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            statement_id = id,
            connection_id = ?connection.upgrade().map(|c| c.id()),
            "prepared statement"
        );
        Arc::new(Self {
            id,
            connection,
            sql,
            state: Mutex::new(StatementState {
                native: Some(native),
                cursor: CursorPosition::Unexecuted,
            }),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn sql(&self) -> &str {
        &self.sql
    }

    fn lock_state(&self) -> MutexGuard<'_, StatementState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cursor(&self) -> CursorPosition {
        self.lock_state().cursor
    }

    fn connection_live(&self) -> Result<(), SessionError> {
        match self.connection.upgrade() {
            Some(connection) if connection.connected() => Ok(()),
            Some(_) => Err(SessionError::StatementInvalid(
                "owning connection is not connected".into(),
            )),
            None => Err(SessionError::StatementInvalid(
                "owning connection no longer exists".into(),
            )),
        }
    }

    /// The native handle, if this statement may still reach the native layer.
    fn handle(&self) -> Result<Arc<dyn NativeStatement>, SessionError> {
        let native = self
            .lock_state()
            .native
            .clone()
            .ok_or_else(|| SessionError::StatementInvalid("statement has been dropped".into()))?;
        self.connection_live()?;
        Ok(native)
    }

    pub(crate) fn exec(self: &Arc<Self>, params: Vec<QueryValue>, reply: Reply<QueryOutcome>) {
        let native = match self.handle() {
            Ok(native) => native,
            Err(err) => return reply(Err(err)),
        };
        debug!(statement_id = self.id, params = params.len(), "statement exec");
        let core = Arc::clone(self);
        native.exec(
            params,
            guard(
                "statement exec",
                Box::new(move |outcome| {
                    core.lock_state().cursor = CursorPosition::after_exec(&outcome);
                    reply(outcome);
                }),
            ),
        );
    }

    pub(crate) fn get_more_results(self: &Arc<Self>, reply: Reply<ResultSet>) {
        let native = match self.handle() {
            Ok(native) => native,
            Err(err) => return reply(Err(err)),
        };
        let core = Arc::clone(self);
        native.get_more_results(guard(
            "get_more_results",
            Box::new(move |outcome| {
                let cursor = {
                    let mut state = core.lock_state();
                    state.cursor = state.cursor.after_advance(&outcome);
                    state.cursor
                };
                debug!(statement_id = core.id, cursor = ?cursor, "advanced result set");
                reply(outcome);
            }),
        ));
    }

    /// Release the statement. Later operations fail as statement-invalid even when the
    /// native drop reports an error.
    pub(crate) fn drop_statement(&self, reply: Reply<()>) {
        let native = self.lock_state().native.take();
        let Some(native) = native else {
            return reply(Err(SessionError::StatementInvalid(
                "statement has been dropped".into(),
            )));
        };
        if let Err(err) = self.connection_live() {
            return reply(Err(err));
        }
        debug!(statement_id = self.id, "drop statement");
        native.drop_statement(guard("drop", reply));
    }
}
