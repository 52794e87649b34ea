use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;

use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::{debug, warn};

use crate::error::NativeError;
use crate::native::complete;
use crate::results::{QueryOutcome, ResultSet};

use super::channel::{Command, NOT_CONNECTED, STATEMENT_NOT_VALID};
use super::query::{compile, native_error, run_batch};

/// Code the client reports when advancing a statement that was never executed.
const CURSOR_NOT_OPEN_CODE: i32 = -180;

struct PreparedState {
    sql: String,
    /// Result sets left from the last execution; `None` until the first one.
    pending: Option<VecDeque<ResultSet>>,
}

struct WorkerState {
    session_id: u64,
    conn: Option<Connection>,
    statements: HashMap<u64, PreparedState>,
}

pub(super) fn run_session_worker(
    session_id: u64,
    receiver: &Receiver<Command>,
    connected: &AtomicBool,
) {
    let mut state = WorkerState {
        session_id,
        conn: None,
        statements: HashMap::new(),
    };

    while let Ok(command) = receiver.recv() {
        match command {
            Command::Shutdown => break,
            Command::Open { path, callback } => {
                let outcome = state.open(&path);
                connected.store(state.conn.is_some(), Ordering::SeqCst);
                complete(callback, outcome);
            }
            Command::Disconnect { callback } => {
                let outcome = state.close();
                connected.store(false, Ordering::SeqCst);
                complete(callback, outcome);
            }
            Command::Exec {
                sql,
                params,
                callback,
            } => complete(callback, state.exec(&sql, &params)),
            Command::Prepare { id, sql, callback } => {
                complete(callback, state.prepare(id, sql));
            }
            Command::ExecStatement {
                id,
                params,
                callback,
            } => complete(callback, state.exec_statement(id, &params)),
            Command::GetMoreResults { id, callback } => {
                complete(callback, state.next_result(id));
            }
            Command::DropStatement { id, callback } => {
                let outcome = state
                    .statements
                    .remove(&id)
                    .map(|_| ())
                    .ok_or_else(statement_not_valid);
                debug!(session_id, statement_id = id, "dropped statement");
                complete(callback, outcome);
            }
            Command::ReleaseStatement { id } => {
                state.statements.remove(&id);
            }
            Command::Commit { callback } => complete(callback, state.end_transaction("COMMIT")),
            Command::Rollback { callback } => {
                complete(callback, state.end_transaction("ROLLBACK"));
            }
        }
    }

    if let Err(err) = state.close() {
        warn!(session_id, error = %err, "closing sqlite connection on shutdown failed");
    }
    connected.store(false, Ordering::SeqCst);
    while let Ok(command) = receiver.try_recv() {
        command.reject();
    }
    debug!(session_id, "sqlite session worker exited");
}

impl WorkerState {
    fn conn(&self) -> Result<&Connection, NativeError> {
        self.conn
            .as_ref()
            .ok_or_else(|| NativeError::message(NOT_CONNECTED))
    }

    fn open(&mut self, path: &str) -> Result<(), NativeError> {
        if self.conn.is_some() {
            return Err(NativeError::message("Connection already exists."));
        }
        let conn = Connection::open(path).map_err(native_error)?;
        debug!(session_id = self.session_id, path, "opened sqlite connection");
        self.conn = Some(conn);
        Ok(())
    }

    /// Close the connection; an open transaction is discarded.
    fn close(&mut self) -> Result<(), NativeError> {
        self.statements.clear();
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, err)| native_error(err)),
            None => Ok(()),
        }
    }

    fn exec(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutcome, NativeError> {
        let conn = self.conn()?;
        begin_if_needed(conn)?;
        let (outcome, _) = run_batch(conn, sql, params).map_err(native_error)?;
        Ok(outcome)
    }

    fn prepare(&mut self, id: u64, sql: String) -> Result<(), NativeError> {
        compile(self.conn()?, &sql).map_err(native_error)?;
        self.statements.insert(id, PreparedState { sql, pending: None });
        Ok(())
    }

    fn exec_statement(&mut self, id: u64, params: &[Value]) -> Result<QueryOutcome, NativeError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(statement_not_valid)?;
        let prepared = self.statements.get_mut(&id).ok_or_else(statement_not_valid)?;
        begin_if_needed(conn)?;
        // a failed execution leaves no result sets to advance through
        prepared.pending = Some(VecDeque::new());
        let (outcome, rest) = run_batch(conn, &prepared.sql, params).map_err(native_error)?;
        debug!(
            session_id = self.session_id,
            statement_id = id,
            queued_result_sets = rest.len(),
            "executed prepared statement"
        );
        prepared.pending = Some(rest);
        Ok(outcome)
    }

    fn next_result(&mut self, id: u64) -> Result<ResultSet, NativeError> {
        let prepared = self.statements.get_mut(&id).ok_or_else(statement_not_valid)?;
        match prepared.pending.as_mut() {
            None => Err(NativeError::new(CURSOR_NOT_OPEN_CODE, "Cursor not open")),
            Some(queue) => queue
                .pop_front()
                .ok_or_else(NativeError::procedure_completed),
        }
    }

    fn end_transaction(&mut self, verb: &str) -> Result<(), NativeError> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            conn.execute_batch(verb).map_err(native_error)?;
        }
        Ok(())
    }
}

/// Autocommit is off: every unit of work runs inside an explicit transaction.
fn begin_if_needed(conn: &Connection) -> Result<(), NativeError> {
    if conn.is_autocommit() {
        conn.execute_batch("BEGIN DEFERRED").map_err(native_error)?;
    }
    Ok(())
}

fn statement_not_valid() -> NativeError {
    NativeError::message(STATEMENT_NOT_VALID)
}
