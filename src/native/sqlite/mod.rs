//! Bundled native session backed by `rusqlite`.
//!
//! Each [`SqliteSession`] owns a dedicated worker thread holding the
//! `rusqlite::Connection`. Operations are queued to the worker in issue order and
//! their callbacks fire on that thread. Autocommit is off: the first statement after a
//! commit or rollback opens a transaction.

mod channel;
mod dispatcher;
mod manager;
mod params;
mod query;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::config::ConnectionParams;
use crate::error::NativeError;
use crate::native::{Callback, NativeSession, NativeStatement, complete};
use crate::results::{QueryOutcome, ResultSet};
use crate::types::QueryValue;

use channel::{Command, NOT_CONNECTED};
use manager::{SessionWorker, send_command};

pub use params::{convert_params, query_value_to_sqlite};
pub use query::build_result_set;

/// Option key naming the database file; falls back to `ServerName`, then memory.
pub const DATABASE_FILE_KEY: &str = "DatabaseFile";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Resolve the database path a session opens for `params`.
#[must_use]
pub fn database_path(params: &ConnectionParams) -> String {
    params
        .option(DATABASE_FILE_KEY)
        .map(str::to_owned)
        .or_else(|| params.server_name.clone())
        .unwrap_or_else(|| ":memory:".to_owned())
}

/// Native session over an embedded `SQLite` database.
pub struct SqliteSession {
    id: u64,
    worker: Mutex<Option<SessionWorker>>,
    connected: Arc<AtomicBool>,
    next_statement: AtomicU64,
}

impl Default for SqliteSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            worker: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            next_statement: AtomicU64::new(1),
        }
    }

    fn sender(&self) -> Option<Sender<Command>> {
        let guard = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(SessionWorker::sender)
    }

    fn sender_or_spawn(&self) -> Result<Sender<Command>, NativeError> {
        let mut guard = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(worker) = guard.as_ref() {
            return Ok(worker.sender());
        }
        let worker = SessionWorker::spawn(self.id, Arc::clone(&self.connected)).map_err(|e| {
            NativeError::message(format!("failed to start sqlite session worker: {e}"))
        })?;
        let sender = worker.sender();
        *guard = Some(worker);
        Ok(sender)
    }

    /// Queue a connection-level command, settling it as not connected if no worker runs.
    fn dispatch<T>(&self, callback: Callback<T>, command: impl FnOnce(Callback<T>) -> Command) {
        match self.sender() {
            Some(sender) => send_command(&sender, command(callback)),
            None => complete(callback, Err(NativeError::message(NOT_CONNECTED))),
        }
    }
}

impl NativeSession for SqliteSession {
    fn connect(&self, params: &ConnectionParams, callback: Callback<()>) {
        let path = database_path(params);
        debug!(session_id = self.id, path = %path, "connecting sqlite session");
        match self.sender_or_spawn() {
            Ok(sender) => send_command(&sender, Command::Open { path, callback }),
            Err(err) => complete(callback, Err(err)),
        }
    }

    fn disconnect(&self, callback: Callback<()>) {
        match self.sender() {
            Some(sender) => send_command(&sender, Command::Disconnect { callback }),
            None => complete(callback, Ok(())),
        }
    }

    fn exec(&self, sql: String, params: Vec<QueryValue>, callback: Callback<QueryOutcome>) {
        let params = convert_params(params);
        self.dispatch(callback, |callback| Command::Exec {
            sql,
            params,
            callback,
        });
    }

    fn prepare(&self, sql: String, mut callback: Callback<Arc<dyn NativeStatement>>) {
        let Some(sender) = self.sender() else {
            complete(callback, Err(NativeError::message(NOT_CONNECTED)));
            return;
        };
        let id = self.next_statement.fetch_add(1, Ordering::Relaxed);
        let statement_sender = sender.clone();
        let forward: Callback<()> = Box::new(move |err, prepared| {
            let statement = prepared.map(|()| {
                Arc::new(SqliteStatement::new(id, statement_sender.clone()))
                    as Arc<dyn NativeStatement>
            });
            callback(err, statement);
        });
        send_command(
            &sender,
            Command::Prepare {
                id,
                sql,
                callback: forward,
            },
        );
    }

    fn commit(&self, callback: Callback<()>) {
        self.dispatch(callback, |callback| Command::Commit { callback });
    }

    fn rollback(&self, callback: Callback<()>) {
        self.dispatch(callback, |callback| Command::Rollback { callback });
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Prepared statement registered on a [`SqliteSession`] worker.
pub struct SqliteStatement {
    id: u64,
    sender: Sender<Command>,
    released: AtomicBool,
}

impl SqliteStatement {
    fn new(id: u64, sender: Sender<Command>) -> Self {
        Self {
            id,
            sender,
            released: AtomicBool::new(false),
        }
    }
}

impl NativeStatement for SqliteStatement {
    fn exec(&self, params: Vec<QueryValue>, callback: Callback<QueryOutcome>) {
        send_command(
            &self.sender,
            Command::ExecStatement {
                id: self.id,
                params: convert_params(params),
                callback,
            },
        );
    }

    fn get_more_results(&self, callback: Callback<ResultSet>) {
        send_command(
            &self.sender,
            Command::GetMoreResults {
                id: self.id,
                callback,
            },
        );
    }

    fn drop_statement(&self, callback: Callback<()>) {
        self.released.store(true, Ordering::SeqCst);
        send_command(
            &self.sender,
            Command::DropStatement {
                id: self.id,
                callback,
            },
        );
    }
}

impl Drop for SqliteStatement {
    fn drop(&mut self) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        if self
            .sender
            .send(Command::ReleaseStatement { id: self.id })
            .is_err()
        {
            warn!(statement_id = self.id, "sqlite worker gone before statement release");
        }
    }
}
