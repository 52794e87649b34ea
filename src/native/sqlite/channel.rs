use rusqlite::types::Value;

use crate::error::NativeError;
use crate::native::{Callback, complete};
use crate::results::{QueryOutcome, ResultSet};

pub(super) const NOT_CONNECTED: &str = "Not connected.";
pub(super) const STATEMENT_NOT_VALID: &str = "Statement is not valid.";

pub(super) enum Command {
    Open {
        path: String,
        callback: Callback<()>,
    },
    Exec {
        sql: String,
        params: Vec<Value>,
        callback: Callback<QueryOutcome>,
    },
    Prepare {
        id: u64,
        sql: String,
        callback: Callback<()>,
    },
    ExecStatement {
        id: u64,
        params: Vec<Value>,
        callback: Callback<QueryOutcome>,
    },
    GetMoreResults {
        id: u64,
        callback: Callback<ResultSet>,
    },
    DropStatement {
        id: u64,
        callback: Callback<()>,
    },
    /// Forget a statement whose handle went away without an explicit drop.
    ReleaseStatement {
        id: u64,
    },
    Commit {
        callback: Callback<()>,
    },
    Rollback {
        callback: Callback<()>,
    },
    Disconnect {
        callback: Callback<()>,
    },
    Shutdown,
}

impl Command {
    /// Settle the command's callback without running it, as the worker is gone.
    pub(super) fn reject(self) {
        let not_connected = || NativeError::message(NOT_CONNECTED);
        let not_valid = || NativeError::message(STATEMENT_NOT_VALID);
        match self {
            Command::Open { callback, .. } => complete(callback, Err(not_connected())),
            Command::Exec { callback, .. } => complete(callback, Err(not_connected())),
            Command::Prepare { callback, .. } => complete(callback, Err(not_connected())),
            Command::Commit { callback } | Command::Rollback { callback } => {
                complete(callback, Err(not_connected()));
            }
            // closing an already-closed session is a no-op for the client
            Command::Disconnect { callback } => complete(callback, Ok(())),
            Command::ExecStatement { callback, .. } => complete(callback, Err(not_valid())),
            Command::GetMoreResults { callback, .. } => complete(callback, Err(not_valid())),
            Command::DropStatement { callback, .. } => complete(callback, Err(not_valid())),
            Command::ReleaseStatement { .. } | Command::Shutdown => {}
        }
    }
}
