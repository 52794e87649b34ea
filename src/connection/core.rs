use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::adapt::{Reply, guard};
use crate::config::ConnectionParams;
use crate::error::SessionError;
use crate::native::NativeSession;
use crate::results::QueryOutcome;
use crate::statement::StatementCore;
use crate::types::QueryValue;

use super::state::ConnectionState;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// State machine shared by both front-ends.
///
/// Every operation checks the state before reaching the native session and reports
/// through a single [`Reply`]. The state lock is never held across a native call, so a
/// native session may settle synchronously.
pub(crate) struct ConnectionCore {
    id: u64,
    native: Arc<dyn NativeSession>,
    state: Mutex<ConnectionState>,
}

pub(crate) fn not_connected(state: ConnectionState) -> SessionError {
    match state {
        ConnectionState::Disconnected => {
            SessionError::ConnectionState("Not connected. The connection has been closed.".into())
        }
        _ => SessionError::ConnectionState("Not connected.".into()),
    }
}

impl ConnectionCore {
    pub(crate) fn new(native: Arc<dyn NativeSession>) -> Arc<Self> {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(connection_id = id, "created connection");
        Arc::new(Self {
            id,
            native,
            state: Mutex::new(ConnectionState::Unconnected),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.lock_state()
    }

    fn transition(&self, to: ConnectionState) {
        let mut state = self.lock_state();
        let from = *state;
        debug!(connection_id = self.id, from = %from, to = %to, "connection state change");
        *state = to;
    }

    /// Connected in the state machine and still connected according to the native
    /// session.
    pub(crate) fn connected(&self) -> bool {
        self.state() == ConnectionState::Connected && self.native.connected()
    }

    pub(crate) fn ensure_connected(&self) -> Result<(), SessionError> {
        match self.state() {
            ConnectionState::Connected if self.native.connected() => Ok(()),
            ConnectionState::Connected => {
                debug!(connection_id = self.id, "native session reports the link lost");
                Err(not_connected(ConnectionState::Connected))
            }
            other => Err(not_connected(other)),
        }
    }

    pub(crate) fn connect(self: &Arc<Self>, params: &ConnectionParams, reply: Reply<()>) {
        let current = {
            let mut state = self.lock_state();
            let current = *state;
            if current == ConnectionState::Unconnected {
                *state = ConnectionState::Connecting;
            }
            current
        };
        match current {
            ConnectionState::Unconnected => {}
            ConnectionState::Connecting | ConnectionState::Connected => {
                return reply(Err(SessionError::ConnectionState(
                    "Connection already exists.".into(),
                )));
            }
            ConnectionState::Disconnected => {
                return reply(Err(SessionError::ConnectionState(
                    "Connection has been closed; create a new connection to reconnect.".into(),
                )));
            }
        }
        debug!(connection_id = self.id, params = ?params, "connecting");
        let core = Arc::clone(self);
        self.native.connect(
            params,
            guard(
                "connect",
                Box::new(move |outcome| {
                    core.transition(if outcome.is_ok() {
                        ConnectionState::Connected
                    } else {
                        ConnectionState::Unconnected
                    });
                    reply(outcome);
                }),
            ),
        );
    }

    /// Close the connection. The state becomes `Disconnected` whatever the native
    /// layer reports.
    pub(crate) fn disconnect(&self, reply: Reply<()>) {
        {
            let mut state = self.lock_state();
            if *state != ConnectionState::Connected {
                let current = *state;
                drop(state);
                reply(Err(not_connected(current)));
                return;
            }
            *state = ConnectionState::Disconnected;
        }
        debug!(connection_id = self.id, "disconnecting");
        self.native.disconnect(guard("disconnect", reply));
    }

    pub(crate) fn exec(&self, sql: String, params: Vec<QueryValue>, reply: Reply<QueryOutcome>) {
        if let Err(err) = self.ensure_connected() {
            reply(Err(err));
            return;
        }
        debug!(connection_id = self.id, sql = %sql, params = params.len(), "exec");
        self.native.exec(sql, params, guard("exec", reply));
    }

    pub(crate) fn prepare(self: &Arc<Self>, sql: String, reply: Reply<Arc<StatementCore>>) {
        if let Err(err) = self.ensure_connected() {
            reply(Err(err));
            return;
        }
        debug!(connection_id = self.id, sql = %sql, "prepare");
        let owner = Arc::downgrade(self);
        let text = sql.clone();
        self.native.prepare(
            sql,
            guard(
                "prepare",
                Box::new(move |outcome| {
                    reply(outcome.map(|native| StatementCore::new(owner, text, native)));
                }),
            ),
        );
    }

    pub(crate) fn commit(&self, reply: Reply<()>) {
        if let Err(err) = self.ensure_connected() {
            reply(Err(err));
            return;
        }
        debug!(connection_id = self.id, "commit");
        self.native.commit(guard("commit", reply));
    }

    pub(crate) fn rollback(&self, reply: Reply<()>) {
        if let Err(err) = self.ensure_connected() {
            reply(Err(err));
            return;
        }
        debug!(connection_id = self.id, "rollback");
        self.native.rollback(guard("rollback", reply));
    }
}
