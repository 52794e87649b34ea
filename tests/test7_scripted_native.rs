//! A scripted native session checks the adaptation contract without a database.

mod common;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sql_session::prelude::*;

/// How the scripted session answers `exec`.
#[derive(Clone, Copy)]
enum Behaviour {
    Normal,
    Twice,
    ErrorAndResult,
    Neither,
    Forget,
    Delayed(u64),
}

#[derive(Default)]
struct Script {
    exec: Mutex<VecDeque<Behaviour>>,
    fail_connect: bool,
    fail_disconnect: bool,
    link_lost: AtomicBool,
    execs: AtomicUsize,
}

struct ScriptedSession {
    script: Arc<Script>,
}

fn rows(value: i64) -> QueryOutcome {
    let mut rs = ResultSet::new(vec!["n".to_owned()]);
    rs.add_row_values(vec![RowValues::Int(value)]);
    QueryOutcome::Rows(rs)
}

impl NativeSession for ScriptedSession {
    fn connect(&self, _params: &ConnectionParams, mut callback: Callback<()>) {
        if self.script.fail_connect {
            callback(Some(NativeError::new(-100, "Database server not found")), None);
        } else {
            callback(None, Some(()));
        }
    }

    fn disconnect(&self, mut callback: Callback<()>) {
        if self.script.fail_disconnect {
            callback(Some(NativeError::new(-308, "Connection was terminated")), None);
        } else {
            callback(None, Some(()));
        }
    }

    fn exec(&self, sql: String, _params: Vec<QueryValue>, mut callback: Callback<QueryOutcome>) {
        let n = i64::try_from(self.script.execs.fetch_add(1, Ordering::SeqCst)).unwrap_or(-1);
        let behaviour = self
            .script
            .exec
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(Behaviour::Normal);
        tracing::debug!(sql = %sql, n, "scripted exec");
        match behaviour {
            Behaviour::Normal => callback(None, Some(rows(n))),
            Behaviour::Twice => {
                callback(None, Some(rows(n)));
                callback(Some(NativeError::message("second settlement")), None);
            }
            Behaviour::ErrorAndResult => {
                callback(Some(NativeError::new(-131, "Syntax error")), Some(rows(n)));
            }
            Behaviour::Neither => callback(None, None),
            Behaviour::Forget => drop(callback),
            Behaviour::Delayed(ms) => {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(ms));
                    callback(None, Some(rows(n)));
                });
            }
        }
    }

    fn prepare(&self, _sql: String, mut callback: Callback<Arc<dyn NativeStatement>>) {
        callback(None, Some(Arc::new(ScriptedStatement::default())));
    }

    fn commit(&self, mut callback: Callback<()>) {
        callback(None, Some(()));
    }

    fn rollback(&self, mut callback: Callback<()>) {
        callback(None, Some(()));
    }

    fn connected(&self) -> bool {
        !self.script.link_lost.load(Ordering::SeqCst)
    }
}

/// Statement with two result sets per execution.
#[derive(Default)]
struct ScriptedStatement {
    remaining: Mutex<Option<usize>>,
}

impl NativeStatement for ScriptedStatement {
    fn exec(&self, _params: Vec<QueryValue>, mut callback: Callback<QueryOutcome>) {
        if let Ok(mut remaining) = self.remaining.lock() {
            *remaining = Some(1);
        }
        callback(None, Some(rows(0)));
    }

    fn get_more_results(&self, mut callback: Callback<ResultSet>) {
        let mut remaining = match self.remaining.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match *remaining {
            Some(left) if left > 0 => {
                *remaining = Some(left - 1);
                drop(remaining);
                callback(None, rows(1).into_rows());
            }
            // older clients report completion by text alone
            Some(_) => callback(Some(NativeError::message("Procedure has completed")), None),
            None => callback(Some(NativeError::new(-180, "Cursor not open")), None),
        }
    }

    fn drop_statement(&self, mut callback: Callback<()>) {
        callback(None, Some(()));
    }
}

fn scripted(script: Script) -> (Connection, Arc<Script>) {
    common::init_tracing();
    let script = Arc::new(script);
    let conn = Connection::with_native(ScriptedSession {
        script: Arc::clone(&script),
    });
    (conn, script)
}

fn queue(script: &Script, behaviours: &[Behaviour]) {
    if let Ok(mut q) = script.exec.lock() {
        q.extend(behaviours.iter().copied());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn contract_violations_settle_once_and_keep_state() -> Result<(), SessionError> {
    let (conn, script) = scripted(Script::default());
    conn.connect(&ConnectionParams::default()).await?;
    queue(
        &script,
        &[
            Behaviour::Twice,
            Behaviour::ErrorAndResult,
            Behaviour::Neither,
            Behaviour::Forget,
        ],
    );

    let first = conn.exec("one", params![]).await?;
    assert!(first.is_rows());

    match conn.exec("two", params![]).await {
        Err(SessionError::Native(err)) => assert_eq!(err.code, Some(-131)),
        other => panic!("expected the error to win, got {other:?}"),
    }
    assert!(matches!(conn.exec("three", params![]).await, Err(SessionError::Contract(_))));
    assert!(matches!(conn.exec("four", params![]).await, Err(SessionError::Contract(_))));

    // none of the above disturbed the connection
    assert!(conn.connected());
    let after = conn.exec("five", params![]).await?;
    assert!(after.is_rows());
    assert_eq!(script.execs.load(Ordering::SeqCst), 5);
    conn.disconnect().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sequential_operations_settle_in_issue_order() -> Result<(), SessionError> {
    let (conn, script) = scripted(Script::default());
    conn.connect(&ConnectionParams::default()).await?;
    queue(
        &script,
        &[
            Behaviour::Delayed(30),
            Behaviour::Normal,
            Behaviour::Delayed(5),
            Behaviour::Normal,
        ],
    );
    let mut seen = Vec::new();
    for sql in ["a", "b", "c", "d"] {
        let outcome = conn.exec(sql, params![]).await?;
        let n = outcome
            .rows()
            .and_then(ResultSet::first)
            .and_then(|row| row.get("n"))
            .and_then(RowValues::as_int)
            .copied();
        seen.push(n);
    }
    assert_eq!(seen, vec![Some(0), Some(1), Some(2), Some(3)]);
    conn.disconnect().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_failure_is_surfaced_and_not_terminal() {
    let (conn, _script) = scripted(Script {
        fail_connect: true,
        ..Script::default()
    });
    let err = conn.connect(&ConnectionParams::default()).await;
    match err {
        Err(SessionError::Native(native)) => {
            assert_eq!(native.to_string(), "Code: -100 Msg: Database server not found");
        }
        other => panic!("expected a native error, got {other:?}"),
    }
    assert_eq!(conn.state(), ConnectionState::Unconnected);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_disconnect_still_disconnects() -> Result<(), SessionError> {
    let (conn, _script) = scripted(Script {
        fail_disconnect: true,
        ..Script::default()
    });
    conn.connect(&ConnectionParams::default()).await?;
    let stmt = conn.prepare("CALL p()").await?;

    let closed = conn.disconnect().await;
    assert!(matches!(closed, Err(SessionError::Native(_))));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(!conn.connected());
    assert!(conn.exec("x", params![]).await.is_err_and(|e| e.is_connection_state()));
    assert!(stmt.exec(params![]).await.is_err_and(|e| e.is_statement_invalid()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn lost_native_link_rejects_work() -> Result<(), SessionError> {
    let (conn, script) = scripted(Script::default());
    conn.connect(&ConnectionParams::default()).await?;
    let stmt = conn.prepare("CALL two_sets()").await?;

    script.link_lost.store(true, Ordering::SeqCst);
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert!(!conn.connected());
    assert!(conn.exec("x", params![]).await.is_err_and(|e| e.is_connection_state()));
    assert!(conn.commit().await.is_err_and(|e| e.is_connection_state()));
    assert!(stmt.exec(params![]).await.is_err_and(|e| e.is_statement_invalid()));
    assert_eq!(script.execs.load(Ordering::SeqCst), 0);

    script.link_lost.store(false, Ordering::SeqCst);
    assert!(conn.connected());
    assert_eq!(stmt.collect_result_sets(params![]).await?.len(), 2);
    conn.disconnect().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn text_only_exhaustion_is_recognised() -> Result<(), SessionError> {
    let (conn, _script) = scripted(Script::default());
    conn.connect(&ConnectionParams::default()).await?;
    let stmt = conn.prepare("CALL two_sets()").await?;

    let early = stmt.get_more_results().await;
    assert_eq!(early.err().and_then(|e| e.native_code()), Some(-180));

    let sets = stmt.collect_result_sets(params![]).await?;
    assert_eq!(sets.len(), 2);
    assert!(stmt.cursor().is_exhausted());

    let again = stmt.get_more_results().await;
    assert!(again.is_err_and(|e| e.is_exhausted()));

    let advance = stmt.get_more_results_fn();
    stmt.exec(params![]).await?;
    drop(stmt);
    assert_eq!(advance().await?.len(), 1);
    assert!(advance().await.is_err_and(|e| e.is_exhausted()));
    conn.disconnect().await?;
    Ok(())
}
