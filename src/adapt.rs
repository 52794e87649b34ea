//! Turns error-first native callbacks into single-settlement completions.
//!
//! [`guard`] wraps a caller's completion into a native [`Callback`] that settles at most
//! once. [`settle`] builds on it to give an awaitable result. Both front-ends route every
//! native call through these two functions.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::oneshot;
use tracing::warn;

use crate::error::{NativeError, SessionError};
use crate::native::Callback;

/// Caller-side completion: receives the single settlement of one operation.
pub type Reply<T> = Box<dyn FnOnce(Result<T, SessionError>) + Send + 'static>;

/// Owned, type-erased future returned by bound statement operations.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

struct Settlement<T> {
    operation: &'static str,
    reply: Option<Reply<T>>,
}

impl<T> Settlement<T> {
    fn settle(&mut self, err: Option<NativeError>, value: Option<T>) {
        let Some(reply) = self.reply.take() else {
            warn!(
                operation = self.operation,
                "native callback fired after it already settled; ignoring"
            );
            return;
        };
        let outcome = match (err, value) {
            (Some(err), value) => {
                if value.is_some() {
                    warn!(
                        operation = self.operation,
                        "native callback carried both an error and a result; using the error"
                    );
                }
                Err(SessionError::from(err))
            }
            (None, Some(value)) => Ok(value),
            (None, None) => {
                warn!(
                    operation = self.operation,
                    "native callback carried neither an error nor a result"
                );
                Err(SessionError::Contract(format!(
                    "{} settled with neither an error nor a result",
                    self.operation
                )))
            }
        };
        reply(outcome);
    }
}

impl<T> Drop for Settlement<T> {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.take() {
            warn!(
                operation = self.operation,
                "native layer released the callback without settling"
            );
            reply(Err(SessionError::Contract(format!(
                "{} was released without settling",
                self.operation
            ))));
        }
    }
}

/// Wrap `reply` into a native callback that settles it exactly once.
///
/// Later invocations are logged and ignored. An error wins over a result delivered
/// alongside it. A callback released without ever being invoked settles `reply` with
/// [`SessionError::Contract`].
pub fn guard<T: Send + 'static>(operation: &'static str, reply: Reply<T>) -> Callback<T> {
    let mut settlement = Settlement {
        operation,
        reply: Some(reply),
    };
    Box::new(move |err, value| settlement.settle(err, value))
}

/// Issue a callback-style operation and await its single settlement.
///
/// `issue` receives the completion to hand (directly or via [`guard`]) to the native
/// layer. No timeout is applied; timing belongs to the native layer.
///
/// # Errors
/// Returns whatever error the operation settles with, or `SessionError::Contract` if
/// the completion is dropped unsettled.
pub async fn settle<T, F>(issue: F) -> Result<T, SessionError>
where
    T: Send + 'static,
    F: FnOnce(Reply<T>),
{
    let (tx, rx) = oneshot::channel();
    issue(Box::new(move |outcome| {
        let _ = tx.send(outcome);
    }));
    rx.await.map_err(|_| {
        SessionError::Contract("completion was dropped before the operation settled".into())
    })?
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting_reply(hits: &Arc<AtomicUsize>) -> Reply<i32> {
        let hits = Arc::clone(hits);
        Box::new(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn second_invocation_is_ignored() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut callback = guard("exec", counting_reply(&hits));
        callback(None, Some(1));
        callback(Some(NativeError::message("late")), None);
        callback(None, Some(2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_callback_settles_with_contract_error() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&seen);
        let callback = guard::<i32>(
            "commit",
            Box::new(move |outcome| {
                if let Ok(mut slot) = sink.lock() {
                    *slot = Some(outcome.is_err());
                }
            }),
        );
        drop(callback);
        let observed = seen.lock().map(|slot| *slot).unwrap_or(None);
        assert_eq!(observed, Some(true));
    }

    #[tokio::test]
    async fn settle_resolves_from_another_thread() -> Result<(), SessionError> {
        let value = settle(|reply| {
            let mut callback = guard("exec", reply);
            std::thread::spawn(move || callback(None, Some(42)));
        })
        .await?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[tokio::test]
    async fn error_wins_over_result() {
        let outcome = settle(|reply| {
            let mut callback = guard("exec", reply);
            callback(Some(NativeError::new(-141, "Table 'T' not found")), Some(7));
        })
        .await;
        match outcome {
            Err(SessionError::Native(err)) => assert_eq!(err.code, Some(-141)),
            other => panic!("expected native error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_settlement_is_a_contract_violation() {
        let outcome = settle::<(), _>(|reply| {
            let mut callback = guard("rollback", reply);
            callback(None, None);
        })
        .await;
        assert!(matches!(outcome, Err(SessionError::Contract(_))));
    }

    #[tokio::test]
    async fn exhaustion_passes_through_classified() {
        let outcome = settle::<(), _>(|reply| {
            let mut callback = guard("get_more_results", reply);
            callback(Some(NativeError::procedure_completed()), None);
        })
        .await;
        assert!(outcome.is_err_and(|e| e.is_exhausted()));
    }
}
