//! Single-Flight Module
//!
//! Collapses concurrent executions for the same key into one.
//!
//! The first caller for a key starts the execution as a tokio task owned
//! by the in-flight call. Every caller, the first included, then waits on
//! a `watch` channel for the shared result while selecting on its own
//! `CancellationToken`, so one caller giving up never aborts the load
//! for the others. When the last waiter leaves before completion the call
//! is forgotten and its execution token is cancelled.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{CacheError, Result};

type CallMap<T> = Mutex<HashMap<String, Call<T>>>;

// == In-Flight Call ==
/// One outstanding execution and the callers waiting on it.
struct Call<T> {
    id: u64,
    done: watch::Receiver<Option<Result<T>>>,
    /// Guarded by the registry lock
    waiters: usize,
    cancel: CancellationToken,
}

// == Single Flight ==
/// Registry of in-flight calls keyed by string.
pub struct SingleFlight<T> {
    calls: Arc<CallMap<T>>,
    next_id: AtomicU64,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    // == Execute ==
    /// Runs `f` for `key` unless a run is already in flight, in which case
    /// this caller shares that run's result.
    ///
    /// `f` receives the execution's own token, which fires only once every
    /// caller has stopped waiting. `cancel` abandons this caller's wait
    /// with `CacheError::Cancelled`.
    pub async fn execute<F, Fut>(&self, key: &str, cancel: &CancellationToken, f: F) -> Result<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (mut done, id) = self.join_or_start(key, f);
        let _waiter = WaiterGuard {
            calls: &self.calls,
            key,
            id,
        };

        tokio::select! {
            result = wait_for_result(&mut done) => result,
            _ = cancel.cancelled() => {
                debug!(key = %key, "caller stopped waiting on in-flight call");
                Err(CacheError::Cancelled)
            }
        }
    }

    /// Number of calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    fn join_or_start<F, Fut>(&self, key: &str, f: F) -> (watch::Receiver<Option<Result<T>>>, u64)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut calls = self.calls.lock();

        if let Some(call) = calls.get_mut(key) {
            call.waiters += 1;
            trace!(key = %key, waiters = call.waiters, "joined in-flight call");
            return (call.done.clone(), call.id);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        let token = CancellationToken::new();
        calls.insert(
            key.to_string(),
            Call {
                id,
                done: rx.clone(),
                waiters: 1,
                cancel: token.clone(),
            },
        );

        let fut = f(token);
        let registry = self.calls.clone();
        let owned_key = key.to_string();
        tokio::spawn(async move {
            let result = fut.await;
            // Forget the call first so later callers start a fresh run
            remove_if_current(&registry, &owned_key, id);
            let _ = tx.send(Some(result));
        });

        (rx, id)
    }
}

async fn wait_for_result<T: Clone>(done: &mut watch::Receiver<Option<Result<T>>>) -> Result<T> {
    match done.wait_for(Option::is_some).await {
        Ok(value) => (*value)
            .clone()
            .unwrap_or_else(|| Err(CacheError::Internal("in-flight call has no result".into()))),
        Err(_) => Err(CacheError::Internal(
            "in-flight call ended without a result".into(),
        )),
    }
}

fn remove_if_current<T>(calls: &CallMap<T>, key: &str, id: u64) {
    let mut calls = calls.lock();
    if calls.get(key).is_some_and(|call| call.id == id) {
        calls.remove(key);
    }
}

// == Waiter Guard ==
/// Withdraws one waiter when the caller finishes, gives up or is dropped.
struct WaiterGuard<'a, T> {
    calls: &'a CallMap<T>,
    key: &'a str,
    id: u64,
}

impl<T> Drop for WaiterGuard<'_, T> {
    fn drop(&mut self) {
        let mut calls = self.calls.lock();
        let Some(call) = calls.get_mut(self.key) else {
            return;
        };
        if call.id != self.id {
            return;
        }

        call.waiters -= 1;
        if call.waiters == 0 {
            call.cancel.cancel();
            calls.remove(self.key);
            debug!(key = %self.key, "abandoned in-flight call");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_execute_returns_value() {
        let flight = SingleFlight::new();
        let token = CancellationToken::new();

        let v = flight
            .execute("key", &token, |_| async { Ok("bar".to_string()) })
            .await;

        assert_eq!(v, Ok("bar".to_string()));
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_execute_propagates_error() {
        let flight: SingleFlight<String> = SingleFlight::new();
        let token = CancellationToken::new();

        let v = flight
            .execute("key", &token, |_| async {
                Err(CacheError::Loader("boom".into()))
            })
            .await;

        assert_eq!(v, Err(CacheError::Loader("boom".into())));
    }

    #[tokio::test]
    async fn test_concurrent_calls_collapse() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let flight = flight.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    let token = CancellationToken::new();
                    flight
                        .execute("key", &token, move |_| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(42u32)
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_error() {
        let flight: Arc<SingleFlight<u32>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let flight = flight.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    flight
                        .execute("key", &CancellationToken::new(), move |_| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Err(CacheError::NotFound("key".into()))
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(CacheError::NotFound("key".into())));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_calls_run_fresh() {
        let flight = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        for expected in 1..=3 {
            let calls = calls.clone();
            let v = flight
                .execute("key", &token, move |_| async move {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
                })
                .await;
            assert_eq!(v, Ok(expected));
        }
    }

    #[tokio::test]
    async fn test_different_keys_run_in_parallel() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|key| {
                let flight = flight.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    flight
                        .execute(key, &CancellationToken::new(), move |_| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(key.to_string())
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_others_running() {
        let flight = Arc::new(SingleFlight::new());
        let impatient = CancellationToken::new();

        let slow = |_token: CancellationToken| async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            Ok("done".to_string())
        };

        let first = {
            let flight = flight.clone();
            let impatient = impatient.clone();
            tokio::spawn(async move { flight.execute("key", &impatient, slow).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .execute("key", &CancellationToken::new(), |_| async {
                        Ok("second run".to_string())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        impatient.cancel();

        assert_eq!(first.await.unwrap(), Err(CacheError::Cancelled));
        assert_eq!(second.await.unwrap(), Ok("done".to_string()));
    }

    #[tokio::test]
    async fn test_last_waiter_leaving_cancels_execution() {
        let flight: SingleFlight<u32> = SingleFlight::new();
        let caller = CancellationToken::new();
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();

        caller.cancel();
        let v = flight
            .execute("key", &caller, move |token| async move {
                token.cancelled().await;
                let _ = seen_tx.send(());
                Err(CacheError::Cancelled)
            })
            .await;

        assert_eq!(v, Err(CacheError::Cancelled));
        assert_eq!(flight.in_flight(), 0);
        tokio::time::timeout(Duration::from_secs(1), seen_rx)
            .await
            .expect("execution token was not cancelled")
            .unwrap();
    }
}
