//! Single-flight execution: at most one outstanding call per key.
//!
//! Callers that ask for a key while a call for it is pending attach to the
//! same shared future and observe the same output. The entry is removed as
//! soon as the call settles, so a failed call is never replayed: the next
//! caller starts a fresh one.
//!
//! Each call is also driven by a background tokio task, so it settles (and
//! leaves the map) even when every caller stops waiting.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

type SharedCall<V> = Shared<BoxFuture<'static, V>>;

/// How a caller took part in a single-flight call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    /// The caller started the call.
    Leader,
    /// The caller attached to a call that was already pending.
    Follower,
}

/// Map from key to the pending shared call for that key.
pub struct SingleFlight<K, V> {
    calls: Arc<Mutex<HashMap<K, SharedCall<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty single-flight group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or attach to the call already pending for it.
    ///
    /// `work` is only invoked when this caller becomes the leader. Dropping
    /// the returned future only stops this caller from waiting. Must be
    /// called from within a tokio runtime.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> (V, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (call, role) = self.join(key, work).await;
        (call.await, role)
    }

    async fn join<F, Fut>(&self, key: K, work: F) -> (SharedCall<V>, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut calls = self.calls.lock().await;
        if let Some(call) = calls.get(&key) {
            return (call.clone(), FlightRole::Follower);
        }

        let registry = Arc::clone(&self.calls);
        let settled_key = key.clone();
        let pending = work();
        let call = async move {
            let value = pending.await;
            registry.lock().await.remove(&settled_key);
            value
        }
        .boxed()
        .shared();

        tokio::spawn(call.clone());
        calls.insert(key, call.clone());
        (call, FlightRole::Leader)
    }

    /// Returns true when a call for `key` is pending.
    pub async fn is_in_flight(&self, key: &K) -> bool {
        self.calls.lock().await.contains_key(key)
    }

    /// Number of keys with a pending call.
    pub async fn in_flight(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for SingleFlight<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("SingleFlight").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn concurrent_callers_share_one_call() {
        let flight = Arc::new(SingleFlight::<&'static str, u32>::new());
        let invocations = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = Arc::clone(&flight);
            let invocations = Arc::clone(&invocations);
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                flight
                    .run("John.3", move || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        async move {
                            gate.notified().await;
                            316
                        }
                    })
                    .await
            }));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(flight.is_in_flight(&"John.3").await);
        gate.notify_one();

        let mut leaders = 0;
        for handle in handles {
            let (value, role) = handle.await.expect("join");
            assert_eq!(value, 316);
            if role == FlightRole::Leader {
                leaders += 1;
            }
        }

        assert_eq!(leaders, 1);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight().await, 0);
    }

    #[tokio::test]
    async fn settled_failure_is_not_replayed() {
        let flight = SingleFlight::<u8, Result<u32, String>>::new();
        let invocations = AtomicUsize::new(0);

        let (first, _) = flight
            .run(1, || {
                invocations.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>("unavailable".to_owned()) }
            })
            .await;
        assert!(first.is_err());

        let (second, role) = flight
            .run(1, || {
                invocations.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(5) }
            })
            .await;

        assert_eq!(second, Ok(5));
        assert_eq!(role, FlightRole::Leader);
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abandoned_call_still_settles() {
        let flight = SingleFlight::<u8, u8>::new();
        let gate = Arc::new(Notify::new());

        let waiter = {
            let gate = Arc::clone(&gate);
            flight.run(7, move || async move {
                gate.notified().await;
                1
            })
        };
        let abandoned = tokio::time::timeout(Duration::from_millis(20), waiter).await;
        assert!(abandoned.is_err());
        assert!(flight.is_in_flight(&7).await);

        gate.notify_one();
        for _ in 0..50 {
            if !flight.is_in_flight(&7).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(flight.in_flight().await, 0);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let flight = SingleFlight::<u8, u8>::new();
        let (a, b) = tokio::join!(
            flight.run(1, || async { 10 }),
            flight.run(2, || async { 20 })
        );

        assert_eq!(a, (10, FlightRole::Leader));
        assert_eq!(b, (20, FlightRole::Leader));
    }
}
