//! Cache-aside coordination with single-flight computation.
//!
//! The coordinator answers from the store when it can. On a miss it runs the
//! expensive computation once per key: concurrent callers for a key that is
//! already being computed attach to the running computation and receive the
//! same result or the same error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tracing::debug;

use super::{CacheEntry, Fingerprint, ResultCache};
use crate::{DecodedImage, Error};

type SharedResult<V> = Shared<BoxFuture<'static, Result<V, Error>>>;
type Registry<V> = Arc<Mutex<HashMap<Fingerprint, SharedResult<V>>>>;

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Served from a live cache entry.
    Hit,
    /// This caller started the computation.
    Computed,
    /// This caller attached to a computation another caller started.
    Joined,
}

impl Outcome {
    pub fn is_cache_hit(self) -> bool {
        self == Outcome::Hit
    }
}

/// Wraps a [`ResultCache`] with compute-on-miss and request coalescing.
pub struct Coordinator<V> {
    store: Arc<ResultCache<V>>,
    in_flight: Registry<V>,
}

impl<V> Clone for Coordinator<V> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), in_flight: Arc::clone(&self.in_flight) }
    }
}

impl<V> std::fmt::Debug for Coordinator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator").field("store", &self.store).finish_non_exhaustive()
    }
}

/// Removes a key from the in-flight registry when dropped, so a panicking
/// computation does not leave a stale handle behind.
struct Registration<V> {
    key: Fingerprint,
    in_flight: Registry<V>,
}

impl<V> Drop for Registration<V> {
    fn drop(&mut self) {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.key);
    }
}

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(store: Arc<ResultCache<V>>) -> Self {
        Self { store, in_flight: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn store(&self) -> &Arc<ResultCache<V>> {
        &self.store
    }

    /// Number of computations currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Probe the cache without computing anything.
    pub fn lookup(&self, key: &Fingerprint) -> Option<CacheEntry<V>> {
        self.store.get(key)
    }

    /// Decode `raw`, fingerprint the bytes, and return the cached result or
    /// compute it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` without calling `compute` if `raw` is not a
    /// decodable image, otherwise whatever `compute` fails with.
    pub async fn get_or_compute<F, Fut>(&self, raw: &str, compute: F) -> Result<(V, Outcome), Error>
    where
        F: FnOnce(DecodedImage) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        let image = DecodedImage::from_payload(raw)?;
        let key = image.fingerprint();
        self.get_or_compute_keyed(key, move || compute(image)).await
    }

    /// Same as [`get_or_compute`](Self::get_or_compute) for callers that
    /// already derived the key.
    pub async fn get_or_compute_keyed<F, Fut>(&self, key: Fingerprint, compute: F) -> Result<(V, Outcome), Error>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        let (pending, outcome) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            // Checked under the registry lock: a finished computation writes the
            // store before it leaves the registry.
            if let Some(entry) = self.store.get(&key) {
                debug!(key = %key.short(), "cache hit");
                return Ok((entry.payload, Outcome::Hit));
            }

            match in_flight.get(&key) {
                Some(pending) => {
                    debug!(key = %key.short(), "joining in-flight computation");
                    (pending.clone(), Outcome::Joined)
                }
                None => {
                    debug!(key = %key.short(), "cache miss, computing");
                    let pending = self.spawn_computation(key.clone(), compute);
                    in_flight.insert(key, pending.clone());
                    (pending, Outcome::Computed)
                }
            }
        };

        pending.await.map(|value| (value, outcome))
    }

    fn spawn_computation<F, Fut>(&self, key: Fingerprint, compute: F) -> SharedResult<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);

        // Spawned so that a caller abandoning its request does not cancel the work.
        let task = tokio::spawn(async move {
            let _registration = Registration { key: key.clone(), in_flight };
            let result = compute().await;
            match &result {
                Ok(value) => store.put(key, value.clone()),
                Err(e) => debug!(key = %key.short(), error = %e, "computation failed, not caching"),
            }
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(Error::compute_with("computation task did not complete", e)),
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde_json::{Value, json};
    use tokio::task::JoinSet;

    use super::*;
    use crate::cache::{fingerprint, store::DEFAULT_TTL};
    use crate::payload::fixtures::{JPEG_BYTES, PNG_BYTES};

    fn coordinator<V: Clone + Send + Sync + 'static>() -> Coordinator<V> {
        Coordinator::new(Arc::new(ResultCache::new(DEFAULT_TTL)))
    }

    fn counting_stub(
        calls: &Arc<AtomicUsize>, value: Value,
    ) -> impl FnOnce(DecodedImage) -> BoxFuture<'static, Result<Value, Error>> + Send + 'static {
        let calls = Arc::clone(calls);
        move |_image| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(value) }.boxed()
        }
    }

    fn failing_stub(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce(DecodedImage) -> BoxFuture<'static, Result<Value, Error>> + Send + 'static {
        let calls = Arc::clone(calls);
        move |_image| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(Error::compute("upstream returned no image")) }.boxed()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_bob() {
        let coordinator = coordinator::<Value>();
        let img_a = STANDARD.encode(PNG_BYTES);
        let calls = Arc::new(AtomicUsize::new(0));

        let (first, outcome) =
            coordinator.get_or_compute(&img_a, counting_stub(&calls, json!({"style": "bob"}))).await.unwrap();
        assert_eq!(first, json!({"style": "bob"}));
        assert_eq!(outcome, Outcome::Computed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (second, outcome) =
            coordinator.get_or_compute(&img_a, counting_stub(&calls, json!({"style": "pixie"}))).await.unwrap();
        assert_eq!(second, json!({"style": "bob"}));
        assert!(outcome.is_cache_hit());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let key = fingerprint(PNG_BYTES);
        assert_eq!(coordinator.lookup(&key).map(|e| e.payload), Some(json!({"style": "bob"})));
    }

    #[tokio::test]
    async fn test_hit_ignores_payload_wrapping() {
        let coordinator = coordinator::<Value>();
        let calls = Arc::new(AtomicUsize::new(0));

        let plain = STANDARD.encode(JPEG_BYTES);
        let wrapped = format!("data:image/jpeg;base64,{plain}");

        coordinator.get_or_compute(&plain, counting_stub(&calls, json!(1))).await.unwrap();
        let (_, outcome) = coordinator.get_or_compute(&wrapped, counting_stub(&calls, json!(2))).await.unwrap();

        assert_eq!(outcome, Outcome::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let coordinator = coordinator::<Value>();
        let img = STANDARD.encode(PNG_BYTES);
        let calls = Arc::new(AtomicUsize::new(0));

        let err = coordinator.get_or_compute(&img, failing_stub(&calls)).await.unwrap_err();
        assert!(err.is_compute());
        assert!(coordinator.store().is_empty());

        let (value, outcome) = coordinator.get_or_compute(&img, counting_stub(&calls, json!("ok"))).await.unwrap();
        assert_eq!(value, json!("ok"));
        assert_eq!(outcome, Outcome::Computed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_decode_error_skips_compute() {
        let coordinator = coordinator::<Value>();
        let calls = Arc::new(AtomicUsize::new(0));

        let err = coordinator.get_or_compute("%%%", counting_stub(&calls, json!(1))).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_recomputes() {
        let coordinator = coordinator::<Value>();
        let img = STANDARD.encode(PNG_BYTES);
        let calls = Arc::new(AtomicUsize::new(0));

        coordinator.get_or_compute(&img, counting_stub(&calls, json!("v1"))).await.unwrap();

        tokio::time::advance(DEFAULT_TTL - Duration::from_millis(1)).await;
        let (value, _) = coordinator.get_or_compute(&img, counting_stub(&calls, json!("v2"))).await.unwrap();
        assert_eq!(value, json!("v1"));

        tokio::time::advance(Duration::from_millis(2)).await;
        let (value, outcome) = coordinator.get_or_compute(&img, counting_stub(&calls, json!("v2"))).await.unwrap();
        assert_eq!(value, json!("v2"));
        assert_eq!(outcome, Outcome::Computed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_computation() {
        let coordinator = coordinator::<String>();
        let key = fingerprint(PNG_BYTES);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut set = JoinSet::new();
        for i in 0..8 {
            let coordinator = coordinator.clone();
            let key = key.clone();
            let calls = Arc::clone(&calls);
            set.spawn(async move {
                coordinator
                    .get_or_compute_keyed(key, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok(format!("render-{i}"))
                    })
                    .await
            });
        }

        let mut values = Vec::new();
        let mut computed = 0;
        while let Some(joined) = set.join_next().await {
            let (value, outcome) = joined.unwrap().unwrap();
            if outcome == Outcome::Computed {
                computed += 1;
            }
            values.push(value);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(computed, 1);
        assert!(values.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(coordinator.in_flight(), 0);
        assert_eq!(coordinator.lookup(&key).map(|e| e.payload), Some(values[0].clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failure_is_shared_then_retried() {
        let coordinator = coordinator::<String>();
        let key = fingerprint(b"face");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut set = JoinSet::new();
        for _ in 0..4 {
            let coordinator = coordinator.clone();
            let key = key.clone();
            let calls = Arc::clone(&calls);
            set.spawn(async move {
                coordinator
                    .get_or_compute_keyed(key, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        Err::<String, _>(Error::UpstreamRateLimited("quota exhausted".into()))
                    })
                    .await
            });
        }

        while let Some(joined) = set.join_next().await {
            let err = joined.unwrap().unwrap_err();
            assert!(matches!(err, Error::UpstreamRateLimited(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight(), 0);

        let retry_calls = Arc::clone(&calls);
        let (value, outcome) = coordinator
            .get_or_compute_keyed(key, move || async move {
                retry_calls.fetch_add(1, Ordering::SeqCst);
                Ok("recovered".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "recovered");
        assert_eq!(outcome, Outcome::Computed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_abandoned_caller_still_populates_cache() {
        let coordinator = coordinator::<String>();
        let key = fingerprint(b"face");
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let caller = {
            let coordinator = coordinator.clone();
            let key = key.clone();
            tokio::spawn(async move {
                coordinator
                    .get_or_compute_keyed(key, move || async move {
                        let _ = release_rx.await;
                        Ok("finished".to_string())
                    })
                    .await
            })
        };

        while coordinator.in_flight() == 0 {
            tokio::task::yield_now().await;
        }
        caller.abort();
        let _ = caller.await;

        release_tx.send(()).unwrap();
        while coordinator.in_flight() > 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(coordinator.lookup(&key).map(|e| e.payload), Some("finished".to_string()));
    }

    #[tokio::test]
    async fn test_panicking_computation_is_reported_and_cleared() {
        let coordinator = coordinator::<String>();
        let key = fingerprint(b"face");

        let err = coordinator
            .get_or_compute_keyed(key.clone(), || async { panic!("generator blew up") })
            .await
            .unwrap_err();
        assert!(err.is_compute());
        assert_eq!(coordinator.in_flight(), 0);

        let (value, _) = coordinator.get_or_compute_keyed(key, || async { Ok("fine".to_string()) }).await.unwrap();
        assert_eq!(value, "fine");
    }
}
