//! Cached, fallback-capable entropy supply.
//!
//! `EntropySource` keeps a pool of bytes fetched from a remote quantum
//! random number service. Callers draw from the pool; when it runs dry a
//! refill is fetched, and when the remote is unreachable the pool is filled
//! from the operating system CSPRNG instead. Entropy requests never fail
//! because of the remote: the only error a caller can see is
//! `Error::InvalidLength`.
//!
//! ```no_run
//! # #[cfg(feature = "network")]
//! # async fn demo() -> quantum_vault_core::Result<()> {
//! use quantum_vault_core::config::EntropyConfig;
//! use quantum_vault_core::entropy::EntropySource;
//!
//! let entropy = EntropySource::new(EntropyConfig::server());
//! let nonce = entropy.request_bytes(12).await?;
//! assert_eq!(nonce.len(), 12);
//! entropy.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod metrics;
mod pool;
pub mod remote;

pub use metrics::{EntropyMetrics, MetricsSnapshot};
#[cfg(feature = "network")]
pub use remote::QrngClient;
pub use remote::{EntropyFetcher, FetchError, FetchFuture};

use crate::config::EntropyConfig;
use crate::error::{Error, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use pool::RandomPool;
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use zeroize::Zeroize;

/// Bytes requested by the health probe.
const HEALTH_PROBE_BYTES: usize = 10;

/// Result of `EntropySource::health_check`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "cacheSize")]
    pub pool_size: usize,
    pub metrics: MetricsSnapshot,
    pub checked_at: DateTime<Utc>,
}

/// Handle to the process entropy service. Cloning is cheap and every clone
/// shares the same pool.
#[derive(Clone)]
pub struct EntropySource {
    inner: Arc<Inner>,
}

struct Inner {
    config: EntropyConfig,
    fetcher: Arc<dyn EntropyFetcher>,
    pool: Mutex<RandomPool>,
    refill: Mutex<RefillState>,
    metrics: EntropyMetrics,
}

#[derive(Default)]
struct RefillState {
    /// Present while a remote fetch is outstanding; flips to `true` when it
    /// completes.
    in_flight: Option<watch::Receiver<bool>>,
    background: Option<JoinHandle<()>>,
}

/// Held by the task performing a refill. Dropping it (normally or through
/// cancellation) clears the in-flight flag and wakes the waiters.
struct RefillGuard<'a> {
    inner: &'a Inner,
    done: watch::Sender<bool>,
}

impl Drop for RefillGuard<'_> {
    fn drop(&mut self) {
        lock(&self.inner.refill).in_flight = None;
        let _ = self.done.send(true);
    }
}

enum RefillRole<'a> {
    Leader(RefillGuard<'a>),
    Follower(watch::Receiver<bool>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn local_random(length: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

impl EntropySource {
    /// Entropy source backed by the HTTPS QRNG client at `config.endpoint`.
    #[cfg(feature = "network")]
    pub fn new(config: EntropyConfig) -> Self {
        let fetcher = Arc::new(QrngClient::new(config.endpoint.clone()));
        Self::with_fetcher(config, fetcher)
    }

    /// Entropy source backed by an arbitrary remote.
    pub fn with_fetcher(config: EntropyConfig, fetcher: Arc<dyn EntropyFetcher>) -> Self {
        let config = config.normalized();
        log::info!(
            "Entropy source ready: remote={} capacity={} low_water={} max_request={}",
            fetcher.describe(),
            config.pool_capacity,
            config.low_water,
            config.max_request
        );
        Self {
            inner: Arc::new(Inner {
                pool: Mutex::new(RandomPool::new(config.pool_capacity)),
                refill: Mutex::new(RefillState::default()),
                metrics: EntropyMetrics::default(),
                fetcher,
                config,
            }),
        }
    }

    pub fn config(&self) -> &EntropyConfig {
        &self.inner.config
    }

    /// Return exactly `length` fresh random bytes.
    ///
    /// # Errors
    /// `Error::InvalidLength` when `length` is 0 or above `max_request`.
    pub async fn request_bytes(&self, length: usize) -> Result<Vec<u8>> {
        let inner = &self.inner;
        inner.metrics.record_request();

        let max = inner.config.max_request;
        if length == 0 || length > max {
            return Err(Error::InvalidLength {
                requested: length,
                max,
            });
        }

        if let Some(bytes) = inner.take(length) {
            inner.metrics.record_hit();
            self.schedule_background_refill();
            return Ok(bytes);
        }

        inner.metrics.record_miss();
        inner.refill().await;

        if let Some(bytes) = inner.take(length) {
            self.schedule_background_refill();
            return Ok(bytes);
        }

        log::warn!(
            "Entropy pool still short after refill, generating {} bytes locally",
            length
        );
        inner.metrics.record_fallback();
        Ok(local_random(length))
    }

    /// Fixed-size variant of `request_bytes`.
    pub async fn request_array<const N: usize>(&self) -> Result<[u8; N]> {
        let mut bytes = self.request_bytes(N).await?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(out)
    }

    pub async fn request_hex(&self, length: usize) -> Result<String> {
        let bytes = self.request_bytes(length).await?;
        Ok(hex::encode(bytes))
    }

    pub async fn request_base64(&self, length: usize) -> Result<String> {
        let bytes = self.request_bytes(length).await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// CSPRNG seeded with 32 pool bytes, for primitives that take an RNG.
    pub async fn seeded_rng(&self) -> Result<ChaCha20Rng> {
        let mut seed = self.request_array::<32>().await?;
        let rng = ChaCha20Rng::from_seed(seed);
        seed.zeroize();
        Ok(rng)
    }

    /// Probe the remote with a short timeout. Neither the pool nor the
    /// counters are touched.
    pub async fn health_check(&self) -> HealthStatus {
        let timeout = self.inner.config.health_timeout();
        let started = Instant::now();

        let probe = tokio::time::timeout(
            timeout,
            self.inner.fetcher.fetch(HEALTH_PROBE_BYTES, timeout),
        )
        .await
        .unwrap_or(Err(FetchError::Timeout));

        let latency_ms = started.elapsed().as_millis() as u64;
        let error = probe.err().map(|e| {
            log::warn!("QRNG health probe failed: {}", e);
            e.to_string()
        });

        HealthStatus {
            healthy: error.is_none(),
            latency_ms,
            error,
            pool_size: self.pool_size(),
            metrics: self.metrics(),
            checked_at: Utc::now(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot(self.pool_size())
    }

    pub fn pool_size(&self) -> usize {
        lock(&self.inner.pool).len()
    }

    pub fn reset_metrics(&self) {
        self.inner.metrics.reset();
    }

    pub fn clear_cache(&self) {
        lock(&self.inner.pool).clear();
        log::info!("Entropy pool cleared");
    }

    /// Stop a pending background refill. Draws keep working afterwards;
    /// they simply refill on demand.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.inner.refill).background.take() {
            handle.abort();
        }
    }

    fn schedule_background_refill(&self) {
        let low_water = self.inner.config.low_water;
        if self.pool_size() >= low_water {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let mut state = lock(&self.inner.refill);
        if state.in_flight.is_some() {
            return;
        }
        if matches!(&state.background, Some(handle) if !handle.is_finished()) {
            return;
        }

        log::debug!("Entropy pool below {} bytes, scheduling background refill", low_water);
        let inner = Arc::clone(&self.inner);
        state.background = Some(runtime.spawn(async move {
            // Someone may have refilled between scheduling and now.
            let still_low = lock(&inner.pool).len() < inner.config.low_water;
            if still_low {
                inner.refill().await;
            }
        }));
    }
}

impl Inner {
    fn take(&self, length: usize) -> Option<Vec<u8>> {
        lock(&self.pool).take(length)
    }

    /// Run one refill, or wait (bounded) for the one already in flight.
    async fn refill(&self) {
        let role = {
            let mut state = lock(&self.refill);
            match &state.in_flight {
                Some(rx) => RefillRole::Follower(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(false);
                    state.in_flight = Some(rx);
                    RefillRole::Leader(RefillGuard {
                        inner: self,
                        done: tx,
                    })
                }
            }
        };

        match role {
            RefillRole::Leader(guard) => {
                self.fetch_batch().await;
                drop(guard);
            }
            RefillRole::Follower(rx) => {
                let wait = self.config.refill_wait();
                if tokio::time::timeout(wait, wait_until_done(rx)).await.is_err() {
                    log::debug!("In-flight refill not finished after {:?}", wait);
                }
            }
        }
    }

    async fn fetch_batch(&self) {
        let capacity = self.config.pool_capacity;
        let timeout = self.config.refill_timeout();
        self.metrics.record_api_call();

        let fetched = tokio::time::timeout(timeout, self.fetcher.fetch(capacity, timeout))
            .await
            .unwrap_or(Err(FetchError::Timeout));

        match fetched {
            Ok(batch) => {
                let kept = lock(&self.pool).fill(batch);
                log::info!("QRNG pool refilled: {} bytes", kept);
            }
            Err(e) => {
                self.metrics.record_api_failure();
                self.metrics.record_fallback();
                log::warn!(
                    "{} at {} ({}), filling pool from OS RNG",
                    Error::from(e.clone()),
                    self.fetcher.describe(),
                    e
                );
                let mut pool = lock(&self.pool);
                let missing = pool.free_space();
                pool.fill(local_random(missing));
            }
        }
    }
}

async fn wait_until_done(mut rx: watch::Receiver<bool>) {
    loop {
        let done = *rx.borrow_and_update();
        if done {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockFetcher {
        calls: AtomicUsize,
        delay: Duration,
        online: bool,
    }

    impl MockFetcher {
        fn online(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                online: true,
            })
        }

        fn offline() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                online: false,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EntropyFetcher for MockFetcher {
        fn fetch(&self, length: usize, _timeout: Duration) -> FetchFuture<'_> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                if !self.online {
                    return Err(FetchError::Transport("mock offline".to_string()));
                }
                Ok(local_random(length))
            })
        }

        fn describe(&self) -> String {
            "mock".to_string()
        }
    }

    fn small_pool() -> EntropyConfig {
        EntropyConfig::server()
            .with_max_request(200)
            .with_pool(256, 64)
    }

    fn share_a_window(a: &[u8], b: &[u8]) -> bool {
        let seen: HashSet<&[u8]> = a.windows(8).collect();
        b.windows(8).any(|w| seen.contains(w))
    }

    #[tokio::test]
    async fn test_returns_exact_lengths() {
        let entropy = EntropySource::with_fetcher(small_pool(), MockFetcher::online(Duration::ZERO));
        for n in [1usize, 12, 32, 100, 199, 200] {
            assert_eq!(entropy.request_bytes(n).await.unwrap().len(), n);
        }
        entropy.shutdown();
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_lengths() {
        let entropy = EntropySource::with_fetcher(
            EntropyConfig::server(),
            MockFetcher::online(Duration::ZERO),
        );
        assert_eq!(
            entropy.request_bytes(0).await,
            Err(Error::InvalidLength { requested: 0, max: 10_000 })
        );
        assert_eq!(
            entropy.request_bytes(10_001).await,
            Err(Error::InvalidLength { requested: 10_001, max: 10_000 })
        );
        assert_eq!(entropy.request_bytes(10_000).await.unwrap().len(), 10_000);
        entropy.shutdown();
    }

    #[tokio::test]
    async fn test_second_request_hits_cache() {
        let fetcher = MockFetcher::online(Duration::ZERO);
        let entropy = EntropySource::with_fetcher(small_pool(), fetcher.clone());

        let a = entropy.request_bytes(32).await.unwrap();
        let b = entropy.request_bytes(32).await.unwrap();
        assert_ne!(a, b);

        let m = entropy.metrics();
        assert_eq!(m.total_requests, 2);
        assert_eq!(m.cache_misses, 1);
        assert_eq!(m.cache_hits, 1);
        assert_eq!(m.api_calls, 1);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(entropy.pool_size(), 256 - 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_draws_never_share_bytes() {
        let entropy = EntropySource::with_fetcher(small_pool(), MockFetcher::online(Duration::from_millis(5)));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let entropy = entropy.clone();
                tokio::spawn(async move { entropy.request_bytes(100).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(results.len(), 10);
        for (i, a) in results.iter().enumerate() {
            assert_eq!(a.len(), 100);
            for b in &results[i + 1..] {
                assert!(!share_a_window(a, b), "two draws share pool bytes");
            }
        }
        // 1000 bytes from a 256-byte pool needs more than one batch.
        assert!(entropy.metrics().api_calls + entropy.metrics().fallback_used >= 2);
        entropy.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_fetch() {
        let fetcher = MockFetcher::online(Duration::from_millis(50));
        let config = EntropyConfig::server()
            .with_max_request(100)
            .with_pool(1_000, 100)
            .with_refill_wait(Duration::from_secs(2));
        let entropy = EntropySource::with_fetcher(config, fetcher.clone());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let entropy = entropy.clone();
                tokio::spawn(async move { entropy.request_bytes(100).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().len(), 100);
        }

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(entropy.metrics().fallback_used, 0);
        assert_eq!(entropy.pool_size(), 600);
    }

    #[tokio::test]
    async fn test_background_refill_after_low_water() {
        let fetcher = MockFetcher::online(Duration::ZERO);
        let config = EntropyConfig::server()
            .with_max_request(100)
            .with_pool(256, 128);
        let entropy = EntropySource::with_fetcher(config, fetcher.clone());

        entropy.request_bytes(100).await.unwrap(); // miss: 256 -> 156
        entropy.request_bytes(100).await.unwrap(); // hit: 156 -> 56, below low water

        for _ in 0..100 {
            if entropy.pool_size() > 56 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(entropy.pool_size(), 256);
        assert_eq!(fetcher.calls(), 2);
        entropy.shutdown();
    }

    #[tokio::test]
    async fn test_follower_gives_up_on_slow_refill() {
        let fetcher = MockFetcher::online(Duration::from_millis(400));
        let config = small_pool().with_refill_wait(Duration::from_millis(20));
        let entropy = EntropySource::with_fetcher(config, fetcher.clone());

        let leader = {
            let entropy = entropy.clone();
            tokio::spawn(async move { entropy.request_bytes(100).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let started = Instant::now();
        let bytes = entropy.request_bytes(100).await.unwrap();
        assert_eq!(bytes.len(), 100);
        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(entropy.metrics().fallback_used, 1);
        assert_eq!(fetcher.calls(), 1);

        assert_eq!(leader.await.unwrap().unwrap().len(), 100);
        assert_eq!(fetcher.calls(), 1);
        entropy.shutdown();
    }

    #[tokio::test]
    async fn test_cancelled_refill_clears_in_flight() {
        let fetcher = MockFetcher::online(Duration::from_millis(400));
        let entropy = EntropySource::with_fetcher(small_pool(), fetcher.clone());

        let cancelled = tokio::time::timeout(Duration::from_millis(20), entropy.request_bytes(32)).await;
        assert!(cancelled.is_err());
        assert!(lock(&entropy.inner.refill).in_flight.is_none());

        // The next caller leads a fresh fetch instead of waiting on a dead one.
        assert_eq!(entropy.request_bytes(32).await.unwrap().len(), 32);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(entropy.metrics().fallback_used, 0);
        entropy.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_aborts_background_refill() {
        let fetcher = MockFetcher::online(Duration::from_millis(200));
        let config = EntropyConfig::server()
            .with_max_request(100)
            .with_pool(256, 128);
        let entropy = EntropySource::with_fetcher(config, fetcher.clone());

        entropy.request_bytes(100).await.unwrap(); // miss: 256 -> 156
        entropy.request_bytes(100).await.unwrap(); // hit: 156 -> 56, refill scheduled
        assert!(lock(&entropy.inner.refill).background.is_some());

        entropy.shutdown();
        assert!(lock(&entropy.inner.refill).background.is_none());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(entropy.pool_size(), 56);
        assert!(lock(&entropy.inner.refill).in_flight.is_none());

        let bytes = entropy.request_bytes(100).await.unwrap();
        assert_eq!(bytes.len(), 100);
        assert_eq!(entropy.metrics().fallback_used, 0);
        entropy.shutdown();
    }

    #[tokio::test]
    async fn test_offline_remote_falls_back() {
        let fetcher = MockFetcher::offline();
        let entropy = EntropySource::with_fetcher(small_pool(), fetcher.clone());

        let bytes = entropy.request_bytes(32).await.unwrap();
        assert_eq!(bytes.len(), 32);

        let m = entropy.metrics();
        assert_eq!(m.api_calls, 1);
        assert_eq!(m.api_failures, 1);
        assert!(m.fallback_used >= 1);
        // The pool was filled locally, so the next draw is a hit.
        entropy.request_bytes(32).await.unwrap();
        assert_eq!(entropy.metrics().cache_hits, 1);
        entropy.shutdown();
    }

    #[tokio::test]
    async fn test_health_check_leaves_pool_alone() {
        let fetcher = MockFetcher::online(Duration::ZERO);
        let entropy = EntropySource::with_fetcher(small_pool(), fetcher.clone());
        entropy.request_bytes(16).await.unwrap();
        let before = entropy.metrics();

        let health = entropy.health_check().await;
        assert!(health.healthy);
        assert!(health.error.is_none());
        assert_eq!(health.pool_size, before.pool_size);
        assert_eq!(entropy.metrics(), before);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_health_check_reports_offline_remote() {
        let entropy = EntropySource::with_fetcher(small_pool(), MockFetcher::offline());
        let health = entropy.health_check().await;
        assert!(!health.healthy);
        assert!(health.error.unwrap().contains("mock offline"));

        let json = serde_json::to_value(entropy.health_check().await).unwrap();
        assert_eq!(json["healthy"], false);
        assert!(json.get("cacheSize").is_some());
        assert!(json.get("metrics").is_some());
    }

    #[tokio::test]
    async fn test_reset_metrics_and_clear_cache() {
        let entropy = EntropySource::with_fetcher(small_pool(), MockFetcher::online(Duration::ZERO));
        entropy.request_bytes(10).await.unwrap();
        assert!(entropy.pool_size() > 0);

        entropy.reset_metrics();
        assert_eq!(entropy.metrics().total_requests, 0);

        entropy.clear_cache();
        assert_eq!(entropy.pool_size(), 0);
        assert_eq!(entropy.metrics().pool_size, 0);
    }

    #[tokio::test]
    async fn test_encoded_helpers() {
        let entropy = EntropySource::with_fetcher(small_pool(), MockFetcher::online(Duration::ZERO));

        let hex = entropy.request_hex(16).await.unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));

        let b64 = entropy.request_base64(24).await.unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(decoded.len(), 24);

        let arr: [u8; 12] = entropy.request_array().await.unwrap();
        assert_eq!(arr.len(), 12);
        entropy.shutdown();
    }

    #[tokio::test]
    async fn test_seeded_rngs_differ() {
        let entropy = EntropySource::with_fetcher(small_pool(), MockFetcher::online(Duration::ZERO));
        let mut a = entropy.seeded_rng().await.unwrap();
        let mut b = entropy.seeded_rng().await.unwrap();
        assert_ne!(a.next_u64(), b.next_u64());
        entropy.shutdown();
    }

    #[cfg(feature = "network")]
    #[tokio::test]
    async fn test_unreachable_endpoint_still_yields_entropy() {
        let mut config = small_pool().with_endpoint("http://127.0.0.1:9/API/jsonI.php");
        config.refill_timeout_ms = 500;
        config.health_timeout_ms = 500;
        let entropy = EntropySource::new(config);

        let bytes = entropy.request_bytes(64).await.unwrap();
        assert_eq!(bytes.len(), 64);

        let health = entropy.health_check().await;
        assert!(!health.healthy);
        assert!(health.metrics.fallback_used >= 1);
        assert!(health.metrics.api_failures >= 1);
        entropy.shutdown();
    }
}
