//! Two-tier cache: a distributed primary (pluggable, network-backed) with
//! an in-process LRU fallback. Shared by the embedding cache and the
//! glossary cache.

mod primary;

pub use primary::{NullPrimaryCache, PrimaryCache};

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// A cached value plus its absolute expiry, as stored in the fallback tier.
struct Entry {
    value: String,
    expires_at: Instant,
}

const CONSECUTIVE_FAILURE_THRESHOLD: u32 = 3;
const PRIMARY_UNAVAILABLE_WINDOW: Duration = Duration::from_secs(60);

/// Two-tier cache. `Get`/`Set`/`Invalidate` per the documented interface;
/// `Set` is write-through to both tiers. After 3 consecutive primary
/// failures, the primary is treated as unavailable for 60s and all traffic
/// is served from the fallback; a re-probe happens automatically once that
/// window elapses (the next call simply tries the primary again).
pub struct TwoTierCache {
    primary: Box<dyn PrimaryCache>,
    fallback: Mutex<lru::LruCache<String, Entry>>,
    consecutive_failures: AtomicU32,
    unavailable_until: AtomicU64,
}

impl TwoTierCache {
    pub fn new(primary: Box<dyn PrimaryCache>, fallback_capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(fallback_capacity.max(1)).expect("capacity > 0");
        Self {
            primary,
            fallback: Mutex::new(lru::LruCache::new(capacity)),
            consecutive_failures: AtomicU32::new(0),
            unavailable_until: AtomicU64::new(0),
        }
    }

    fn primary_is_available(&self) -> bool {
        let until = self.unavailable_until.load(Ordering::Relaxed);
        until == 0 || monotonic_now_millis() >= until
    }

    fn record_primary_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= CONSECUTIVE_FAILURE_THRESHOLD {
            let until = monotonic_now_millis() + PRIMARY_UNAVAILABLE_WINDOW.as_millis() as u64;
            self.unavailable_until.store(until, Ordering::Relaxed);
            warn!("primary cache marked unavailable for {:?}", PRIMARY_UNAVAILABLE_WINDOW);
        }
    }

    fn record_primary_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.unavailable_until.store(0, Ordering::Relaxed);
    }

    /// Returns the cached value for `key`, trying primary then fallback.
    /// `primary_unavailable` is set when the primary tier was skipped
    /// because it is in its unavailable window, so callers can fold that
    /// into `metadata.errors` at most once per query.
    pub async fn get(&self, key: &str) -> (Option<String>, bool) {
        let mut primary_unavailable = false;
        if self.primary_is_available() {
            match self.primary.get(key).await {
                Ok(Some(value)) => {
                    self.record_primary_success();
                    debug!(key, "cache HIT (primary)");
                    return (Some(value), false);
                }
                Ok(None) => {
                    self.record_primary_success();
                    debug!(key, "cache MISS (primary)");
                }
                Err(e) => {
                    self.record_primary_failure();
                    warn!(key, error = %e, "primary cache error");
                }
            }
        } else {
            primary_unavailable = true;
        }

        let fallback_hit = {
            let mut fallback = self.fallback.lock();
            match fallback.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
                Some(_) => {
                    fallback.pop(key);
                    None
                }
                None => None,
            }
        };
        if fallback_hit.is_some() {
            debug!(key, "cache HIT (fallback)");
        } else {
            debug!(key, "cache MISS (fallback)");
        }
        (fallback_hit, primary_unavailable)
    }

    /// Write-through: sets both tiers. Primary write failures degrade to
    /// fallback-only rather than propagating to the caller.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        if self.primary_is_available() {
            if let Err(e) = self.primary.set(key, value, ttl).await {
                self.record_primary_failure();
                warn!(key, error = %e, "primary cache set failed");
            } else {
                self.record_primary_success();
            }
        }
        let mut fallback = self.fallback.lock();
        fallback.put(key.to_string(), Entry { value: value.to_string(), expires_at: Instant::now() + ttl });
    }

    pub async fn invalidate(&self, key: &str) {
        if self.primary_is_available() {
            let _ = self.primary.invalidate(key).await;
        }
        self.fallback.lock().pop(key);
    }
}

fn monotonic_now_millis() -> u64 {
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let start = *START.get_or_init(Instant::now);
    Instant::now().duration_since(start).as_millis() as u64
}
