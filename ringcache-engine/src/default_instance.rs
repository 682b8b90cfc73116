//! Process-wide convenience wrappers over a single default [`Cache`].
//!
//! Mirrors the source's module-level default cache and its cumulative
//! motion counter. The holder is a `Mutex` inside a `OnceLock` purely so
//! the single-owner-at-a-time access compiles in safe Rust; this crate
//! makes no concurrency promise beyond "callers serialize their own
//! access" (see the crate's Non-goals).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use ringcache_common::{CacheOptions, CacheResult};

use crate::Cache;

static DEFAULT: OnceLock<Mutex<Option<Cache>>> = OnceLock::new();
static MOTION: AtomicU64 = AtomicU64::new(0);

fn holder() -> &'static Mutex<Option<Cache>> {
    DEFAULT.get_or_init(|| Mutex::new(None))
}

/// Allocates and installs the process-wide default cache, replacing any
/// previous one. Failure leaves the previous default instance in place.
pub fn default_init(size: u32, options: Option<CacheOptions>) -> CacheResult<()> {
    let cache = Cache::new(size, options)?;
    let mut guard = holder().lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(cache);
    Ok(())
}

/// Looks up `key` in the default instance.
///
/// Returns an owned copy of the value plus its remaining TTL, since the
/// mutex guard protecting the default instance cannot outlive this call
/// the way a [`crate::Hit`] borrow can for a caller-owned [`Cache`].
/// Returns `None` if there is no default instance or the key is absent.
pub fn default_get(key: &[u8]) -> Option<(Vec<u8>, u32)> {
    let guard = holder().lock().unwrap_or_else(|e| e.into_inner());
    let cache = guard.as_ref()?;
    let hit = cache.get(key)?;
    Some((hit.data.to_vec(), hit.ttl_remaining))
}

/// Inserts into the default instance. A no-op if there is no default
/// instance.
pub fn default_set(key: &[u8], data: &[u8], ttl_secs: u32) {
    let mut guard = holder().lock().unwrap_or_else(|e| e.into_inner());
    let Some(cache) = guard.as_mut() else {
        tracing::trace!("default_set called with no default instance installed");
        return;
    };
    let before = cache.cache_motion();
    cache.set(key, data, ttl_secs);
    let after = cache.cache_motion();
    MOTION.fetch_add(after - before, Ordering::Relaxed);
}

/// Overwrites the default instance's options in place. A documented no-op
/// when no default instance exists — it is never buffered for a future
/// `default_init`.
pub fn default_set_options(options: CacheOptions) {
    let mut guard = holder().lock().unwrap_or_else(|e| e.into_inner());
    let Some(cache) = guard.as_mut() else {
        tracing::trace!("default_set_options called with no default instance installed");
        return;
    };
    cache.set_options(options);
}

/// Cumulative bytes written to the default instance across its lifetime,
/// including across `default_init` replacements.
pub fn default_cache_motion() -> u64 {
    MOTION.load(Ordering::Relaxed)
}
