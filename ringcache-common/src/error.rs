//! Error type surfaced by the cache engine.
//!
//! Per the engine's contract, most invalid input (oversize keys/values,
//! operating on an uninitialized cache) is never surfaced as an error —
//! `get` reports a miss and `set` silently drops the write. `CacheError`
//! only covers the one case the engine can genuinely fail at: allocating
//! the arena.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type CacheResult<T> = Result<T, CacheError>;

/// Failure surfaced by [`Cache::new`](https://docs.rs/ringcache-engine) /
/// `Cache::init`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The arena allocation failed. The caller's existing cache, if any,
    /// is left untouched.
    #[error("failed to allocate a {requested}-byte arena")]
    Alloc {
        /// Requested arena size in bytes.
        requested: u32,
    },
}
