//! Configuration record for a cache instance.

use std::fmt;
use std::time::Duration;

use crate::stats::TtlStats;

/// Default target cycle time: 24 hours.
pub const DEFAULT_TARGET_CYCLE_TIME: Duration = Duration::from_secs(86_400);

/// Decides whether a proposed resize should actually happen.
///
/// Called with `(ratio, old_size, new_size, cycle_ttl_stats, engine_proposal)`
/// and returns the final accept/reject decision, overriding the engine's
/// own hysteresis verdict in either direction.
pub type ResizeCallback = Box<dyn Fn(f64, u32, u32, TtlStats, bool) -> bool + Send + Sync>;

/// Tunable knobs for a [`Cache`](https://docs.rs/ringcache-engine) instance.
///
/// Mirrors the source's `cache_options`: whether the adaptive sizer may
/// reallocate the arena, the cycle time it targets, and an optional
/// callback that gets the final say on any proposed resize.
pub struct CacheOptions {
    /// Whether the adaptive sizer is allowed to reallocate the arena at a
    /// cycle boundary. Defaults to `true`.
    pub allow_resize: bool,
    /// The cycle duration the adaptive sizer targets. Defaults to 24h.
    pub target_cycle_time: Duration,
    /// Optional override for the resize decision.
    pub resize_callback: Option<ResizeCallback>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            allow_resize: true,
            target_cycle_time: DEFAULT_TARGET_CYCLE_TIME,
            resize_callback: None,
        }
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("allow_resize", &self.allow_resize)
            .field("target_cycle_time", &self.target_cycle_time)
            .field("resize_callback", &self.resize_callback.is_some())
            .finish()
    }
}
