//! Time source abstraction.
//!
//! The engine never reads the wall clock directly: every timestamp comes
//! through a [`Clock`]. Production code uses [`SystemClock`]; tests use
//! [`FakeClock`] so expiry and adaptive-resize scenarios are deterministic
//! instead of sleeping real time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// An absolute point in time, stored as nanoseconds since the Unix epoch.
///
/// This is the packed, arena-storable form of "now" — the equivalent of
/// the source's `struct tai`. Sub-second precision matters for cycle-time
/// measurement even though TTLs are whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(i64);

/// Byte width of a packed [`Instant`].
pub const PACKED_LEN: usize = 8;

impl Instant {
    /// Wraps a raw nanosecond count.
    pub const fn from_unix_nanos(nanos: i64) -> Self {
        Instant(nanos)
    }

    /// Returns the raw nanosecond count.
    pub const fn as_unix_nanos(&self) -> i64 {
        self.0
    }

    /// Returns `self + secs`, saturating instead of overflowing.
    pub fn add_secs(&self, secs: u32) -> Instant {
        let delta = (secs as i64).saturating_mul(1_000_000_000);
        Instant(self.0.saturating_add(delta))
    }

    /// `self < other`, the source's `tai_less`.
    pub fn less(&self, other: &Instant) -> bool {
        self.0 < other.0
    }

    /// `self - other`, the source's `tai_sub`. May be negative if `self`
    /// precedes `other`.
    pub fn sub(&self, other: &Instant) -> Elapsed {
        Elapsed(self.0.saturating_sub(other.0))
    }

    /// Packs this instant into 8 little-endian bytes.
    pub fn pack(&self, out: &mut [u8]) {
        out[..PACKED_LEN].copy_from_slice(&self.0.to_le_bytes());
    }

    /// Unpacks an instant from 8 little-endian bytes.
    pub fn unpack(bytes: &[u8]) -> Instant {
        let mut raw = [0u8; PACKED_LEN];
        raw.copy_from_slice(&bytes[..PACKED_LEN]);
        Instant(i64::from_le_bytes(raw))
    }
}

/// The signed difference between two [`Instant`]s, the source's tai diff.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Elapsed(i64);

impl Elapsed {
    /// Approximate seconds as a float, the source's `taia_approx`.
    pub fn approx_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Whole seconds, truncated toward zero and clamped to `[0, max]`.
    pub fn whole_seconds_clamped(&self, max: u32) -> u32 {
        if self.0 <= 0 {
            return 0;
        }
        let secs = self.0 / 1_000_000_000;
        secs.min(max as i64) as u32
    }

    /// True if this elapsed duration is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// External time source the engine reads `now()` through.
///
/// This is the one interface the core spec calls "out of scope"; the
/// engine depends only on this trait, never on a concrete clock.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Instant::from_unix_nanos(since_epoch.as_nanos() as i64)
    }
}

/// Deterministic clock for tests: starts at the epoch and only moves when
/// told to.
#[derive(Debug)]
pub struct FakeClock {
    nanos: AtomicI64,
}

impl FakeClock {
    /// Creates a fake clock starting at the given instant.
    pub fn new(start: Instant) -> Self {
        FakeClock {
            nanos: AtomicI64::new(start.as_unix_nanos()),
        }
    }

    /// Advances the clock by the given number of seconds.
    pub fn advance_secs(&self, secs: u32) {
        self.nanos
            .fetch_add((secs as i64) * 1_000_000_000, Ordering::SeqCst);
    }

    /// Advances the clock by the given number of nanoseconds.
    pub fn advance_nanos(&self, nanos: i64) {
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        Instant::from_unix_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        let t = Instant::from_unix_nanos(1_700_000_000_123_456_789);
        let mut buf = [0u8; PACKED_LEN];
        t.pack(&mut buf);
        assert_eq!(Instant::unpack(&buf), t);
    }

    #[test]
    fn add_secs_and_sub() {
        let t0 = Instant::from_unix_nanos(0);
        let t1 = t0.add_secs(60);
        assert!(t0.less(&t1));
        let elapsed = t1.sub(&t0);
        assert_eq!(elapsed.whole_seconds_clamped(604_800), 60);
    }

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new(Instant::from_unix_nanos(0));
        let first = clock.now();
        clock.advance_secs(5);
        let second = clock.now();
        assert_eq!(second.sub(&first).whole_seconds_clamped(604_800), 5);
    }
}
