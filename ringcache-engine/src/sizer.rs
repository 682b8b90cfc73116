//! Adaptive cycle-time-driven resize decision.
//!
//! Pure function, deliberately separated from [`crate::engine`] so the
//! hysteresis math can be unit-tested without an arena in hand.

use std::time::Duration;

use crate::{MAX_SIZE, MIN_SIZE};

/// The outcome of evaluating one cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeProposal {
    /// `target_cycle_time / cycle_time`.
    pub ratio: f64,
    /// Candidate new arena size, already clamped to `[MIN_SIZE, MAX_SIZE]`.
    pub new_size: u32,
    /// Whether the engine itself proposes resizing, before any callback
    /// override.
    pub proposed: bool,
}

/// Evaluates whether the cache should resize at this cycle boundary.
///
/// `cycle_time` is the elapsed seconds of the just-finished cycle;
/// `last_ratio` is the ratio recorded at the previous cycle boundary (or
/// `0.0` if there was none).
pub fn evaluate(
    target_cycle_time: Duration,
    cycle_time_secs: f64,
    current_size: u32,
    last_ratio: f64,
) -> ResizeProposal {
    let ratio = target_cycle_time.as_secs_f64() / cycle_time_secs;

    let raw_new_size = current_size as f64 * ratio * 1.10;
    let new_size = clamp_size(raw_new_size);

    let proposed = last_ratio != 0.0
        && ((ratio > 1.0 && last_ratio > 1.0 && current_size < MAX_SIZE)
            || (ratio < 0.5 && last_ratio < 0.5 && current_size > MIN_SIZE));

    ResizeProposal {
        ratio,
        new_size,
        proposed,
    }
}

fn clamp_size(raw: f64) -> u32 {
    if !raw.is_finite() || raw < MIN_SIZE as f64 {
        return MIN_SIZE;
    }
    if raw > MAX_SIZE as f64 {
        return MAX_SIZE;
    }
    raw as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_prior_ratio_never_proposes() {
        let p = evaluate(Duration::from_secs(100), 10.0, 1_000, 0.0);
        assert!(!p.proposed);
    }

    #[test]
    fn grows_after_two_fast_cycles() {
        let p = evaluate(Duration::from_secs(100), 10.0, 1_000, 12.0);
        assert!(p.ratio > 1.0);
        assert!(p.proposed);
        assert!(p.new_size > 1_000);
    }

    #[test]
    fn single_fast_cycle_does_not_propose() {
        let p = evaluate(Duration::from_secs(100), 10.0, 1_000, 0.3);
        assert!(!p.proposed);
    }

    #[test]
    fn shrinks_after_two_slow_cycles() {
        let p = evaluate(Duration::from_secs(100), 1_000.0, 10_000, 0.05);
        assert!(p.ratio < 0.5);
        assert!(p.proposed);
        assert!(p.new_size < 10_000);
    }

    #[test]
    fn clamps_to_bounds() {
        let p = evaluate(Duration::from_secs(86_400), 1.0, MAX_SIZE, 2.0);
        assert_eq!(p.new_size, MAX_SIZE);

        let p = evaluate(Duration::from_secs(1), 1_000_000.0, MIN_SIZE, 0.1);
        assert_eq!(p.new_size, MIN_SIZE);
    }

    #[test]
    fn will_not_grow_past_max_size() {
        let p = evaluate(Duration::from_secs(100), 10.0, MAX_SIZE, 12.0);
        assert!(!p.proposed);
    }

    #[test]
    fn will_not_shrink_past_min_size() {
        let p = evaluate(Duration::from_secs(100), 1_000.0, MIN_SIZE, 0.05);
        assert!(!p.proposed);
    }
}
