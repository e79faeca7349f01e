//! Debug assertion macros for queue invariants.
//!
//! These are only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds. Tags match the quantified invariants in spec.

// =============================================================================
// INV-Q-01: Bounded ring occupancy
// =============================================================================

/// Assert that a ring's `count` never exceeds its `cap`.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $cap:expr) => {
        debug_assert!(
            $count <= $cap,
            "INV-Q-01 violated: count {} exceeds cap {}",
            $count,
            $cap
        )
    };
}

// =============================================================================
// INV-Q-02: total_pending matches the sum of ring counts
// =============================================================================

/// Assert that `total_pending` equals the sum of every reachable ring's `count`.
macro_rules! debug_assert_total_pending_matches {
    ($total:expr, $sum:expr) => {
        debug_assert!(
            $total == $sum,
            "INV-Q-02 violated: total_pending {} != sum of ring counts {}",
            $total,
            $sum
        )
    };
}

// =============================================================================
// INV-Q-03: drained rings are unreachable
// =============================================================================

/// Assert that a ring drained to `count == 0` was actually found and
/// unlinked from its bucket chain (`removed` is the `Option<UserRing>`
/// returned by `ring::remove`).
macro_rules! debug_assert_drained_ring_unlinked {
    ($removed:expr) => {
        debug_assert!(
            $removed.as_ref().is_some_and(|r| r.count() == 0),
            "INV-Q-03 violated: drained ring must be found and empty when unlinked"
        )
    };
}

// =============================================================================
// INV-Q-04: ring capacity is a power of two, bounded
// =============================================================================

/// Assert a ring capacity is a power of two within `[4, 256]`.
macro_rules! debug_assert_valid_cap {
    ($cap:expr) => {
        debug_assert!(
            $cap >= 4 && $cap <= 256 && ($cap & ($cap - 1)) == 0,
            "INV-Q-04 violated: cap {} is not a power of two in [4, 256]",
            $cap
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_drained_ring_unlinked;
pub(crate) use debug_assert_total_pending_matches;
pub(crate) use debug_assert_valid_cap;
