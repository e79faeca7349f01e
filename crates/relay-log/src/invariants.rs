//! Debug assertion macros for circular-log invariants. Zero overhead in
//! release builds.

// =============================================================================
// INV-LOG-01: write position never passes cap
// =============================================================================

macro_rules! debug_assert_position_in_bounds {
    ($pos:expr, $cap:expr) => {
        debug_assert!(
            $pos <= $cap,
            "INV-LOG-01 violated: write_position {} exceeds cap {}",
            $pos,
            $cap
        )
    };
}

// =============================================================================
// INV-LOG-02: a line never exceeds cap - marker_length
// =============================================================================

macro_rules! debug_assert_line_fits {
    ($len:expr, $cap:expr, $marker_len:expr) => {
        debug_assert!(
            $len <= $cap.saturating_sub($marker_len),
            "INV-LOG-02 violated: line of {} bytes does not fit cap {} minus marker {}",
            $len,
            $cap,
            $marker_len
        )
    };
}

pub(crate) use debug_assert_line_fits;
pub(crate) use debug_assert_position_in_bounds;
