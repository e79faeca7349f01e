/// Configuration for a [`Queue`](crate::Queue).
///
/// Mirrors `crates/ringmpsc/src/config.rs`'s bounds-checked constructor, but
/// validates at runtime instead of panicking: a queue is constructed from a
/// `ConfigSnapshot` loaded from the outside world, and an out-of-range
/// `user_ring_size` is a validation error, not a programmer error.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    ring_cap: usize,
}

const MIN_RING_SIZE: usize = 4;
const MAX_RING_SIZE: usize = 256;

impl Config {
    /// Builds a configuration from a requested ring size.
    ///
    /// The requested size is clamped to `[4, 256]` and rounded up to the next
    /// power of two, per spec §4.1: "configures the per-sender capacity
    /// (rounded up to the next power of two, minimum 4, maximum 256)".
    #[must_use]
    pub fn new(ring_size: usize) -> Self {
        let clamped = ring_size.clamp(MIN_RING_SIZE, MAX_RING_SIZE);
        let ring_cap = clamped.next_power_of_two().min(MAX_RING_SIZE);
        crate::invariants::debug_assert_valid_cap!(ring_cap);
        Self { ring_cap }
    }

    /// Returns the effective per-sender ring capacity.
    #[inline]
    #[must_use]
    pub fn ring_cap(&self) -> usize {
        self.ring_cap
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(16)
    }
}
