use std::sync::Mutex;

/// Hard ceiling on an accumulated request body (spec §4.5, §6).
pub const MAX_BODY_BYTES: usize = 512 * 1024;

/// Fixed-size pool of reusable request-accumulation buffers. Empty pool
/// falls back to a heap allocation that is simply freed, not returned (spec
/// §4.5 "Buffer pool").
pub struct BufferPool {
    slots: Mutex<Vec<Vec<u8>>>,
    initial_capacity: usize,
}

impl BufferPool {
    /// `size` is clamped to `1..=64` (spec §6 `webhook_pool_size` bounds).
    #[must_use]
    pub fn new(size: usize, initial_capacity: usize) -> Self {
        let size = size.clamp(1, 64);
        let slots = (0..size)
            .map(|_| Vec::with_capacity(initial_capacity))
            .collect();
        Self {
            slots: Mutex::new(slots),
            initial_capacity,
        }
    }

    /// Checks out one buffer, clearing it first. Returns it to the pool on
    /// drop if it came from a pool slot; otherwise it is simply freed.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let mut slots = self.slots.lock().unwrap();
        let (buf, from_pool) = match slots.pop() {
            Some(mut buf) => {
                buf.clear();
                (buf, true)
            }
            None => (Vec::with_capacity(self.initial_capacity), false),
        };
        PooledBuffer {
            pool: self,
            buf: Some(buf),
            from_pool,
        }
    }
}

pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<Vec<u8>>,
    from_pool: bool,
}

impl std::ops::Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        self.buf.as_ref().expect("buffer present until drop")
    }
}

impl std::ops::DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().expect("buffer present until drop")
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if self.from_pool {
            if let Some(buf) = self.buf.take() {
                self.pool.slots.lock().unwrap().push(buf);
            }
        }
    }
}

/// Reserves room for `additional` more bytes, doubling capacity each step up
/// to [`MAX_BODY_BYTES`] (spec §4.5 "Growth inside a buffer doubles capacity
/// up to the 512 KiB ceiling").
pub fn reserve_doubling(buf: &mut Vec<u8>, additional: usize) {
    let needed = buf.len() + additional;
    if needed <= buf.capacity() {
        return;
    }
    let mut target = buf.capacity().max(64);
    while target < needed && target < MAX_BODY_BYTES {
        target *= 2;
    }
    let target = target.min(MAX_BODY_BYTES).max(needed.min(MAX_BODY_BYTES));
    if target > buf.capacity() {
        buf.reserve(target - buf.capacity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_pool_slot_after_drop() {
        let pool = BufferPool::new(1, 16);
        {
            let mut buf = pool.acquire();
            buf.extend_from_slice(b"hello");
        }
        let buf = pool.acquire();
        assert!(buf.is_empty(), "buffer must be cleared on reuse");
    }

    #[test]
    fn falls_back_to_heap_when_pool_exhausted() {
        let pool = BufferPool::new(1, 16);
        let _held = pool.acquire();
        let fallback = pool.acquire();
        assert!(fallback.is_empty());
    }

    #[test]
    fn reserve_doubling_never_exceeds_ceiling() {
        let mut buf = Vec::new();
        reserve_doubling(&mut buf, MAX_BODY_BYTES * 4);
        assert!(buf.capacity() <= MAX_BODY_BYTES);
    }
}
