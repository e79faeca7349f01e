use std::sync::{Condvar, Mutex};
use std::time::Instant;

use crate::config::Config;
use crate::error::{PopError, PushError};
use crate::invariants::{debug_assert_drained_ring_unlinked, debug_assert_total_pending_matches};
use crate::message::{ChatId, QueuedMessage, SenderId};
use crate::ring::{chain_len, find_mut, hash_sender_id, insert_front, remove, RingNode, UserRing};

/// Number of hash-chain buckets (spec §3 "Queue"). Fixed, not configurable.
const BUCKETS: usize = 64;
const BUCKET_MASK: u64 = (BUCKETS - 1) as u64;

struct Inner {
    buckets: [Option<Box<RingNode>>; BUCKETS],
    total_pending: usize,
    rr_bucket: usize,
    shutdown: bool,
}

impl Inner {
    fn new() -> Self {
        // `[Option<Box<RingNode>>; 64]` doesn't implement `Copy`/`Default`
        // for a plain array literal; build it explicitly.
        const NONE: Option<Box<RingNode>> = None;
        Self {
            buckets: [NONE; BUCKETS],
            total_pending: 0,
            rr_bucket: 0,
            shutdown: false,
        }
    }

    #[cfg(debug_assertions)]
    fn sum_ring_counts(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| {
                let mut sum = 0;
                let mut cur = b;
                while let Some(node) = cur {
                    sum += node.ring.count();
                    cur = &node.next;
                }
                sum
            })
            .sum()
    }
}

/// A fair, bounded, multi-producer/multi-consumer, user-keyed message queue
/// (spec §4.1). One mutex, one condition variable, lazy per-sender rings.
pub struct Queue {
    inner: Mutex<Inner>,
    cond: Condvar,
    ring_cap: usize,
    epoch: Instant,
}

impl Queue {
    /// Creates a new queue. `config` determines the per-sender ring capacity.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            cond: Condvar::new(),
            ring_cap: config.ring_cap(),
            epoch: Instant::now(),
        }
    }

    fn monotonic_seconds(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Seconds elapsed since the queue's monotonic epoch right now. Lets a
    /// worker compute `now_monotonic − ingress_monotonic` against the same
    /// clock a [`QueuedMessage`] was stamped with (spec §4.2 "pacing wait").
    #[must_use]
    pub fn monotonic_now(&self) -> f64 {
        self.monotonic_seconds()
    }

    /// Appends `text` to `sender`'s ring, stamped with the current monotonic
    /// time. Creates the ring lazily if this is the sender's first message.
    /// Drop-newest on overflow (spec §4.1 "Push algorithm").
    pub fn push(&self, sender: SenderId, chat: ChatId, text: &str) -> Result<(), PushError> {
        let now = self.monotonic_seconds();
        let bucket_idx = (hash_sender_id(sender) & BUCKET_MASK) as usize;
        let mut inner = self.inner.lock().unwrap();

        let bucket = &mut inner.buckets[bucket_idx];
        if find_mut(bucket, sender).is_none() {
            insert_front(bucket, UserRing::new(sender, self.ring_cap));
        }
        let ring = find_mut(bucket, sender).expect("just inserted or already present");
        ring.push(chat, text, now)?;
        inner.total_pending += 1;

        #[cfg(debug_assertions)]
        debug_assert_total_pending_matches!(inner.total_pending, inner.sum_ring_counts());

        drop(inner);
        self.cond.notify_one();
        Ok(())
    }

    /// Blocks until a message is available or the queue has shut down and
    /// drained (spec §4.1 "Fairness algorithm (pop)" / "Shutdown semantics").
    pub fn pop(&self) -> Result<QueuedMessage, PopError> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(msg) = Self::try_pop_locked(&mut inner) {
                return Ok(msg);
            }
            if inner.shutdown && inner.total_pending == 0 {
                return Err(PopError::End);
            }
            inner = self.cond.wait(inner).unwrap();
        }
    }

    /// Non-blocking pop, for callers that want to poll rather than park a
    /// thread (e.g. tests). Returns `None` when nothing is ready right now.
    #[must_use]
    pub fn try_pop(&self) -> Option<QueuedMessage> {
        let mut inner = self.inner.lock().unwrap();
        Self::try_pop_locked(&mut inner)
    }

    fn try_pop_locked(inner: &mut Inner) -> Option<QueuedMessage> {
        for step in 0..BUCKETS {
            let bucket_idx = (inner.rr_bucket + step) % BUCKETS;
            let bucket = &mut inner.buckets[bucket_idx];
            // Walk the chain head-first; the first ring with pending work wins.
            let mut cur = bucket;
            loop {
                let sender_id = match cur {
                    Some(node) if node.ring.count() > 0 => node.ring.sender_id,
                    Some(node) => {
                        cur = &mut node.next;
                        continue;
                    }
                    None => break,
                };
                let node_ring = find_mut(cur, sender_id).expect("just matched");
                let msg = node_ring.pop();
                let drained = node_ring.count() == 0;
                inner.total_pending -= 1;
                if drained {
                    let removed = remove(&mut inner.buckets[bucket_idx], sender_id);
                    debug_assert_drained_ring_unlinked!(removed);
                }
                inner.rr_bucket = (bucket_idx + 1) % BUCKETS;
                #[cfg(debug_assertions)]
                debug_assert_total_pending_matches!(inner.total_pending, inner.sum_ring_counts());
                return Some(msg);
            }
        }
        None
    }

    /// Signals shutdown and wakes every blocked popper. Idempotent. Pushes
    /// after shutdown still succeed; poppers drain remaining rings before
    /// observing `PopError::End` (spec §4.1 "Shutdown semantics").
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.shutdown = true;
        drop(inner);
        self.cond.notify_all();
    }

    /// Total messages pending across every ring.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.lock().unwrap().total_pending
    }

    /// Number of currently live (non-empty) rings.
    #[must_use]
    pub fn ring_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.buckets.iter().map(chain_len).sum()
    }

    /// Frees every ring and resets the queue to empty. Does not affect the
    /// shutdown flag.
    pub fn destroy(&self) {
        let mut inner = self.inner.lock().unwrap();
        const NONE: Option<Box<RingNode>> = None;
        inner.buckets = [NONE; BUCKETS];
        inner.total_pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with_ring_size(n: usize) -> Queue {
        Queue::new(Config::new(n))
    }

    #[test]
    fn fifo_fill_then_overflow_then_drain_then_push_again() {
        let q = queue_with_ring_size(4);
        for i in 0..4 {
            q.push(42, 1, &format!("msg {i}")).unwrap();
        }
        assert_eq!(q.push(42, 1, "msg 4"), Err(PushError::QueueFull));

        for i in 0..4 {
            let msg = q.pop().unwrap();
            assert_eq!(msg.text, format!("msg {i}"));
        }
        assert_eq!(q.depth(), 0);
        assert_eq!(q.ring_count(), 0);

        q.push(42, 1, "msg after drain").unwrap();
        assert_eq!(q.try_pop().unwrap().text, "msg after drain");
    }

    #[test]
    fn fair_rotation_across_senders() {
        let q = queue_with_ring_size(8);
        for sender in [1, 2, 3] {
            for i in 0..3 {
                q.push(sender, sender, &format!("{sender}-{i}")).unwrap();
            }
        }

        let mut seen_since_repeat = std::collections::HashSet::new();
        let mut order = Vec::new();
        for _ in 0..9 {
            let msg = q.try_pop().unwrap();
            order.push(msg.sender_id);
        }

        // No sender appears twice before the other two have each appeared once,
        // within any sliding window of 3.
        for window in order.windows(3) {
            let unique: std::collections::HashSet<_> = window.iter().collect();
            assert_eq!(unique.len(), 3, "window {window:?} repeats a sender");
        }
        seen_since_repeat.extend(order.iter());
        assert_eq!(seen_since_repeat.len(), 3);
    }

    #[test]
    fn per_sender_order_is_fifo_even_with_interleaved_pushes() {
        let q = queue_with_ring_size(16);
        q.push(1, 1, "a0").unwrap();
        q.push(2, 2, "b0").unwrap();
        q.push(1, 1, "a1").unwrap();
        q.push(2, 2, "b1").unwrap();

        let mut sender1 = Vec::new();
        let mut sender2 = Vec::new();
        for _ in 0..4 {
            let msg = q.try_pop().unwrap();
            if msg.sender_id == 1 {
                sender1.push(msg.text);
            } else {
                sender2.push(msg.text);
            }
        }
        assert_eq!(sender1, vec!["a0", "a1"]);
        assert_eq!(sender2, vec!["b0", "b1"]);
    }

    #[test]
    fn shutdown_drains_then_ends() {
        let q = queue_with_ring_size(4);
        q.push(1, 1, "only").unwrap();
        q.shutdown();

        // Push after shutdown still succeeds.
        q.push(1, 1, "still queued").unwrap();

        assert_eq!(q.try_pop().unwrap().text, "only");
        assert_eq!(q.try_pop().unwrap().text, "still queued");
        assert_eq!(q.pop(), Err(PopError::End));
    }

    #[test]
    fn double_shutdown_is_a_no_op() {
        let q = queue_with_ring_size(4);
        q.shutdown();
        q.shutdown();
        assert_eq!(q.pop(), Err(PopError::End));
    }

    #[test]
    fn pop_blocks_until_pushed_from_another_thread() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let q = Arc::new(queue_with_ring_size(4));
        let q2 = Arc::clone(&q);
        let handle = thread::spawn(move || q2.pop().unwrap());

        thread::sleep(Duration::from_millis(50));
        q.push(7, 7, "delayed").unwrap();

        let msg = handle.join().unwrap();
        assert_eq!(msg.text, "delayed");
    }
}
