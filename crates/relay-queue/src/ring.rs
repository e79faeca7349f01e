use crate::invariants::debug_assert_bounded_count;
use crate::message::{ChatId, QueuedMessage, SenderId};

/// A per-sender bounded FIFO ring. Created lazily on first push, destroyed
/// on the pop that drains it (spec §3 "UserRing").
pub(crate) struct UserRing {
    pub(crate) sender_id: SenderId,
    slots: Vec<Option<QueuedMessage>>,
    head: usize,
    tail: usize,
    count: usize,
    cap: usize,
}

impl UserRing {
    pub(crate) fn new(sender_id: SenderId, cap: usize) -> Self {
        let mut slots = Vec::with_capacity(cap);
        slots.resize_with(cap, || None);
        Self {
            sender_id,
            slots,
            head: 0,
            tail: 0,
            count: 0,
            cap,
        }
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn mask(&self) -> usize {
        self.cap - 1
    }

    pub(crate) fn push(
        &mut self,
        chat_id: ChatId,
        text: &str,
        ingress_monotonic_seconds: f64,
    ) -> Result<(), crate::error::PushError> {
        if self.count == self.cap {
            return Err(crate::error::PushError::QueueFull);
        }
        let msg = QueuedMessage::new(self.sender_id, chat_id, text, ingress_monotonic_seconds);
        self.slots[self.tail] = Some(msg);
        self.tail = (self.tail + 1) & self.mask();
        self.count += 1;
        debug_assert_bounded_count!(self.count, self.cap);
        Ok(())
    }

    /// Pops the head message. Caller must only call this when `count > 0`.
    pub(crate) fn pop(&mut self) -> QueuedMessage {
        debug_assert!(self.count > 0, "pop on empty ring");
        let msg = self.slots[self.head]
            .take()
            .expect("head slot always occupied while count > 0");
        self.head = (self.head + 1) & self.mask();
        self.count -= 1;
        debug_assert_bounded_count!(self.count, self.cap);
        msg
    }
}

/// A node in a bucket's hash chain. Ownership flows bucket -> node -> node,
/// matching SPEC_FULL.md §9's "hash-chained ring table" note: the chain link
/// is unique ownership, and unlinking on drain transfers that ownership to
/// the predecessor (or the bucket slot).
pub(crate) struct RingNode {
    pub(crate) ring: UserRing,
    pub(crate) next: Option<Box<RingNode>>,
}

/// Finds the ring for `sender_id` in the chain rooted at `link`, if any.
pub(crate) fn find_mut<'a>(
    mut link: &'a mut Option<Box<RingNode>>,
    sender_id: SenderId,
) -> Option<&'a mut UserRing> {
    loop {
        match link {
            None => return None,
            Some(node) => {
                if node.ring.sender_id == sender_id {
                    return Some(&mut node.ring);
                }
                link = &mut node.next;
            }
        }
    }
}

/// Removes the node for `sender_id` from the chain rooted at `link`, if
/// present, returning the ring it owned. Used when a pop drains a ring to
/// zero (spec §4.1 "Ring lifecycle").
pub(crate) fn remove(link: &mut Option<Box<RingNode>>, sender_id: SenderId) -> Option<UserRing> {
    if link.as_ref().is_some_and(|n| n.ring.sender_id == sender_id) {
        let node = link.take().expect("checked Some above");
        *link = node.next;
        return Some(node.ring);
    }
    let mut cur = link;
    loop {
        let found_next = match cur {
            Some(node) => node
                .next
                .as_ref()
                .is_some_and(|n| n.ring.sender_id == sender_id),
            None => return None,
        };
        if found_next {
            let node = cur.as_mut().expect("matched Some above");
            let removed = node.next.take().expect("checked Some above");
            node.next = removed.next;
            return Some(removed.ring);
        }
        cur = &mut cur.as_mut().expect("matched Some above").next;
    }
}

/// Inserts a freshly created ring at the front of the chain rooted at `link`.
pub(crate) fn insert_front(link: &mut Option<Box<RingNode>>, ring: UserRing) {
    let node = Box::new(RingNode {
        ring,
        next: link.take(),
    });
    *link = Some(node);
}

/// Number of rings chained at `link`, for `Queue::ring_count`.
pub(crate) fn chain_len(link: &Option<Box<RingNode>>) -> usize {
    let mut n = 0;
    let mut cur = link;
    while let Some(node) = cur {
        n += 1;
        cur = &node.next;
    }
    n
}

/// 64-bit finalizer (two rounds of xor-shift-multiply, splitmix64-style) used
/// to spread `SenderId`s evenly across the 64 buckets (spec §4.1).
#[inline]
pub(crate) fn hash_sender_id(sender_id: SenderId) -> u64 {
    let mut x = sender_id as u64;
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    x
}
