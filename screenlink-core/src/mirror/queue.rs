//! Bounded, drop-oldest frame buffer between capture and display.
//!
//! This is a "freshness over completeness" buffer: a stale frame is
//! worse than a lost one, so when the producer outruns the consumer the
//! queue evicts its oldest unread entry instead of applying backpressure.
//! Neither side ever blocks.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::mirror::frame::Frame;

/// Default queue depth. Two slots absorb one cycle of producer jitter
/// while keeping worst-case staleness at a single frame interval.
pub const DEFAULT_QUEUE_DEPTH: usize = 2;

/// Bounded FIFO of at most `capacity` frames.
///
/// One producer, one consumer. `push` never blocks: at capacity it
/// evicts exactly the oldest entry first. `try_pop` never blocks: it
/// returns `None` immediately when empty.
pub struct FrameQueue {
    inner: Mutex<VecDeque<Frame>>,
    capacity: usize,
}

impl FrameQueue {
    /// Create a queue with the default depth of 2.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_DEPTH)
    }

    /// Create a queue holding at most `capacity` frames (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Insert a frame, evicting the oldest unread entry if full.
    ///
    /// Returns `true` if an old frame was dropped to make room.
    pub fn push(&self, frame: Frame) -> bool {
        let mut q = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut evicted = false;
        while q.len() >= self.capacity {
            q.pop_front();
            evicted = true;
        }
        q.push_back(frame);
        evicted
    }

    /// Remove and return the oldest queued frame, or `None` if empty.
    pub fn try_pop(&self) -> Option<Frame> {
        let mut q = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        q.pop_front()
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the queue holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of frames the queue will hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A 1×1 frame whose single red byte tags its push order.
    fn tagged(tag: u8) -> Frame {
        Frame::from_rgb(1, 1, vec![tag, 0, 0]).unwrap()
    }

    fn tag_of(frame: &Frame) -> u8 {
        frame.data[0]
    }

    #[test]
    fn holds_at_most_capacity() {
        let q = FrameQueue::with_capacity(2);
        for i in 0..5 {
            q.push(tagged(i));
            assert!(q.len() <= 2);
        }
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn evicts_oldest_first() {
        // N+k pushes with no pops: survivors are the last N, in order.
        let q = FrameQueue::with_capacity(2);
        for i in 0..5 {
            q.push(tagged(i));
        }
        assert_eq!(tag_of(&q.try_pop().unwrap()), 3);
        assert_eq!(tag_of(&q.try_pop().unwrap()), 4);
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn pop_after_overflow_never_returns_evicted_frame() {
        let q = FrameQueue::with_capacity(2);
        q.push(tagged(1));
        q.push(tagged(2));
        q.push(tagged(3)); // evicts 1
        let first = tag_of(&q.try_pop().unwrap());
        assert_ne!(first, 1, "drop must be oldest-first, not drop-newest");
    }

    #[test]
    fn push_reports_eviction() {
        let q = FrameQueue::with_capacity(1);
        assert!(!q.push(tagged(1)));
        assert!(q.push(tagged(2)));
    }

    #[test]
    fn try_pop_on_empty_is_none() {
        let q = FrameQueue::new();
        assert!(q.try_pop().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn frame_is_never_read_twice() {
        let q = FrameQueue::new();
        q.push(tagged(7));
        assert_eq!(tag_of(&q.try_pop().unwrap()), 7);
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn capacity_minimum_is_one() {
        let q = FrameQueue::with_capacity(0);
        assert_eq!(q.capacity(), 1);
        q.push(tagged(1));
        q.push(tagged(2));
        assert_eq!(q.len(), 1);
        assert_eq!(tag_of(&q.try_pop().unwrap()), 2);
    }
}
