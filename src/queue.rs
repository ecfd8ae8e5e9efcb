//! Bounded FIFO between the generator and the server
//!
//! The queue is the only state shared by the two activities. Every
//! check-then-mutate sequence runs under one mutex, and waiters are woken by
//! [`Notify`] with the poll interval as an upper bound between re-checks.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use crate::types::Frame;

/// Default number of frames buffered ahead of the client.
pub const DEFAULT_CAPACITY: usize = 10;

/// Fixed-capacity frame buffer for one producer and one consumer.
#[derive(Debug)]
pub struct FrameQueue {
    frames: Mutex<VecDeque<Frame>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames.
    ///
    /// A zero capacity is raised to one so the server can always make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current occupancy.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn has_space(&self) -> bool {
        !self.is_full()
    }

    /// Append `frame` at the tail if there is room.
    ///
    /// On a full queue nothing changes and the frame is handed back.
    pub fn try_push(&self, frame: Frame) -> Result<(), Frame> {
        {
            let mut frames = self.lock();
            if frames.len() >= self.capacity {
                return Err(frame);
            }
            frames.push_back(frame);
        }
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest frame, `None` when empty.
    pub fn pop_front(&self) -> Option<Frame> {
        let frame = self.lock().pop_front();
        if frame.is_some() {
            self.not_full.notify_one();
        }
        frame
    }

    /// Remove the oldest frame, waiting until one is available.
    pub async fn pop_wait(&self, poll_interval: Duration) -> Frame {
        loop {
            let notified = self.not_empty.notified();
            if let Some(frame) = self.pop_front() {
                return frame;
            }
            let _ = tokio::time::timeout(poll_interval, notified).await;
        }
    }

    /// Append `frame`, waiting for a free slot if the queue is full.
    pub async fn push_wait(&self, mut frame: Frame, poll_interval: Duration) {
        loop {
            match self.try_push(frame) {
                Ok(()) => return,
                Err(back) => {
                    frame = back;
                    self.wait_for_space(poll_interval).await;
                }
            }
        }
    }

    /// Wait until at least one slot is free.
    pub async fn wait_for_space(&self, poll_interval: Duration) {
        loop {
            let notified = self.not_full.notified();
            if self.has_space() {
                return;
            }
            let _ = tokio::time::timeout(poll_interval, notified).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        // Frames are only ever moved in or out whole, so a poisoned queue is still valid
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::tiny_frame;
    use proptest::prelude::*;
    use std::sync::Arc;

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn fills_to_capacity_then_rejects() {
        let queue = FrameQueue::default();
        assert_eq!(queue.capacity(), 10);

        for i in 0..10 {
            assert!(queue.try_push(tiny_frame(i)).is_ok());
        }
        assert_eq!(queue.len(), 10);
        assert!(queue.is_full());

        let rejected = queue.try_push(tiny_frame(99)).unwrap_err();
        assert_eq!(rejected.train_id(), 99);
        assert_eq!(queue.len(), 10);
    }

    #[test]
    fn pops_in_push_order() {
        let queue = FrameQueue::new(4);
        for i in [5, 3, 8] {
            queue.try_push(tiny_frame(i)).unwrap();
        }

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop_front()).map(|f| f.train_id()).collect();
        assert_eq!(order, vec![5, 3, 8]);
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn zero_capacity_is_raised() {
        assert_eq!(FrameQueue::new(0).capacity(), 1);
    }

    #[tokio::test]
    async fn pop_wait_returns_after_push() {
        let queue = Arc::new(FrameQueue::new(2));
        let producer = Arc::clone(&queue);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            producer.try_push(tiny_frame(1)).unwrap();
        });

        let frame = tokio::time::timeout(Duration::from_secs(2), queue.pop_wait(Duration::from_secs(60)))
            .await
            .expect("push should wake the waiter before the poll interval");
        assert_eq!(frame.train_id(), 1);
    }

    #[tokio::test]
    async fn wait_for_space_returns_after_pop() {
        let queue = Arc::new(FrameQueue::new(1));
        queue.try_push(tiny_frame(1)).unwrap();

        let consumer = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            consumer.pop_front();
        });

        tokio::time::timeout(Duration::from_secs(2), queue.wait_for_space(POLL))
            .await
            .expect("pop should free a slot");
        assert!(queue.has_space());
    }

    #[tokio::test]
    async fn push_wait_holds_frame_until_a_slot_frees() {
        let queue = Arc::new(FrameQueue::new(1));
        queue.try_push(tiny_frame(1)).unwrap();

        let producer = Arc::clone(&queue);
        let push = tokio::spawn(async move { producer.push_wait(tiny_frame(2), POLL).await });

        tokio::time::sleep(POLL * 3).await;
        assert!(!push.is_finished());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop_front().unwrap().train_id(), 1);
        tokio::time::timeout(Duration::from_secs(2), push).await.unwrap().unwrap();
        assert_eq!(queue.pop_front().unwrap().train_id(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_producer_consumer_preserves_order() {
        const N: u64 = 2_000;
        let queue = Arc::new(FrameQueue::new(10));

        let producer_queue = Arc::clone(&queue);
        let producer = tokio::spawn(async move {
            for i in 0..N {
                producer_queue.push_wait(tiny_frame(i), POLL).await;
                assert!(producer_queue.len() <= 10);
            }
        });

        let consumer_queue = Arc::clone(&queue);
        let consumer = tokio::spawn(async move {
            let mut seen = Vec::with_capacity(N as usize);
            while seen.len() < N as usize {
                seen.push(consumer_queue.pop_wait(POLL).await.train_id());
            }
            seen
        });

        producer.await.unwrap();
        let seen = consumer.await.unwrap();
        assert_eq!(seen, (0..N).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(
            capacity in 1usize..16,
            ops in prop::collection::vec(any::<bool>(), 0..100)
        ) {
            let queue = FrameQueue::new(capacity);
            let mut next_id = 0;
            let mut expected_front = 0;

            for push in ops {
                if push {
                    let before = queue.len();
                    let accepted = queue.try_push(tiny_frame(next_id)).is_ok();
                    prop_assert_eq!(accepted, before < capacity);
                    if accepted {
                        next_id += 1;
                    } else {
                        prop_assert_eq!(queue.len(), before);
                    }
                } else if let Some(frame) = queue.pop_front() {
                    prop_assert_eq!(frame.train_id(), expected_front);
                    expected_front += 1;
                }
                prop_assert!(queue.len() <= capacity);
            }
        }
    }
}
