//! Bounded FIFO task queue
//!
//! The queue is the only hand-off point between submitters and workers.
//! Pushes honour the configured [`PushPolicy`]; pops suspend until an item
//! arrives or the queue is closed and empty.

use parking_lot::Mutex;
use spindle_config::{PushPolicy, QueueConfig};
use std::collections::VecDeque;
use tokio::sync::Notify;

use crate::error::PushError;

/// Bounded multi-producer multi-consumer queue
///
/// `0 <= len <= capacity` holds at all times. An item accepted by a push is
/// delivered to exactly one pop or returned by exactly one [`drain`](Self::drain).
pub struct TaskQueue<T> {
    capacity: usize,
    policy: PushPolicy,
    inner: Mutex<QueueInner<T>>,
    /// Signalled when an item is pushed or the queue closes
    available: Notify,
    /// Signalled when an item is removed or the queue closes
    space: Notify,
}

struct QueueInner<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> TaskQueue<T> {
    pub fn new(capacity: usize, policy: PushPolicy) -> Self {
        Self {
            capacity,
            policy,
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Notify::new(),
            space: Notify::new(),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.capacity, config.push_policy)
    }

    /// Push according to the queue's policy
    ///
    /// Under [`PushPolicy::Block`] this suspends until space frees up or the
    /// queue is closed.
    pub async fn push(&self, item: T) -> Result<(), PushError<T>> {
        match self.policy {
            PushPolicy::Reject => self.try_push(item),
            PushPolicy::Block => self.push_blocking(item).await,
        }
    }

    /// Push without waiting, regardless of policy
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(PushError::Closed(item));
            }
            if inner.items.len() >= self.capacity {
                return Err(PushError::Full(item));
            }
            inner.items.push_back(item);
        }

        self.available.notify_one();
        Ok(())
    }

    async fn push_blocking(&self, mut item: T) -> Result<(), PushError<T>> {
        loop {
            let notified = self.space.notified();
            tokio::pin!(notified);
            // Register before checking so a pop between the check and the
            // await is not missed
            notified.as_mut().enable();

            match self.try_push(item) {
                Err(PushError::Full(rejected)) => item = rejected,
                other => return other,
            }

            notified.await;
        }
    }

    /// Take the oldest item, waiting for one if necessary
    ///
    /// Returns `None` once the queue is closed and drained. Cancel safe: an
    /// item is only removed when the returned future completes.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if let Some(item) = inner.items.pop_front() {
                    let more = !inner.items.is_empty();
                    drop(inner);

                    self.space.notify_one();
                    if more {
                        self.available.notify_one();
                    }
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Take the oldest item without waiting
    pub fn try_pop(&self) -> Option<T> {
        let item = self.inner.lock().items.pop_front();
        if item.is_some() {
            self.space.notify_one();
        }
        item
    }

    /// Stop accepting pushes; queued items stay poppable
    ///
    /// Wakes every waiting pusher and popper. Idempotent.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
        }

        self.available.notify_waiters();
        self.space.notify_waiters();
    }

    /// Remove and return every queued item in FIFO order
    pub fn drain(&self) -> Vec<T> {
        let drained: Vec<T> = self.inner.lock().items.drain(..).collect();
        if !drained.is_empty() {
            self.space.notify_waiters();
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> PushPolicy {
        self.policy
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl<T> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TaskQueue")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("len", &inner.items.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_reject_policy_when_full() {
        let queue = TaskQueue::new(5, PushPolicy::Reject);
        for i in 0..5 {
            queue.try_push(i).unwrap();
        }

        let err = queue.try_push(5).unwrap_err();
        assert!(err.is_full());
        assert_eq!(err.into_inner(), 5);
        assert_eq!(queue.len(), 5);

        assert_eq!(queue.try_pop(), Some(0));
        queue.try_push(5).unwrap();
        assert_eq!(queue.len(), 5);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = TaskQueue::new(10, PushPolicy::Reject);
        for i in 0..10 {
            queue.push(i).await.unwrap();
        }
        queue.close();

        let mut popped = Vec::new();
        while let Some(item) = queue.pop().await {
            popped.push(item);
        }
        assert_eq!(popped, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_push_after_close_hands_item_back() {
        let queue = TaskQueue::new(2, PushPolicy::Block);
        queue.push("a").await.unwrap();
        queue.close();
        queue.close();

        let err = queue.push("b").await.unwrap_err();
        assert!(err.is_closed());
        assert_eq!(err.into_inner(), "b");

        // Queued items remain poppable after close
        assert_eq!(queue.pop().await, Some("a"));
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_policy_waits_for_space() {
        let queue = Arc::new(TaskQueue::new(1, PushPolicy::Block));
        queue.push(1).await.unwrap();

        let pusher = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.push(2).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!pusher.is_finished());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop().await, Some(1));
        pusher.await.unwrap().unwrap();
        assert_eq!(queue.pop().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_wakes_blocked_pusher_and_popper() {
        let queue = Arc::new(TaskQueue::<u32>::new(1, PushPolicy::Block));

        let popper = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.close();
        assert_eq!(popper.await.unwrap(), None);

        let queue = Arc::new(TaskQueue::new(1, PushPolicy::Block));
        queue.push(1).await.unwrap();
        let pusher = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.push(2).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.close();

        let err = pusher.await.unwrap().unwrap_err();
        assert!(err.is_closed());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pending_pop_is_woken_by_push() {
        let queue = TaskQueue::new(2, PushPolicy::Reject);
        let mut pop = tokio_test::task::spawn(queue.pop());
        tokio_test::assert_pending!(pop.poll());

        queue.try_push(7).unwrap();
        assert!(pop.is_woken());
        tokio_test::assert_ready_eq!(pop.poll(), Some(7));
    }

    #[tokio::test]
    async fn test_drain_empties_queue() {
        let queue = TaskQueue::new(4, PushPolicy::Reject);
        for i in 0..3 {
            queue.try_push(i).unwrap();
        }
        queue.close();

        assert_eq!(queue.drain(), vec![0, 1, 2]);
        assert!(queue.is_empty());
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_once_delivery_to_many_consumers() {
        let queue = Arc::new(TaskQueue::new(8, PushPolicy::Block));
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(item) = queue.pop().await {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        for i in 0..1000u32 {
            queue.push(i).await.unwrap();
        }
        queue.close();

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }
}
