//! Bounded FIFO handoff queue.
//!
//! One producer and one consumer share each queue; the fixed capacity is the
//! pipeline's only backpressure mechanism. Waiting is polling with a short
//! backoff that re-checks the caller's condition, so shutdown responsiveness
//! is bounded by the poll interval.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub struct BoundedQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // A poisoned lock means a holder panicked mid-push/pop; the queue
        // itself is still structurally sound.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Push without waiting. Returns the item back when the queue is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return Err(item);
        }
        queue.push_back(item);
        Ok(())
    }

    /// Pop the oldest item, if any.
    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Push, polling with `backoff` while the queue is full and
    /// `keep_waiting()` holds. Returns false when the wait was abandoned
    /// (the item is dropped with the abandoned attempt).
    pub fn push_while(
        &self,
        mut item: T,
        keep_waiting: impl Fn() -> bool,
        backoff: Duration,
    ) -> bool {
        loop {
            match self.try_push(item) {
                Ok(()) => return true,
                Err(returned) => {
                    if !keep_waiting() {
                        return false;
                    }
                    item = returned;
                    std::thread::sleep(backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn fifo_order_is_exact() {
        let queue = BoundedQueue::new(4);
        for i in 0..4 {
            queue.try_push(i).unwrap();
        }
        for i in 0..4 {
            assert_eq!(queue.pop(), Some(i));
        }
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn push_fails_at_capacity() {
        let queue = BoundedQueue::new(2);
        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();
        assert_eq!(queue.try_push(3), Err(3));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn push_while_abandons_when_condition_drops() {
        let queue = BoundedQueue::new(1);
        queue.try_push(1).unwrap();
        let pushed = queue.push_while(2, || false, Duration::from_millis(1));
        assert!(!pushed);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn push_while_waits_for_capacity() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.try_push(1).unwrap();

        let consumer_queue = queue.clone();
        let consumer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            consumer_queue.pop()
        });

        let pushed = queue.push_while(2, || true, Duration::from_millis(1));
        assert!(pushed);
        assert_eq!(consumer.join().unwrap(), Some(1));
        assert_eq!(queue.pop(), Some(2));
    }

    #[test]
    fn capacity_bound_holds_under_concurrent_handoff() {
        let queue = Arc::new(BoundedQueue::new(3));
        let running = Arc::new(AtomicBool::new(true));

        let producer_queue = queue.clone();
        let producer_running = running.clone();
        let producer = std::thread::spawn(move || {
            for i in 0..100 {
                let ok = producer_queue.push_while(
                    i,
                    || producer_running.load(Ordering::Relaxed),
                    Duration::from_micros(100),
                );
                assert!(ok);
            }
        });

        let mut seen = Vec::new();
        while seen.len() < 100 {
            assert!(queue.len() <= queue.capacity());
            match queue.pop() {
                Some(item) => seen.push(item),
                None => std::thread::sleep(Duration::from_micros(100)),
            }
        }
        producer.join().unwrap();
        running.store(false, Ordering::Relaxed);

        let expected: Vec<i32> = (0..100).collect();
        assert_eq!(seen, expected);
    }
}
