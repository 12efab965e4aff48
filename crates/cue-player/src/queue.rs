//! FIFO of play requests between caller threads and the dispatch thread.
//!
//! Producers push clip names from any thread; exactly one consumer pops them.
//! Shutdown is deterministic: after [`PlayQueue::close`] the consumer keeps receiving
//! whatever was already queued and only then sees `None`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Unbounded multi-producer queue of clip names.
///
/// ## Design
/// - A single [`Condvar`] signals "state changed" (item pushed or queue closed).
/// - The `running` flag lives *under the same mutex* as the items so a close can never
///   slip between the consumer's check and its wait.
pub struct PlayQueue {
    inner: Mutex<QueueInner>,
    cv: Condvar,
}

struct QueueInner {
    items: VecDeque<String>,
    running: bool,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                running: true,
            }),
            cv: Condvar::new(),
        }
    }

    /// Append a request and wake the consumer.
    ///
    /// Pushes after [`close`](Self::close) are still accepted; whether they are seen
    /// depends on whether the consumer has already exited.
    pub fn push(&self, name: impl Into<String>) {
        let mut g = self.inner.lock().unwrap();
        g.items.push_back(name.into());
        drop(g);
        self.cv.notify_one();
    }

    /// Block until a request is available or the queue is closed and empty.
    pub fn pop_blocking(&self) -> Option<String> {
        let mut g = self.inner.lock().unwrap();
        while g.items.is_empty() && g.running {
            g = self.cv.wait(g).unwrap();
        }
        g.items.pop_front()
    }

    /// Mark the queue as stopping and wake all waiters. Idempotent.
    pub fn close(&self) {
        let mut g = self.inner.lock().unwrap();
        g.running = false;
        drop(g);
        self.cv.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().running
    }

    /// Number of queued requests (best-effort snapshot).
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PlayQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn pop_returns_items_in_push_order() {
        let q = PlayQueue::new();
        q.push("a");
        q.push("b");
        q.push("c");
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop_blocking().as_deref(), Some("a"));
        assert_eq!(q.pop_blocking().as_deref(), Some("b"));
        assert_eq!(q.pop_blocking().as_deref(), Some("c"));
        assert!(q.is_empty());
    }

    #[test]
    fn close_drains_before_returning_none() {
        let q = PlayQueue::new();
        q.push("a");
        q.push("b");
        q.close();
        assert!(!q.is_running());
        assert_eq!(q.pop_blocking().as_deref(), Some("a"));
        assert_eq!(q.pop_blocking().as_deref(), Some("b"));
        assert_eq!(q.pop_blocking(), None);
        assert_eq!(q.pop_blocking(), None);
    }

    #[test]
    fn pop_blocking_wakes_on_push() {
        let q = Arc::new(PlayQueue::new());
        let q_pop = q.clone();
        let barrier = Arc::new(std::sync::Barrier::new(2));
        let start = barrier.clone();

        let handle = thread::spawn(move || {
            start.wait();
            q_pop.pop_blocking()
        });

        barrier.wait();
        thread::sleep(Duration::from_millis(10));
        q.push("late");
        assert_eq!(handle.join().unwrap().as_deref(), Some("late"));
    }

    #[test]
    fn pop_blocking_wakes_on_close() {
        let q = Arc::new(PlayQueue::new());
        let q_pop = q.clone();
        let handle = thread::spawn(move || q_pop.pop_blocking());
        thread::sleep(Duration::from_millis(10));
        q.close();
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let q = Arc::new(PlayQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let q = q.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        q.push(format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        q.close();

        let mut seen = 0;
        let mut last_per_thread = [-1i32; 4];
        while let Some(name) = q.pop_blocking() {
            let (t, i) = name.split_once('-').unwrap();
            let (t, i): (usize, i32) = (t.parse().unwrap(), i.parse().unwrap());
            // Each producer's own pushes stay in order.
            assert!(i > last_per_thread[t]);
            last_per_thread[t] = i;
            seen += 1;
        }
        assert_eq!(seen, 400);
    }

    #[test]
    fn pushes_racing_close_never_block_or_panic() {
        let q = Arc::new(PlayQueue::new());
        let consumer = {
            let q = q.clone();
            thread::spawn(move || {
                let mut n = 0usize;
                while q.pop_blocking().is_some() {
                    n += 1;
                }
                n
            })
        };
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let q = q.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        q.push("x");
                    }
                })
            })
            .collect();
        q.close();
        for p in producers {
            p.join().unwrap();
        }

        // Whatever the consumer missed is still sitting in the queue.
        let consumed = consumer.join().unwrap();
        assert_eq!(consumed + q.len(), 2_000);
    }
}
