//! Bounded circular message buffer.
//!
//! The transport writes, the consumer drains.  When full, a push overwrites
//! the oldest entry and bumps the `lost` counter, so a slow reader sees the
//! most recent traffic and can tell how much it missed.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Default capacity per channel.
pub const RING_CAPACITY: usize = 200;

struct Inner<T> {
    buf:  VecDeque<T>,
    lost: u64,
}

pub struct RingBuffer<T> {
    inner:    Mutex<Inner<T>>,
    capacity: usize,
    notify:   Notify,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner { buf: VecDeque::with_capacity(capacity), lost: 0 }),
            capacity,
            notify: Notify::new(),
        }
    }

    /// Append `item`, overwriting the oldest entry when full.
    pub fn push(&self, item: T) {
        {
            let mut inner = self.inner.lock();
            if inner.buf.len() == self.capacity {
                inner.buf.pop_front();
                inner.lost += 1;
            }
            inner.buf.push_back(item);
        }
        self.notify.notify_one();
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.lock().buf.pop_front()
    }

    /// Take everything currently buffered, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().buf.drain(..).collect()
    }

    /// Wait for the next item.
    pub async fn recv(&self) -> T {
        loop {
            if let Some(item) = self.pop() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries overwritten before anyone read them.
    pub fn lost(&self) -> u64 {
        self.inner.lock().lost
    }
}
