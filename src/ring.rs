//! Single-producer/single-consumer hand-off from interrupt to task context.
//!
//! Built on [`heapless::spsc::Queue`]: [`split`] hands out exactly one
//! [`RingProducer`] and one [`RingConsumer`], neither of which can be
//! cloned, so the one-writer-per-index rule is enforced by ownership. The
//! queue holds `N - 1` items. A push into a full queue drops the item and
//! counts it; nothing is overwritten and the producer never waits.

use heapless::spsc::{Consumer, Producer, Queue};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Create a queue and split it. The backing storage is leaked, so both
/// halves are `'static` and can move into threads or tasks independently.
pub fn split<T: 'static, const N: usize>() -> (RingProducer<T, N>, RingConsumer<T, N>) {
    let queue: &'static mut Queue<T, N> = Box::leak(Box::new(Queue::new()));
    let (producer, consumer) = queue.split();
    let dropped = Arc::new(AtomicU32::new(0));

    (
        RingProducer {
            inner: producer,
            dropped: Arc::clone(&dropped),
        },
        RingConsumer {
            inner: consumer,
            dropped,
        },
    )
}

pub struct RingProducer<T: 'static, const N: usize> {
    inner: Producer<'static, T, N>,
    dropped: Arc<AtomicU32>,
}

impl<T: 'static, const N: usize> RingProducer<T, N> {
    /// Returns `false` (and counts a drop) when the queue is full.
    pub fn push(&mut self, item: T) -> bool {
        match self.inner.enqueue(item) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Items rejected because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T: 'static, const N: usize> fmt::Debug for RingProducer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingProducer")
            .field("len", &self.inner.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

pub struct RingConsumer<T: 'static, const N: usize> {
    inner: Consumer<'static, T, N>,
    dropped: Arc<AtomicU32>,
}

impl<T: 'static, const N: usize> RingConsumer<T, N> {
    pub fn pop(&mut self) -> Option<T> {
        self.inner.dequeue()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.inner.ready()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Iterator over everything currently queued.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.pop())
    }
}

impl<T: 'static, const N: usize> fmt::Debug for RingConsumer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingConsumer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("dropped", &self.dropped())
            .finish()
    }
}
