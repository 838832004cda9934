//! Shared pool of byte buffers for in-flight reads.
//!
//! A rented buffer is exclusively owned by one [`PooledBuffer`] guard and goes
//! back to the pool when the guard is dropped, on every exit path. Released
//! buffers are kept up to a configurable count and handed out again to the
//! next request that fits into their capacity.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// Buffers never shrink below this capacity.
const MIN_CAPACITY: usize = 1024;

/// Pool of reusable byte buffers. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
    rented: AtomicU64,
    returned: AtomicU64,
    allocated: AtomicU64,
    reused: AtomicU64,
}

/// Pool usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Buffers handed out.
    pub rented: u64,
    /// Buffers given back.
    pub returned: u64,
    /// Buffers currently owned by a guard.
    pub outstanding: u64,
    /// Rentals served by a fresh allocation.
    pub allocated: u64,
    /// Rentals served by a retained buffer.
    pub reused: u64,
    /// Buffers currently retained for reuse.
    pub retained: usize,
}

impl BufferPool {
    /// Create a pool that keeps at most `max_retained` released buffers.
    pub fn new(max_retained: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::new()),
                max_retained,
                rented: AtomicU64::new(0),
                returned: AtomicU64::new(0),
                allocated: AtomicU64::new(0),
                reused: AtomicU64::new(0),
            }),
        }
    }

    /// Rent a zero-filled buffer of exactly `len` bytes.
    pub fn rent(&self, len: usize) -> PooledBuffer {
        let reused = {
            let mut free = self.inner.free.lock();
            let index = free.iter().position(|buffer| buffer.capacity() >= len);
            index.map(|index| free.swap_remove(index))
        };

        let mut buffer = match reused {
            Some(buffer) => {
                self.inner.reused.fetch_add(1, Ordering::Relaxed);
                buffer
            }
            None => {
                self.inner.allocated.fetch_add(1, Ordering::Relaxed);
                let capacity = optimal_capacity(len);
                trace!(len, capacity, "Allocating pool buffer");
                Vec::with_capacity(capacity)
            }
        };

        buffer.clear();
        buffer.resize(len, 0);
        self.inner.rented.fetch_add(1, Ordering::Relaxed);

        PooledBuffer {
            buffer,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Get pool statistics.
    pub fn stats(&self) -> PoolStats {
        let rented = self.inner.rented.load(Ordering::Relaxed);
        let returned = self.inner.returned.load(Ordering::Relaxed);

        PoolStats {
            rented,
            returned,
            outstanding: rented.saturating_sub(returned),
            allocated: self.inner.allocated.load(Ordering::Relaxed),
            reused: self.inner.reused.load(Ordering::Relaxed),
            retained: self.inner.free.lock().len(),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(64)
    }
}

impl PoolInner {
    fn release(&self, mut buffer: Vec<u8>) {
        buffer.clear();

        let mut free = self.free.lock();
        if free.len() < self.max_retained {
            free.push(buffer);
        }
        drop(free);

        self.returned.fetch_add(1, Ordering::Relaxed);
    }
}

/// Exclusive handle to a rented buffer.
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        self.pool.release(buffer);
    }
}

/// Round a requested size up to the next power of two.
fn optimal_capacity(size: usize) -> usize {
    size.max(MIN_CAPACITY).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rent_is_zeroed_and_exact() {
        let pool = BufferPool::new(4);
        let mut buffer = pool.rent(10);
        assert_eq!(buffer.len(), 10);
        buffer[3] = 7;
        drop(buffer);

        let buffer = pool.rent(5);
        assert_eq!(&buffer[..], &[0u8; 5]);
    }

    #[test]
    fn test_reuse() {
        let pool = BufferPool::new(4);
        drop(pool.rent(100));
        drop(pool.rent(200));

        let stats = pool.stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.retained, 1);
    }

    #[test]
    fn test_outstanding() {
        let pool = BufferPool::new(4);
        let a = pool.rent(8);
        let b = pool.clone().rent(8);
        assert_eq!(pool.stats().outstanding, 2);
        drop(a);
        assert_eq!(pool.stats().outstanding, 1);
        drop(b);
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    fn test_max_retained() {
        let pool = BufferPool::new(1);
        let a = pool.rent(8);
        let b = pool.rent(8);
        drop(a);
        drop(b);
        assert_eq!(pool.stats().retained, 1);
        assert_eq!(pool.stats().returned, 2);
    }

    #[test]
    fn test_optimal_capacity() {
        assert_eq!(optimal_capacity(0), 1024);
        assert_eq!(optimal_capacity(1500), 2048);
        assert_eq!(optimal_capacity(4096), 4096);
    }

    #[test]
    fn test_concurrent_rentals() {
        let pool = BufferPool::new(8);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let pool = pool.clone();
                scope.spawn(move || {
                    for len in 1..50 {
                        let mut buffer = pool.rent(len * 10);
                        buffer.fill(1);
                    }
                });
            }
        });

        let stats = pool.stats();
        assert_eq!(stats.rented, 8 * 49);
        assert_eq!(stats.outstanding, 0);
    }
}
