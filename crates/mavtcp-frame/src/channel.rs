//! Channel slots.
//!
//! Every live link (client, server, or accepted connection) leases one slot.
//! The slot number tags log lines and bounds how many links may exist at
//! once. [`ChannelPool::global`] is the process-wide pool shared by all
//! transports; private pools exist for embedding and tests.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Capacity of the process-wide pool.
pub const MAX_CHANNELS: usize = 32;

/// Hard upper bound of any pool (one bit per slot).
pub const POOL_LIMIT: usize = 64;

/// Fixed-size set of channel slots.
pub struct ChannelPool {
    capacity: usize,
    used: AtomicU64,
}

impl ChannelPool {
    /// Create a private pool.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`POOL_LIMIT`].
    pub fn new(capacity: usize) -> Arc<Self> {
        assert!(
            capacity <= POOL_LIMIT,
            "channel pool capacity {capacity} exceeds {POOL_LIMIT}"
        );
        Arc::new(Self {
            capacity,
            used: AtomicU64::new(0),
        })
    }

    /// The process-wide pool.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ChannelPool>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| ChannelPool::new(MAX_CHANNELS)))
    }

    /// Lease the lowest free slot, or `None` when the pool is exhausted.
    pub fn allocate(self: &Arc<Self>) -> Option<ChannelSlot> {
        let mut used = self.used.load(Ordering::Acquire);
        loop {
            let free = (!used).trailing_zeros() as usize;
            if free >= self.capacity {
                return None;
            }
            let claimed = used | (1u64 << free);
            match self
                .used
                .compare_exchange_weak(used, claimed, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    return Some(ChannelSlot {
                        pool: Arc::clone(self),
                        id: free as u8,
                    })
                }
                Err(current) => used = current,
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.capacity - self.used.load(Ordering::Acquire).count_ones() as usize
    }

    fn release(&self, id: u8) {
        self.used.fetch_and(!(1u64 << id), Ordering::AcqRel);
    }
}

impl fmt::Debug for ChannelPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

/// A leased channel slot; returned to its pool on drop.
pub struct ChannelSlot {
    pool: Arc<ChannelPool>,
    id: u8,
}

impl ChannelSlot {
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Pool this slot was leased from.
    pub fn pool(&self) -> &Arc<ChannelPool> {
        &self.pool
    }
}

impl Drop for ChannelSlot {
    fn drop(&mut self) {
        self.pool.release(self.id);
    }
}

impl fmt::Debug for ChannelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChannelSlot").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_slot() {
        let pool = ChannelPool::new(4);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        assert_eq!((a.id(), b.id()), (0, 1));

        drop(a);
        let c = pool.allocate().unwrap();
        assert_eq!(c.id(), 0);
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let pool = ChannelPool::new(2);
        let _a = pool.allocate().unwrap();
        let _b = pool.allocate().unwrap();
        assert!(pool.allocate().is_none());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn drop_returns_slot() {
        let pool = ChannelPool::new(1);
        {
            let _slot = pool.allocate().unwrap();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn full_width_pool() {
        let pool = ChannelPool::new(POOL_LIMIT);
        let slots: Vec<_> = (0..POOL_LIMIT).map(|_| pool.allocate().unwrap()).collect();
        assert_eq!(slots.last().unwrap().id(), 63);
        assert!(pool.allocate().is_none());
    }

    #[test]
    fn concurrent_allocation_yields_unique_slots() {
        let pool = ChannelPool::new(POOL_LIMIT);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    (0..8)
                        .map(|_| pool.allocate().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u8> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(|slot| {
                let id = slot.id();
                std::mem::forget(slot);
                id
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn global_pool_is_shared() {
        let a = ChannelPool::global();
        let b = ChannelPool::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.capacity(), MAX_CHANNELS);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn oversized_pool_panics() {
        let _ = ChannelPool::new(POOL_LIMIT + 1);
    }
}
