//! Fixed-size transposition cache keyed by [`Position::key`](crate::game::Position::key).
//!
//! Each slot packs a 56-bit key and an 8-bit value into one `u64`; a zero
//! slot is empty, which is unambiguous because position keys are never 0.
//! Collisions are resolved by double hashing. The table never grows and
//! never evicts: once a key's whole probe sequence is occupied by other
//! keys, `put` gives up and the entry is simply not cached.

use std::cell::Cell;

use serde::Serialize;

/// Bits available for a key.
pub const KEY_BITS: u32 = 56;
const KEY_MASK: u64 = (1 << KEY_BITS) - 1;
const VALUE_BITS: u32 = 8;
const EMPTY: u64 = 0;

fn mix(key: u64) -> u64 {
    let mut z = key;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Exhausted,
}

/// Snapshot of cache occupancy and probe statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub occupied: usize,
    pub lookups: u64,
    pub collisions: u64,
}

impl CacheStats {
    /// Fraction of lookups and inserts that needed more than one probe.
    pub fn collision_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.collisions as f64 / self.lookups as f64
        }
    }
}

pub struct TranspositionCache {
    slots: Box<[u64]>,
    index_mask: usize,
    occupied: usize,
    lookups: Cell<u64>,
    collisions: Cell<u64>,
}

impl TranspositionCache {
    /// Create a cache with at least `capacity` slots. The slot count is
    /// rounded up to a power of two, with a minimum of 2.
    pub fn new(capacity: usize) -> Self {
        let len = capacity.max(2).next_power_of_two();
        TranspositionCache {
            slots: vec![EMPTY; len].into_boxed_slice(),
            index_mask: len - 1,
            occupied: 0,
            lookups: Cell::new(0),
            collisions: Cell::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Empty every slot and zero the statistics.
    pub fn reset(&mut self) {
        self.slots.fill(EMPTY);
        self.occupied = 0;
        self.lookups.set(0);
        self.collisions.set(0);
    }

    /// Store `value` for `key`, replacing any value already stored for it.
    ///
    /// Returns `false` when every slot on the key's probe sequence holds a
    /// different key; the value is then dropped.
    pub fn put(&mut self, key: u64, value: u8) -> bool {
        debug_assert!(key != 0 && key <= KEY_MASK, "invalid cache key {key:#x}");
        let packed = (key << VALUE_BITS) | u64::from(value);
        match self.probe(key) {
            Probe::Found(index) => {
                self.slots[index] = packed;
                true
            }
            Probe::Vacant(index) => {
                self.slots[index] = packed;
                self.occupied += 1;
                true
            }
            Probe::Exhausted => {
                log::trace!("transposition cache full, dropping key {key:#x}");
                false
            }
        }
    }

    /// Value stored for `key`, if any.
    pub fn get(&self, key: u64) -> Option<u8> {
        debug_assert!(key != 0 && key <= KEY_MASK, "invalid cache key {key:#x}");
        match self.probe(key) {
            Probe::Found(index) => Some(self.slots[index] as u8),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity(),
            occupied: self.occupied,
            lookups: self.lookups.get(),
            collisions: self.collisions.get(),
        }
    }

    pub fn collision_rate(&self) -> f64 {
        self.stats().collision_rate()
    }

    fn primary(&self, key: u64) -> usize {
        mix(key) as usize & self.index_mask
    }

    // Odd, so it is coprime with the power-of-two length and the probe
    // sequence visits every slot before repeating.
    fn stride(&self, key: u64) -> usize {
        let h = (key.wrapping_mul(0x9e37_79b9_7f4a_7c15) >> 32) as usize;
        (1 + h % (self.slots.len() - 1)) | 1
    }

    fn probe(&self, key: u64) -> Probe {
        self.lookups.set(self.lookups.get() + 1);
        let stride = self.stride(key);
        let mut index = self.primary(key);
        for attempt in 0..self.slots.len() {
            let slot = self.slots[index];
            let probe = if slot == EMPTY {
                Some(Probe::Vacant(index))
            } else if slot >> VALUE_BITS == key {
                Some(Probe::Found(index))
            } else {
                None
            };
            if let Some(probe) = probe {
                if attempt > 0 {
                    self.collisions.set(self.collisions.get() + 1);
                }
                return probe;
            }
            index = (index + stride) & self.index_mask;
        }
        self.collisions.set(self.collisions.get() + 1);
        Probe::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_put_and_get() {
        let mut cache = TranspositionCache::new(128);
        assert!(cache.put(123, 42));
        assert_eq!(cache.get(123), Some(42));

        // Same key again replaces the value in place.
        assert!(cache.put(123, 99));
        assert_eq!(cache.get(123), Some(99));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.get(456), None);
    }

    #[test]
    fn test_zero_value_is_stored() {
        let mut cache = TranspositionCache::new(16);
        cache.put(7, 0);
        assert_eq!(cache.get(7), Some(0));
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        assert_eq!(TranspositionCache::new(128).capacity(), 128);
        assert_eq!(TranspositionCache::new(100).capacity(), 128);
        assert_eq!(TranspositionCache::new(0).capacity(), 2);
        assert_eq!(TranspositionCache::new(1).capacity(), 2);
    }

    #[test]
    fn test_collision_rate_grows_when_crowded() {
        let mut cache = TranspositionCache::new(128);
        let stored = (1..=200u64).filter(|&k| cache.put(k, (k % 10) as u8)).count();
        assert_eq!(stored, 128, "a full table accepts no new keys");
        assert_eq!(cache.len(), 128);
        assert!(cache.collision_rate() > 0.0);
    }

    #[test]
    fn test_full_table_degrades_to_miss() {
        let mut cache = TranspositionCache::new(4);
        for key in 1..=4u64 {
            assert!(cache.put(key, key as u8));
        }
        assert!(!cache.put(5, 5));
        assert_eq!(cache.get(5), None);
        // Keys already present can still be updated.
        assert!(cache.put(3, 30));
        assert_eq!(cache.get(3), Some(30));
        for key in [1u64, 2, 4] {
            assert_eq!(cache.get(key), Some(key as u8));
        }
    }

    #[test]
    fn test_reset() {
        let mut cache = TranspositionCache::new(128);
        cache.put(123, 42);
        cache.put(456, 99);

        cache.reset();

        // Statistics restart too.
        assert_eq!(cache.collision_rate(), 0.0);
        assert_eq!(cache.stats().lookups, 0);
        assert!(cache.is_empty());
        assert_eq!(cache.get(123), None);
        assert_eq!(cache.get(456), None);
    }

    #[test]
    fn test_round_trip_within_capacity() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut cache = TranspositionCache::new(128);
        let mut entries = Vec::new();
        while entries.len() < 100 {
            let key = rng.random_range(1..1u64 << 49);
            if entries.iter().any(|&(k, _)| k == key) {
                continue;
            }
            let value: u8 = rng.random();
            assert!(cache.put(key, value));
            entries.push((key, value));
        }
        for (key, value) in entries {
            assert_eq!(cache.get(key), Some(value), "lost key {key:#x}");
        }
    }

    #[test]
    fn test_keys_sharing_low_bits_fill_distinct_slots() {
        // Bitboard keys of similar positions differ only in their high bits.
        let mut cache = TranspositionCache::new(64);
        for i in 1..=64u64 {
            assert!(cache.put(i << 40, i as u8));
        }
        assert_eq!(cache.len(), 64);
        for i in 1..=64u64 {
            assert_eq!(cache.get(i << 40), Some(i as u8));
        }
    }

    #[test]
    fn test_stats_count_lookups() {
        let mut cache = TranspositionCache::new(8);
        cache.put(1, 1);
        cache.get(1);
        cache.get(2);
        let stats = cache.stats();
        assert_eq!(stats.lookups, 3);
        assert_eq!(stats.capacity, 8);
        assert_eq!(stats.occupied, 1);
    }
}
