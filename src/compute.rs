//! Fixed-capacity memoization tables for the recursive operators in
//! [`crate::ops`].
//!
//! Each operator gets its own table, direct-indexed by a hash of its key
//! modulo the table's capacity: a single slot per bucket, last write wins.
//! That is the "open-addressed, evict on collision" design called for over a
//! chained hash map — the recursive operators are expected to call `lookup`
//! far more often than the cache actually helps on a miss, so a table that
//! never allocates past its initial capacity matters more than perfect
//! recall.
//!
//! A key only ever names the two operand *nodes*; edge weights are factored
//! out to `One` before lookup, so `2|0⟩` and `3i|0⟩` share a cache entry. The
//! stored value carries its own weight as a plain `(f64, f64)` pair rather
//! than a hash-consed handle — materializing it into a scratch handle is the
//! caller's job, via [`ComplexNumbers::get_temporary`].

use rapidhash::quality::RandomState;
use std::hash::{BuildHasher, Hash};

use crate::complex::{ComplexHandle, ComplexNumbers};

/// The two-node key shared by every binary compute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryKey<A, B> {
    pub a: A,
    pub b: B,
}

impl<A, B> BinaryKey<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

/// A memoized result: a node reference plus its weight as plain floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedValue<N> {
    pub node: Option<N>,
    pub real: f64,
    pub imag: f64,
}

impl<N: Copy> CachedValue<N> {
    pub fn new(node: Option<N>, weight: ComplexHandle, cn: &ComplexNumbers) -> Self {
        Self {
            node,
            real: cn.scalars.val(weight.real),
            imag: cn.scalars.val(weight.imag),
        }
    }

    /// Materializes this value's weight into a fresh scratch handle.
    pub fn materialize(&self, cn: &mut ComplexNumbers) -> (Option<N>, ComplexHandle) {
        let w = cn.get_temporary();
        cn.scalars.set_temporary(w.real, self.real);
        cn.scalars.set_temporary(w.imag, self.imag);
        (self.node, w)
    }
}

struct Slot<K, V> {
    key: K,
    value: V,
}

/// A fixed-size, single-slot-per-bucket memoization cache.
pub struct ComputeTable<K, V> {
    slots: Vec<Option<Slot<K, V>>>,
    hasher: RandomState,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash + Copy, V: Copy> ComputeTable<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            hasher: RandomState::new(),
            hits: 0,
            misses: 0,
        }
    }

    fn slot_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) as usize) % self.slots.len()
    }

    pub fn lookup(&mut self, key: K) -> Option<V> {
        let idx = self.slot_index(&key);
        match &self.slots[idx] {
            Some(slot) if slot.key == key => {
                self.hits += 1;
                Some(slot.value)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        let idx = self.slot_index(&key);
        if self.slots[idx].is_some() {
            tracing::trace!(idx, "compute table slot evicted");
        }
        self.slots[idx] = Some(Slot { key, value });
    }

    /// Drops every entry. Must be called whenever the unique tables reclaim
    /// nodes, since a stale entry may name a node pointer that no longer
    /// resolves to the same structural content (or to anything at all).
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut t: ComputeTable<BinaryKey<u32, u32>, u8> = ComputeTable::new(16);
        let k = BinaryKey::new(3, 7);
        assert_eq!(t.lookup(k), None);
        t.insert(k, 42);
        assert_eq!(t.lookup(k), Some(42));
    }

    #[test]
    fn clear_drops_all_entries() {
        let mut t: ComputeTable<BinaryKey<u32, u32>, u8> = ComputeTable::new(16);
        t.insert(BinaryKey::new(1, 2), 9);
        t.clear();
        assert_eq!(t.lookup(BinaryKey::new(1, 2)), None);
    }

    #[test]
    fn colliding_key_evicts_previous_entry() {
        let mut t: ComputeTable<BinaryKey<u32, u32>, u8> = ComputeTable::new(1);
        t.insert(BinaryKey::new(1, 1), 1);
        t.insert(BinaryKey::new(2, 2), 2);
        assert_eq!(t.lookup(BinaryKey::new(1, 1)), None);
        assert_eq!(t.lookup(BinaryKey::new(2, 2)), Some(2));
    }
}
