use hashbrown::HashMap;
use rapidhash::quality::RandomState;

/// A handle to a non-negative scalar value, with its sign folded into the
/// handle itself.
///
/// # Bit layout
/// * **Bits 1..32:** index into the owning [`ScalarStore`]'s arena.
/// * **Bit 0 (LSB):** sign flag. `1` = negated, `0` = positive.
///
/// Index in the high bits, a one-bit flag in the low bit — the handle's
/// sign, rather than a negation marker.
///
/// A handle pointing at a *canonical* arena slot always holds a non-negative
/// `value`, and the sign bit supplies the sign. A handle pointing at a
/// *scratch* slot (see [`ScalarStore::get_temporary`]) instead lets the
/// pointed-to `value` carry its own sign directly, with the handle's sign bit
/// left clear — `val()` accounts for both cases uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ScalarHandle(u32);

impl ScalarHandle {
    /// The pinned zero entry. Refcount-immune; `0.0` never carries a sign.
    pub const ZERO: Self = Self(0);
    /// The pinned one entry.
    pub const ONE: Self = Self(1 << 1);

    fn new(idx: u32, neg: bool) -> Self {
        Self((idx << 1) | (neg as u32))
    }

    fn idx(self) -> usize {
        (self.0 >> 1) as usize
    }

    pub fn is_negative(self) -> bool {
        self.0 & 1 == 1
    }

    pub fn is_zero(self) -> bool {
        self.idx() == 0
    }

    pub fn is_one(self) -> bool {
        self == Self::ONE
    }

    /// Flips the sign bit, except on `Zero` — `-0.0` is never representable
    /// here (see spec invariant: scalar canonicity).
    pub fn negate(self) -> Self {
        if self.is_zero() {
            self
        } else {
            Self(self.0 ^ 1)
        }
    }
}

const PINNED_REFCOUNT: u32 = u32::MAX;

struct ScalarEntry {
    value: f64,
    refcount: u32,
}

/// A hash-consed table of non-negative real values, plus a scratch pool for
/// mutable intermediates used during recursive operations.
///
/// Two entries are pinned at construction with refcount fixed at
/// [`u32::MAX`] (sticky, never decremented): index `0` (`Zero`, value `0.0`)
/// and index `1` (`One`, value `1.0`).
pub struct ScalarStore {
    entries: Vec<ScalarEntry>,
    /// indices with refcount 0, recyclable either as a fresh canonical slot
    /// or as a scratch slot
    free: Vec<u32>,
    /// quantized |value| -> candidate canonical indices at that quantum
    buckets: HashMap<i64, Vec<u32>, RandomState>,
    tolerance: f64,
}

impl ScalarStore {
    pub fn new(tolerance: f64) -> Self {
        Self {
            entries: vec![
                ScalarEntry {
                    value: 0.0,
                    refcount: PINNED_REFCOUNT,
                },
                ScalarEntry {
                    value: 1.0,
                    refcount: PINNED_REFCOUNT,
                },
            ],
            free: Vec::new(),
            buckets: HashMap::with_hasher(RandomState::new()),
            tolerance,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// The signed real value a handle represents.
    pub fn val(&self, h: ScalarHandle) -> f64 {
        let v = self.entries[h.idx()].value;
        if h.is_negative() { -v } else { v }
    }

    fn quantize(&self, abs_value: f64) -> i64 {
        (abs_value / self.tolerance).round() as i64
    }

    fn alloc_slot(&mut self, value: f64) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.entries[idx as usize] = ScalarEntry { value, refcount: 0 };
            idx
        } else {
            let idx = self.entries.len() as u32;
            self.entries.push(ScalarEntry { value, refcount: 0 });
            idx
        }
    }

    /// Canonicalizes `v`, returning a handle with the sign bit set if `v` is
    /// negative. Values with `|v| < τ` collapse to `Zero`.
    pub fn lookup(&mut self, v: f64) -> ScalarHandle {
        let neg = v.is_sign_negative() && v != 0.0;
        let abs_v = v.abs();
        if abs_v < self.tolerance {
            return ScalarHandle::ZERO;
        }
        if (abs_v - 1.0).abs() < self.tolerance {
            return if neg {
                ScalarHandle::ONE.negate()
            } else {
                ScalarHandle::ONE
            };
        }

        let q = self.quantize(abs_v);
        for bucket_key in [q - 1, q, q + 1] {
            if let Some(candidates) = self.buckets.get(&bucket_key) {
                for &idx in candidates {
                    if (self.entries[idx as usize].value - abs_v).abs() < self.tolerance {
                        return ScalarHandle::new(idx, neg);
                    }
                }
            }
        }

        let idx = self.alloc_slot(abs_v);
        self.buckets.entry(q).or_default().push(idx);
        ScalarHandle::new(idx, neg)
    }

    /// Pops a scratch entry for a mutable intermediate. The caller may freely
    /// mutate its value via [`ScalarStore::set_temporary`]; it must never
    /// leak into the canonical table without going through [`lookup`](Self::lookup).
    pub fn get_temporary(&mut self) -> ScalarHandle {
        let idx = self.alloc_slot(0.0);
        ScalarHandle::new(idx, false)
    }

    pub fn set_temporary(&mut self, h: ScalarHandle, value: f64) {
        debug_assert!(!h.is_negative(), "temporaries carry their own sign in value");
        self.entries[h.idx()].value = value;
    }

    /// Returns a scratch handle to the free pool without canonicalizing it.
    pub fn return_to_cache(&mut self, h: ScalarHandle) {
        self.free.push(h.idx() as u32);
    }

    pub fn inc_ref(&mut self, h: ScalarHandle) {
        if h.idx() <= 1 {
            return;
        }
        let e = &mut self.entries[h.idx()];
        if e.refcount != PINNED_REFCOUNT {
            e.refcount += 1;
        }
    }

    pub fn dec_ref(&mut self, h: ScalarHandle) {
        if h.idx() <= 1 {
            return;
        }
        let e = &mut self.entries[h.idx()];
        if e.refcount != PINNED_REFCOUNT && e.refcount > 0 {
            e.refcount -= 1;
        }
    }

    /// Sweeps canonical entries with refcount `0` back into the free pool.
    /// Returns the number of entries freed.
    pub fn garbage_collect(&mut self, _force: bool) -> usize {
        let mut freed = 0;
        for idx in 2..self.entries.len() as u32 {
            if self.entries[idx as usize].refcount == 0 {
                let value = self.entries[idx as usize].value;
                let q = self.quantize(value);
                if let Some(bucket) = self.buckets.get_mut(&q) {
                    bucket.retain(|&candidate| candidate != idx);
                    if bucket.is_empty() {
                        self.buckets.remove(&q);
                    }
                }
                self.free.push(idx);
                freed += 1;
            }
        }
        freed
    }

    pub fn live_count(&self) -> usize {
        self.entries.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_one_are_pinned() {
        let mut store = ScalarStore::new(1e-13);
        assert_eq!(store.lookup(0.0), ScalarHandle::ZERO);
        assert_eq!(store.lookup(1.0), ScalarHandle::ONE);
        assert_eq!(store.val(ScalarHandle::ZERO), 0.0);
        assert_eq!(store.val(ScalarHandle::ONE), 1.0);
    }

    #[test]
    fn tolerant_values_collide() {
        let mut store = ScalarStore::new(1e-13);
        let a = store.lookup(0.5);
        let b = store.lookup(0.5 + 1e-15);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_values_get_distinct_handles() {
        let mut store = ScalarStore::new(1e-13);
        let a = store.lookup(0.3);
        let b = store.lookup(0.7);
        assert_ne!(a, b);
    }

    #[test]
    fn negative_values_round_trip_sign() {
        let mut store = ScalarStore::new(1e-13);
        let h = store.lookup(-0.25);
        assert!(h.is_negative());
        assert_eq!(store.val(h), -0.25);
        assert_eq!(store.val(h.negate()), 0.25);
    }

    #[test]
    fn tiny_magnitude_collapses_to_zero() {
        let mut store = ScalarStore::new(1e-13);
        let h = store.lookup(-1e-20);
        assert_eq!(h, ScalarHandle::ZERO);
    }

    #[test]
    fn scratch_round_trip_does_not_pollute_table() {
        let mut store = ScalarStore::new(1e-13);
        let before = store.live_count();
        let t = store.get_temporary();
        store.set_temporary(t, 42.0);
        assert_eq!(store.val(t), 42.0);
        store.return_to_cache(t);
        assert_eq!(store.live_count(), before);
    }

    #[test]
    fn garbage_collect_reclaims_zero_refcount_entries() {
        let mut store = ScalarStore::new(1e-13);
        let h = store.lookup(3.5);
        store.inc_ref(h);
        assert_eq!(store.garbage_collect(true), 0);
        store.dec_ref(h);
        assert_eq!(store.garbage_collect(true), 1);
        let after = store.lookup(9.25);
        assert!(after.idx() <= h.idx() + 1);
    }
}
