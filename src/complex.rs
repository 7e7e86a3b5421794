use std::fmt;

use crate::scalar::{ScalarHandle, ScalarStore};

/// A complex number as a pair of signed scalar handles.
///
/// Two sentinels exist: [`ComplexHandle::ZERO`] and [`ComplexHandle::ONE`].
/// Equality (`PartialEq`) is exact, component-wise pointer equality — useful
/// for quick rejection and for hashing compute-table keys. Correctness
/// critical branches ("is this edge weight zero?") must instead go through
/// [`ComplexHandle::approx_zero`] / [`ComplexHandle::approx_equal`], which
/// compare under the store's tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComplexHandle {
    pub real: ScalarHandle,
    pub imag: ScalarHandle,
}

impl ComplexHandle {
    pub const ZERO: Self = Self {
        real: ScalarHandle::ZERO,
        imag: ScalarHandle::ZERO,
    };
    pub const ONE: Self = Self {
        real: ScalarHandle::ONE,
        imag: ScalarHandle::ZERO,
    };

    pub fn new(real: ScalarHandle, imag: ScalarHandle) -> Self {
        Self { real, imag }
    }

    pub fn is_exactly_zero(self) -> bool {
        self == Self::ZERO
    }

    pub fn is_exactly_one(self) -> bool {
        self == Self::ONE
    }
}

/// Arithmetic and canonicalization over [`ComplexHandle`]s, backed by a
/// [`ScalarStore`].
///
/// Mirrors the free-function style of the original `ComplexNumbers` facade:
/// every binary op takes an explicit destination plus two sources, and the
/// destination must be a scratch handle (never `Zero`/`One`).
pub struct ComplexNumbers<'a> {
    pub scalars: &'a mut ScalarStore,
}

impl<'a> ComplexNumbers<'a> {
    pub fn new(scalars: &'a mut ScalarStore) -> Self {
        Self { scalars }
    }

    pub fn approx_zero(&self, c: ComplexHandle) -> bool {
        self.scalars.val(c.real).abs() < self.scalars.tolerance()
            && self.scalars.val(c.imag).abs() < self.scalars.tolerance()
    }

    pub fn approx_one(&self, c: ComplexHandle) -> bool {
        (self.scalars.val(c.real) - 1.0).abs() < self.scalars.tolerance()
            && self.scalars.val(c.imag).abs() < self.scalars.tolerance()
    }

    pub fn approx_equal(&self, a: ComplexHandle, b: ComplexHandle) -> bool {
        let tol = self.scalars.tolerance();
        (self.scalars.val(a.real) - self.scalars.val(b.real)).abs() < tol
            && (self.scalars.val(a.imag) - self.scalars.val(b.imag)).abs() < tol
    }

    /// Allocates a scratch complex handle (two fresh temporaries).
    pub fn get_temporary(&mut self) -> ComplexHandle {
        ComplexHandle::new(self.scalars.get_temporary(), self.scalars.get_temporary())
    }

    pub fn return_to_cache(&mut self, c: ComplexHandle) {
        if c == ComplexHandle::ZERO || c == ComplexHandle::ONE {
            return;
        }
        self.scalars.return_to_cache(c.real);
        self.scalars.return_to_cache(c.imag);
    }

    fn write(&mut self, dest: ComplexHandle, r: f64, i: f64) {
        self.scalars.set_temporary(dest.real, r);
        self.scalars.set_temporary(dest.imag, i);
    }

    pub fn add(&mut self, dest: ComplexHandle, a: ComplexHandle, b: ComplexHandle) {
        let r = self.scalars.val(a.real) + self.scalars.val(b.real);
        let i = self.scalars.val(a.imag) + self.scalars.val(b.imag);
        self.write(dest, r, i);
    }

    pub fn sub(&mut self, dest: ComplexHandle, a: ComplexHandle, b: ComplexHandle) {
        let r = self.scalars.val(a.real) - self.scalars.val(b.real);
        let i = self.scalars.val(a.imag) - self.scalars.val(b.imag);
        self.write(dest, r, i);
    }

    pub fn mul(&mut self, dest: ComplexHandle, a: ComplexHandle, b: ComplexHandle) {
        if self.approx_one(a) {
            let r = self.scalars.val(b.real);
            let i = self.scalars.val(b.imag);
            self.write(dest, r, i);
            return;
        }
        if self.approx_one(b) {
            let r = self.scalars.val(a.real);
            let i = self.scalars.val(a.imag);
            self.write(dest, r, i);
            return;
        }
        if self.approx_zero(a) || self.approx_zero(b) {
            self.write(dest, 0.0, 0.0);
            return;
        }
        let (ar, ai) = (self.scalars.val(a.real), self.scalars.val(a.imag));
        let (br, bi) = (self.scalars.val(b.real), self.scalars.val(b.imag));
        self.write(dest, ar * br - ai * bi, ar * bi + ai * br);
    }

    pub fn div(&mut self, dest: ComplexHandle, a: ComplexHandle, b: ComplexHandle) {
        if self.approx_equal(a, b) {
            self.write(dest, 1.0, 0.0);
            return;
        }
        if self.approx_one(b) {
            let r = self.scalars.val(a.real);
            let i = self.scalars.val(a.imag);
            self.write(dest, r, i);
            return;
        }
        let (ar, ai) = (self.scalars.val(a.real), self.scalars.val(a.imag));
        let (br, bi) = (self.scalars.val(b.real), self.scalars.val(b.imag));
        let denom = br * br + bi * bi;
        self.write(dest, (ar * br + ai * bi) / denom, (ai * br - ar * bi) / denom);
    }

    pub fn mag2(&self, c: ComplexHandle) -> f64 {
        let r = self.scalars.val(c.real);
        let i = self.scalars.val(c.imag);
        r * r + i * i
    }

    pub fn mag(&self, c: ComplexHandle) -> f64 {
        self.mag2(c).sqrt()
    }

    pub fn arg(&self, c: ComplexHandle) -> f64 {
        self.scalars.val(c.imag).atan2(self.scalars.val(c.real))
    }

    /// Flips the imaginary part's sign, unless it is `Zero`.
    pub fn conj(&self, c: ComplexHandle) -> ComplexHandle {
        let imag = if c.imag.is_zero() {
            c.imag
        } else {
            c.imag.negate()
        };
        ComplexHandle::new(c.real, imag)
    }

    /// Flips the sign of both components, skipping any component that is
    /// already `Zero`.
    pub fn neg(&self, c: ComplexHandle) -> ComplexHandle {
        let real = if c.real.is_zero() { c.real } else { c.real.negate() };
        let imag = if c.imag.is_zero() { c.imag } else { c.imag.negate() };
        ComplexHandle::new(real, imag)
    }

    /// Canonicalizes a scratch complex handle through the scalar store.
    pub fn lookup(&mut self, c: ComplexHandle) -> ComplexHandle {
        if c == ComplexHandle::ZERO || c == ComplexHandle::ONE {
            return c;
        }
        let (r, i) = (self.scalars.val(c.real), self.scalars.val(c.imag));
        ComplexHandle::new(self.scalars.lookup(r), self.scalars.lookup(i))
    }

    pub fn lookup_values(&mut self, r: f64, i: f64) -> ComplexHandle {
        ComplexHandle::new(self.scalars.lookup(r), self.scalars.lookup(i))
    }

    pub fn inc_ref(&mut self, c: ComplexHandle) {
        if c == ComplexHandle::ZERO || c == ComplexHandle::ONE {
            return;
        }
        self.scalars.inc_ref(c.real);
        self.scalars.inc_ref(c.imag);
    }

    pub fn dec_ref(&mut self, c: ComplexHandle) {
        if c == ComplexHandle::ZERO || c == ComplexHandle::ONE {
            return;
        }
        self.scalars.dec_ref(c.real);
        self.scalars.dec_ref(c.imag);
    }

    /// A depth-first-friendly debug rendering, `a+bi`. Not a stable
    /// serialization format — see [`Package`](crate::Package)'s binary dump
    /// for that.
    pub fn display(&self, c: ComplexHandle) -> String {
        format!("{}{:+}i", self.scalars.val(c.real), self.scalars.val(c.imag))
    }
}

impl fmt::Display for ComplexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Complex(real={:?}, imag={:?})", self.real, self.imag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_short_circuits_one_and_zero() {
        let mut store = ScalarStore::new(1e-13);
        let mut cn = ComplexNumbers::new(&mut store);
        let a = cn.lookup_values(3.0, 4.0);
        let dest = cn.get_temporary();
        cn.mul(dest, ComplexHandle::ONE, a);
        assert_eq!((cn.scalars.val(dest.real), cn.scalars.val(dest.imag)), (3.0, 4.0));

        let dest2 = cn.get_temporary();
        cn.mul(dest2, a, ComplexHandle::ZERO);
        assert_eq!((cn.scalars.val(dest2.real), cn.scalars.val(dest2.imag)), (0.0, 0.0));
    }

    #[test]
    fn conj_flips_only_imaginary() {
        let mut store = ScalarStore::new(1e-13);
        let mut cn = ComplexNumbers::new(&mut store);
        let a = cn.lookup_values(1.0, -2.0);
        let conj = cn.conj(a);
        assert_eq!(cn.scalars.val(conj.real), 1.0);
        assert_eq!(cn.scalars.val(conj.imag), 2.0);
    }

    #[test]
    fn neg_flips_both_unless_zero() {
        let mut store = ScalarStore::new(1e-13);
        let mut cn = ComplexNumbers::new(&mut store);
        let a = cn.lookup_values(1.0, 0.0);
        let n = cn.neg(a);
        assert_eq!(cn.scalars.val(n.real), -1.0);
        assert_eq!(cn.scalars.val(n.imag), 0.0);
        assert!(!n.imag.is_negative());
    }

    #[test]
    fn mag2_matches_classic_formula() {
        let mut store = ScalarStore::new(1e-13);
        let mut cn = ComplexNumbers::new(&mut store);
        let a = cn.lookup_values(3.0, 4.0);
        assert!((cn.mag2(a) - 25.0).abs() < 1e-12);
        assert!((cn.mag(a) - 5.0).abs() < 1e-12);
    }
}
