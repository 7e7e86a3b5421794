//! The package facade: owns every arena, table, and cache a running DD
//! computation needs, and exposes the public operations over them.
//!
//! A single owning context object threaded through every operation, the way
//! a hash-consing map's owner is threaded through `alloc`/`union`/
//! `intersection` elsewhere — widened here to cover two node kinds, a scalar
//! store, and a family of compute-table caches instead of one map.

use crate::compute::{BinaryKey, CachedValue, ComputeTable};
use crate::config::PackageConfig;
use crate::error::{QmddError, Result};
use crate::identity::{check_special_matrices, IdentityCache};
use crate::node::{MatrixEdge, MatrixNodeRef, VectorEdge, VectorNodeRef};
use crate::normalize::{normalize_matrix, normalize_vector};
use crate::radix::RadixTable;
use crate::scalar::ScalarStore;
use crate::unique_table::{MatrixUniqueTable, VectorUniqueTable};

pub(crate) type VectorBinaryKey = BinaryKey<Option<VectorNodeRef>, Option<VectorNodeRef>>;
pub(crate) type MatrixBinaryKey = BinaryKey<Option<MatrixNodeRef>, Option<MatrixNodeRef>>;
pub(crate) type MatrixVectorKey = BinaryKey<Option<MatrixNodeRef>, Option<VectorNodeRef>>;

/// A single register-level control: a gate applies only when that register
/// reads `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub register: usize,
    pub level: usize,
}

/// Owns the mutable state for one independent MDD computation: the radix
/// layout, the scalar store, both unique tables, every compute table, and
/// the identity cache. Operations never share state across instances.
pub struct Package {
    pub(crate) radix: RadixTable,
    pub(crate) scalars: ScalarStore,
    pub(crate) vectors: VectorUniqueTable,
    pub(crate) matrices: MatrixUniqueTable,
    pub(crate) identity_cache: IdentityCache,

    pub(crate) vector_add_cache: ComputeTable<crate::ops::add::VectorAddKey, CachedValue<VectorNodeRef>>,
    pub(crate) matrix_add_cache: ComputeTable<crate::ops::add::MatrixAddKey, CachedValue<MatrixNodeRef>>,
    pub(crate) matrix_matrix_mul_cache: ComputeTable<MatrixBinaryKey, CachedValue<MatrixNodeRef>>,
    pub(crate) matrix_vector_mul_cache: ComputeTable<MatrixVectorKey, CachedValue<VectorNodeRef>>,
    pub(crate) vector_kronecker_cache: ComputeTable<crate::ops::kronecker::VectorKroneckerKey, CachedValue<VectorNodeRef>>,
    pub(crate) matrix_kronecker_cache: ComputeTable<crate::ops::kronecker::MatrixKroneckerKey, CachedValue<MatrixNodeRef>>,
    pub(crate) vector_inner_product_cache: ComputeTable<VectorBinaryKey, CachedValue<VectorNodeRef>>,
    pub(crate) transpose_cache: ComputeTable<Option<MatrixNodeRef>, CachedValue<MatrixNodeRef>>,
    pub(crate) conjugate_transpose_cache: ComputeTable<Option<MatrixNodeRef>, CachedValue<MatrixNodeRef>>,

    config: PackageConfig,
}

impl Package {
    pub fn new(radix: RadixTable, config: PackageConfig) -> Self {
        Self {
            radix,
            scalars: ScalarStore::new(config.tolerance),
            vectors: VectorUniqueTable::new(),
            matrices: MatrixUniqueTable::new(),
            identity_cache: IdentityCache::new(),
            vector_add_cache: ComputeTable::new(config.compute_table_size),
            matrix_add_cache: ComputeTable::new(config.compute_table_size),
            matrix_matrix_mul_cache: ComputeTable::new(config.compute_table_size),
            matrix_vector_mul_cache: ComputeTable::new(config.compute_table_size),
            vector_kronecker_cache: ComputeTable::new(config.kronecker_table_size),
            matrix_kronecker_cache: ComputeTable::new(config.kronecker_table_size),
            vector_inner_product_cache: ComputeTable::new(config.compute_table_size),
            transpose_cache: ComputeTable::new(config.kronecker_table_size),
            conjugate_transpose_cache: ComputeTable::new(config.kronecker_table_size),
            config,
        }
    }

    pub fn with_uniform_radix(n_registers: usize, radix: u8, config: PackageConfig) -> Result<Self> {
        Ok(Self::new(RadixTable::uniform(n_registers, radix)?, config))
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    pub fn radix(&self) -> &RadixTable {
        &self.radix
    }

    /// Number of live entries (canonical and scratch) in the scalar store.
    /// Exposed for tests that check a computation leaves no orphaned
    /// scratch or canonical entries behind after a [`Package::garbage_collect`]
    /// sweep.
    pub fn scalar_live_count(&self) -> usize {
        self.scalars.live_count()
    }

    fn check_range(&self, n: usize, start: usize) -> Result<()> {
        if start + n > self.radix.register_count() {
            return Err(QmddError::OutOfRange(format!(
                "requested {} registers starting at {}, but package supports {}",
                n,
                start,
                self.radix.register_count()
            )));
        }
        Ok(())
    }

    /// Builds a normalized, canonicalized vector node at `var` from `children`
    /// and returns the edge that should point at it. Implements the
    /// `makeDDNode` pipeline: allocate, validate fan-in variable indices,
    /// normalize, canonicalize, done (vector nodes have no special-matrix
    /// bookkeeping).
    pub(crate) fn make_vector_node(
        &mut self,
        var: i32,
        children: Vec<VectorEdge>,
        cached: bool,
    ) -> VectorEdge {
        debug_assert!(children
            .iter()
            .all(|e| e.is_terminal() || self.vectors.node(e.node.unwrap()).var == var - 1));

        let node = self.vectors.get_node(var, children);
        let mut cn = crate::complex::ComplexNumbers::new(&mut self.scalars);
        let normalized = normalize_vector(&mut self.vectors, &mut cn, node, cached);
        match normalized.node {
            None => normalized,
            Some(n) => {
                let canonical = self.vectors.lookup(n);
                VectorEdge {
                    node: Some(canonical),
                    weight: normalized.weight,
                }
            }
        }
    }

    /// Matrix counterpart of [`Package::make_vector_node`]; additionally
    /// runs [`check_special_matrices`] the first time a node is actually
    /// inserted (not when `lookup` recycles it into an existing one).
    pub(crate) fn make_matrix_node(
        &mut self,
        var: i32,
        children: Vec<MatrixEdge>,
        cached: bool,
    ) -> MatrixEdge {
        debug_assert!(children
            .iter()
            .all(|e| e.is_terminal() || self.matrices.node(e.node.unwrap()).var == var - 1));

        let node = self.matrices.get_node(var, children);
        let mut cn = crate::complex::ComplexNumbers::new(&mut self.scalars);
        let normalized = normalize_matrix(&mut self.matrices, &mut cn, node, cached);
        match normalized.node {
            None => normalized,
            Some(n) => {
                let canonical = self.matrices.lookup(n);
                if canonical == n {
                    check_special_matrices(&mut self.matrices, &self.radix, canonical, |table, edge| {
                        crate::ops::transpose::transpose_raw(table, edge)
                    });
                }
                MatrixEdge {
                    node: Some(canonical),
                    weight: normalized.weight,
                }
            }
        }
    }

    /// `|0…0⟩` over `n` registers starting at `start`.
    pub fn make_zero_state(&mut self, n: usize, start: usize) -> Result<VectorEdge> {
        self.check_range(n, start)?;
        let mut first = VectorEdge::ONE;
        for level in start..start + n {
            let d = self.radix.radix(level) as usize;
            let mut children = vec![VectorEdge::ZERO; d];
            children[0] = first;
            first = self.make_vector_node(level as i32, children, false);
        }
        Ok(first)
    }

    /// Computational basis state `|digits⟩` over `n` registers starting at
    /// `start`; `digits[i] ∈ [0, d_{start+i})`.
    pub fn make_basis_state(&mut self, n: usize, digits: &[usize], start: usize) -> Result<VectorEdge> {
        self.check_range(n, start)?;
        let mut f = VectorEdge::ONE;
        for (i, level) in (start..start + n).enumerate() {
            let d = self.radix.radix(level) as usize;
            let digit = digits[i];
            if digit >= d {
                return Err(QmddError::InvalidArgument(format!(
                    "digit {digit} out of range for register {level} (radix {d})"
                )));
            }
            let mut children = vec![VectorEdge::ZERO; d];
            children[digit] = f;
            f = self.make_vector_node(level as i32, children, false);
        }
        Ok(f)
    }

    /// Lifts a dense `d×d` gate matrix (row-major, `d = radix(target)`) onto
    /// `target`, controlled by `controls`, with identity on every other wire
    /// in `[start, start+n)`.
    ///
    /// Variable index tracks absolute register number and a node's children
    /// always sit one level below its own variable, so a control *above*
    /// `target` (higher absolute index) can gate the already-built target
    /// subtree directly. A control *below* `target` can't — by the time its
    /// own node is reached the target branch is already fixed above it — so
    /// each nonzero entry of `matrix` instead carries its own below-target
    /// chain, diverging to that entry's value on a control match and to the
    /// identity matrix's corresponding entry otherwise.
    pub fn make_gate_dd(
        &mut self,
        matrix: &[num_complex::Complex64],
        n: usize,
        controls: &[Control],
        target: usize,
        start: usize,
    ) -> Result<MatrixEdge> {
        self.check_range(n, start)?;
        for c in controls {
            if c.register == target {
                return Err(QmddError::InvalidArgument(
                    "a control cannot name the target register".into(),
                ));
            }
        }

        let d = self.radix.radix(target) as usize;
        if matrix.len() != d * d {
            return Err(QmddError::InvalidArgument(format!(
                "gate matrix has {} entries, expected {}x{} for radix {d}",
                matrix.len(),
                d,
                d
            )));
        }

        // identity_below[k] = identity over [start, start+k], used as the
        // "control didn't match" fallback for a below-target control at
        // relative position k.
        let mut identity_below: Vec<MatrixEdge> = Vec::new();
        if target > start {
            let mut e = self.stack_identity_level(MatrixEdge::ONE, start);
            identity_below.push(e);
            for lvl in (start + 1)..target {
                e = self.stack_identity_level(e, lvl);
                identity_below.push(e);
            }
        }

        let has_below_control = controls.iter().any(|c| c.register < target);

        let mut edges = vec![MatrixEdge::ZERO; d * d];
        for (i, v) in matrix.iter().enumerate() {
            let is_diag = i / d == i % d;
            let is_zero = v.re == 0.0 && v.im == 0.0;
            // A zero, off-diagonal entry of `matrix` can never gain a
            // nonzero value from a mismatched control (identity is zero
            // there too). A zero *diagonal* entry still needs walking
            // whenever some control below `target` can fall through to
            // identity, which is 1 there.
            if is_zero && !(is_diag && has_below_control) {
                continue;
            }
            let weight = {
                let mut cn = crate::complex::ComplexNumbers::new(&mut self.scalars);
                cn.lookup_values(v.re, v.im)
            };
            let mut cur = MatrixEdge { node: None, weight };
            for (idx, level) in (start..target).enumerate() {
                let d_here = self.radix.radix(level) as usize;
                let control_level = controls.iter().find(|c| c.register == level).map(|c| c.level);
                let mut children = vec![MatrixEdge::ZERO; d_here * d_here];
                match control_level {
                    None => {
                        for k in 0..d_here {
                            children[k * d_here + k] = cur;
                        }
                    }
                    Some(lvl) => {
                        let mismatch = match (is_diag, idx) {
                            (false, _) => MatrixEdge::ZERO,
                            (true, 0) => MatrixEdge::ONE,
                            (true, _) => identity_below[idx - 1],
                        };
                        for k in 0..d_here {
                            children[k * d_here + k] = if k == lvl { cur } else { mismatch };
                        }
                    }
                }
                cur = self.make_matrix_node(level as i32, children, false);
            }
            edges[i] = cur;
        }
        let mut current = self.make_matrix_node(target as i32, edges, false);

        for level in target + 1..start + n {
            let d_here = self.radix.radix(level) as usize;
            let control_level = controls.iter().find(|c| c.register == level).map(|c| c.level);
            let mut children = vec![MatrixEdge::ZERO; d_here * d_here];
            for i in 0..d_here {
                children[i * d_here + i] = match control_level {
                    Some(lvl) if lvl == i => current,
                    Some(_) => self.make_identity_single_level(level)?,
                    None => current,
                };
            }
            current = self.make_matrix_node(level as i32, children, false);
        }
        Ok(current)
    }

    fn make_identity_single_level(&mut self, level: usize) -> Result<MatrixEdge> {
        Ok(self.stack_identity_level(MatrixEdge::ONE, level))
    }

    /// `makeIdentity(n)`: identity over registers `[0, n)`.
    pub fn make_identity(&mut self, n: usize) -> Result<MatrixEdge> {
        if n == 0 {
            return Ok(MatrixEdge::ONE);
        }
        self.make_identity_range(0, n - 1)
    }

    fn stack_identity_level(&mut self, below: MatrixEdge, level: usize) -> MatrixEdge {
        let d = self.radix.radix(level) as usize;
        let mut children = vec![MatrixEdge::ZERO; d * d];
        for i in 0..d {
            children[i * d + i] = below;
        }
        self.make_matrix_node(level as i32, children, false)
    }

    /// `makeIdentity(low, high)`: identity over registers `[low, high]`.
    /// For `low == 0`, extends the largest cached prefix below `high`
    /// rather than rebuilding from scratch, memoizing every new level
    /// reached along the way.
    pub fn make_identity_range(&mut self, low: usize, high: usize) -> Result<MatrixEdge> {
        if high < low {
            return Ok(MatrixEdge::ONE);
        }

        if low == 0 {
            if let Some(e) = self.identity_cache.get(high) {
                return Ok(e);
            }
            let (mut level, mut e) = match self.identity_cache.cached_prefix_top() {
                Some(top) if top < high => (top + 1, self.identity_cache.get(top).unwrap()),
                _ => (0, self.stack_identity_level(MatrixEdge::ONE, 0)),
            };
            if level == 0 {
                self.identity_cache.set(0, e);
                level = 1;
            }
            for lvl in level..=high {
                e = self.stack_identity_level(e, lvl);
                self.identity_cache.set(lvl, e);
            }
            return Ok(e);
        }

        let mut e = self.stack_identity_level(MatrixEdge::ONE, low);
        for lvl in (low + 1)..=high {
            e = self.stack_identity_level(e, lvl);
        }
        Ok(e)
    }

    /// `I_high ⊗ e ⊗ I_low`: pads a matrix DD with identity ladders above
    /// and below its current register range.
    pub fn extend(&mut self, e: MatrixEdge, high: usize, low: usize) -> Result<MatrixEdge> {
        let mut result = e;
        if low > 0 {
            let low_id = self.make_identity(low)?;
            result = crate::ops::kronecker::kronecker_matrix(self, result, low_id, true)?;
        }
        if high > 0 {
            let high_id = self.make_identity(high)?;
            result = crate::ops::kronecker::kronecker_matrix(self, high_id, result, true)?;
        }
        Ok(result)
    }

    /// Dense amplitude vector, row-major over the register digit tuples in
    /// ascending order.
    pub fn get_vector(&mut self, e: VectorEdge) -> Vec<num_complex::Complex64> {
        let mut out = Vec::new();
        self.collect_vector(e, num_complex::Complex64::new(1.0, 0.0), &mut out);
        out
    }

    fn collect_vector(&mut self, e: VectorEdge, acc: num_complex::Complex64, out: &mut Vec<num_complex::Complex64>) {
        let w = self.weight_as_complex(e.weight);
        let acc = acc * w;
        match e.node {
            None => out.push(acc),
            Some(n) => {
                let children: Vec<VectorEdge> = self.vectors.node(n).children.clone();
                for child in children {
                    self.collect_vector(child, acc, out);
                }
            }
        }
    }

    /// Dense matrix, flattened row-major with the outermost register as the
    /// slowest-varying row/column pair.
    pub fn get_vectorized_matrix(&mut self, e: MatrixEdge) -> Vec<num_complex::Complex64> {
        let mut out = Vec::new();
        self.collect_matrix(e, num_complex::Complex64::new(1.0, 0.0), &mut out);
        out
    }

    fn collect_matrix(&mut self, e: MatrixEdge, acc: num_complex::Complex64, out: &mut Vec<num_complex::Complex64>) {
        let w = self.weight_as_complex(e.weight);
        let acc = acc * w;
        match e.node {
            None => out.push(acc),
            Some(n) => {
                let children: Vec<MatrixEdge> = self.matrices.node(n).children.clone();
                for child in children {
                    self.collect_matrix(child, acc, out);
                }
            }
        }
    }

    /// The amplitude at the basis path given by `path` (one digit per
    /// register, most significant register first).
    pub fn get_value_by_path(&mut self, e: VectorEdge, path: &[usize]) -> num_complex::Complex64 {
        let mut acc = self.weight_as_complex(e.weight);
        let mut cur = e.node;
        for &digit in path {
            let Some(n) = cur else { break };
            let child = self.vectors.node(n).children[digit];
            acc *= self.weight_as_complex(child.weight);
            cur = child.node;
        }
        acc
    }

    fn weight_as_complex(&self, w: crate::complex::ComplexHandle) -> num_complex::Complex64 {
        num_complex::Complex64::new(self.scalars.val(w.real), self.scalars.val(w.imag))
    }

    /// Sweeps every unique table for refcount-`0` nodes, the scalar store
    /// for refcount-`0` entries, and unconditionally invalidates every
    /// compute table (their stored node pointers may no longer resolve to
    /// anything). Returns the total number of freed entries.
    pub fn garbage_collect(&mut self, force: bool) -> usize {
        crate::gc::sweep(self, force)
    }

    pub fn inc_ref_vector(&mut self, e: VectorEdge) {
        crate::gc::inc_ref_vector(self, e)
    }

    pub fn dec_ref_vector(&mut self, e: VectorEdge) {
        crate::gc::dec_ref_vector(self, e)
    }

    pub fn inc_ref_matrix(&mut self, e: MatrixEdge) {
        crate::gc::inc_ref_matrix(self, e)
    }

    pub fn dec_ref_matrix(&mut self, e: MatrixEdge) {
        crate::gc::dec_ref_matrix(self, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_state_is_all_zero_but_leading_amplitude() {
        let mut pkg = Package::with_uniform_radix(2, 2, PackageConfig::default()).unwrap();
        let e = pkg.make_zero_state(2, 0).unwrap();
        let v = pkg.get_vector(e);
        assert_eq!(v.len(), 4);
        assert_eq!(v[0], num_complex::Complex64::new(1.0, 0.0));
        for amp in &v[1..] {
            assert_eq!(*amp, num_complex::Complex64::new(0.0, 0.0));
        }
    }

    #[test]
    fn basis_state_places_single_one() {
        let mut pkg = Package::with_uniform_radix(2, 3, PackageConfig::default()).unwrap();
        let e = pkg.make_basis_state(2, &[1, 2], 0).unwrap();
        let v = pkg.get_vector(e);
        assert_eq!(v.len(), 9);
        assert_eq!(v[1 * 3 + 2], num_complex::Complex64::new(1.0, 0.0));
    }

    #[test]
    fn identity_acts_as_identity_on_vector() {
        let mut pkg = Package::with_uniform_radix(1, 2, PackageConfig::default()).unwrap();
        let id = pkg.make_identity(1).unwrap();
        let v = pkg.get_vectorized_matrix(id);
        assert_eq!(v, vec![
            num_complex::Complex64::new(1.0, 0.0),
            num_complex::Complex64::new(0.0, 0.0),
            num_complex::Complex64::new(0.0, 0.0),
            num_complex::Complex64::new(1.0, 0.0),
        ]);
    }
}
