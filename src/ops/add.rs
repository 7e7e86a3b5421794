//! Memoized DD addition.
//!
//! Unlike `multiply`/`kronecker`/`inner_product`, addition is not
//! homogeneous in either operand's weight alone (`add(aX, bY) ≠ a ·
//! add(X, Y)` for `a ≠ b`), so its compute table cannot factor weights down
//! to `One` the way the others do — the real source's own `vectorAdd`
//! table is keyed by `vCachedEdge` (node *and* weight), not by a bare node
//! pair. This module follows that: the key quantizes each operand's weight
//! to the tolerance grid and folds it in alongside the node reference.

use crate::complex::ComplexHandle;
use crate::compute::{BinaryKey, CachedValue};
use crate::node::{MatrixEdge, MatrixNodeRef, VectorEdge, VectorNodeRef};
use crate::package::Package;

type WeightedVectorKey = (Option<VectorNodeRef>, i64, i64);
type WeightedMatrixKey = (Option<MatrixNodeRef>, i64, i64);
pub(crate) type VectorAddKey = BinaryKey<WeightedVectorKey, WeightedVectorKey>;
pub(crate) type MatrixAddKey = BinaryKey<WeightedMatrixKey, WeightedMatrixKey>;

pub(crate) fn quantize(pkg: &Package, w: ComplexHandle) -> (i64, i64) {
    let tol = pkg.scalars.tolerance();
    let q = |v: f64| (v / tol).round() as i64;
    (q(pkg.scalars.val(w.real)), q(pkg.scalars.val(w.imag)))
}

fn scale_vector(pkg: &mut Package, edge: VectorEdge, factor: ComplexHandle) -> VectorEdge {
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let w = cn.get_temporary();
    cn.mul(w, edge.weight, factor);
    VectorEdge { node: edge.node, weight: w }
}

fn scale_matrix(pkg: &mut Package, edge: MatrixEdge, factor: ComplexHandle) -> MatrixEdge {
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let w = cn.get_temporary();
    cn.mul(w, edge.weight, factor);
    MatrixEdge { node: edge.node, weight: w }
}

fn node_var_vector(pkg: &Package, e: VectorEdge) -> i32 {
    e.node.map(|n| pkg.vectors.node(n).var).unwrap_or(-1)
}

fn node_var_matrix(pkg: &Package, e: MatrixEdge) -> i32 {
    e.node.map(|n| pkg.matrices.node(n).var).unwrap_or(-1)
}

/// Returns `z` such that the amplitude at any basis path through `z` is the
/// sum of the amplitudes at that path through `x` and `y`.
pub fn add_vector(pkg: &mut Package, x: VectorEdge, y: VectorEdge) -> VectorEdge {
    if x.weight.is_exactly_zero() {
        return scale_vector(pkg, y, ComplexHandle::ONE);
    }
    if y.weight.is_exactly_zero() {
        return scale_vector(pkg, x, ComplexHandle::ONE);
    }
    if x.node == y.node {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let sum = cn.get_temporary();
        cn.add(sum, x.weight, y.weight);
        return if cn.approx_zero(sum) {
            VectorEdge::ZERO
        } else {
            VectorEdge { node: x.node, weight: sum }
        };
    }

    let qx = quantize(pkg, x.weight);
    let qy = quantize(pkg, y.weight);
    let key = BinaryKey::new((x.node, qx.0, qx.1), (y.node, qy.0, qy.1));
    if let Some(cached) = pkg.vector_add_cache.lookup(key) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let (node, weight) = cached.materialize(&mut cn);
        return VectorEdge { node, weight };
    }

    let v = node_var_vector(pkg, x).max(node_var_vector(pkg, y));
    let d = pkg.radix.radix(v as usize) as usize;

    let mut children = Vec::with_capacity(d);
    for i in 0..d {
        let e1 = if node_var_vector(pkg, x) == v {
            let n = x.node.unwrap();
            let c = pkg.vectors.node(n).children[i];
            scale_vector(pkg, c, x.weight)
        } else {
            x
        };
        let e2 = if node_var_vector(pkg, y) == v {
            let n = y.node.unwrap();
            let c = pkg.vectors.node(n).children[i];
            scale_vector(pkg, c, y.weight)
        } else {
            y
        };
        children.push(add_vector(pkg, e1, e2));
    }

    let result = pkg.make_vector_node(v, children, true);
    let cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let cached_value = CachedValue::new(result.node, result.weight, &cn);
    pkg.vector_add_cache.insert(key, cached_value);
    result
}

/// Matrix counterpart of [`add_vector`].
pub fn add_matrix(pkg: &mut Package, x: MatrixEdge, y: MatrixEdge) -> MatrixEdge {
    if x.weight.is_exactly_zero() {
        return scale_matrix(pkg, y, ComplexHandle::ONE);
    }
    if y.weight.is_exactly_zero() {
        return scale_matrix(pkg, x, ComplexHandle::ONE);
    }
    if x.node == y.node {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let sum = cn.get_temporary();
        cn.add(sum, x.weight, y.weight);
        return if cn.approx_zero(sum) {
            MatrixEdge::ZERO
        } else {
            MatrixEdge { node: x.node, weight: sum }
        };
    }

    let qx = quantize(pkg, x.weight);
    let qy = quantize(pkg, y.weight);
    let key = BinaryKey::new((x.node, qx.0, qx.1), (y.node, qy.0, qy.1));
    if let Some(cached) = pkg.matrix_add_cache.lookup(key) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let (node, weight) = cached.materialize(&mut cn);
        return MatrixEdge { node, weight };
    }

    let v = node_var_matrix(pkg, x).max(node_var_matrix(pkg, y));
    let d = pkg.radix.radix(v as usize) as usize;

    let mut children = Vec::with_capacity(d * d);
    for i in 0..d * d {
        let e1 = if node_var_matrix(pkg, x) == v {
            let n = x.node.unwrap();
            let c = pkg.matrices.node(n).children[i];
            scale_matrix(pkg, c, x.weight)
        } else {
            x
        };
        let e2 = if node_var_matrix(pkg, y) == v {
            let n = y.node.unwrap();
            let c = pkg.matrices.node(n).children[i];
            scale_matrix(pkg, c, y.weight)
        } else {
            y
        };
        children.push(add_matrix(pkg, e1, e2));
    }

    let result = pkg.make_matrix_node(v, children, true);
    let cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let cached_value = CachedValue::new(result.node, result.weight, &cn);
    pkg.matrix_add_cache.insert(key, cached_value);
    result
}
