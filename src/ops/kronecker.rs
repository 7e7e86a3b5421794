//! Memoized Kronecker (tensor) product.
//!
//! Like `add`'s, this compute table's key is the full weighted edge pair
//! (weight quantized to the tolerance grid), not a weight-erased node pair:
//! the terminal base case multiplies the two operand weights directly
//! rather than factoring one out, so a node-only key would conflate
//! Kronecker products that differ only in scale.

use crate::compute::{BinaryKey, CachedValue};
use crate::error::Result;
use crate::node::{MatrixEdge, MatrixNodeRef, VectorEdge, VectorNodeRef};
use crate::package::Package;

use super::add::quantize;

type WeightedVectorKey = (Option<VectorNodeRef>, i64, i64);
type WeightedMatrixKey = (Option<MatrixNodeRef>, i64, i64);
pub(crate) type VectorKroneckerKey = BinaryKey<WeightedVectorKey, WeightedVectorKey>;
pub(crate) type MatrixKroneckerKey = BinaryKey<WeightedMatrixKey, WeightedMatrixKey>;

fn vector_var(pkg: &Package, e: VectorEdge) -> i32 {
    e.node.map(|n| pkg.vectors.node(n).var).unwrap_or(-1)
}
fn matrix_var(pkg: &Package, e: MatrixEdge) -> i32 {
    e.node.map(|n| pkg.matrices.node(n).var).unwrap_or(-1)
}

/// `kronecker(x, y)`: `x`'s basis paths become the "outer" index, `y`'s the
/// "inner" one. If `inc_idx`, `x`'s level indices are re-based above `y`'s
/// top variable so the combined DD spans disjoint registers.
pub fn kronecker_vector(pkg: &mut Package, x: VectorEdge, y: VectorEdge, inc_idx: bool) -> Result<VectorEdge> {
    let e = kronecker2_vector(pkg, x, y, inc_idx)?;
    if e.weight.is_exactly_zero() || e.weight.is_exactly_one() {
        return Ok(e);
    }
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let canonical = cn.lookup(e.weight);
    cn.return_to_cache(e.weight);
    Ok(VectorEdge { node: e.node, weight: canonical })
}

fn kronecker2_vector(pkg: &mut Package, x: VectorEdge, y: VectorEdge, inc_idx: bool) -> Result<VectorEdge> {
    if x.weight.is_exactly_zero() || y.weight.is_exactly_zero() {
        return Ok(VectorEdge::ZERO);
    }
    if x.is_terminal() {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, x.weight, y.weight);
        return Ok(VectorEdge { node: y.node, weight: w });
    }

    let qx = quantize(pkg, x.weight);
    let qy = quantize(pkg, y.weight);
    let key = BinaryKey::new((x.node, qx.0, qx.1), (y.node, qy.0, qy.1));
    if let Some(cached) = pkg.vector_kronecker_cache.lookup(key) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let (node, weight) = cached.materialize(&mut cn);
        if weight.is_exactly_zero() {
            return Ok(VectorEdge::ZERO);
        }
        return Ok(VectorEdge { node, weight });
    }

    let x_node = x.node.unwrap();
    let xv = vector_var(pkg, x);
    let d_x = pkg.radix.radix(xv as usize) as usize;

    let mut edges = vec![VectorEdge::ZERO; d_x];
    let children: Vec<VectorEdge> = pkg.vectors.node(x_node).children.clone();
    for (i, child) in children.into_iter().enumerate() {
        edges[i] = kronecker2_vector(pkg, child, y, inc_idx)?;
    }
    let yv = vector_var(pkg, y);
    let idx = if inc_idx { yv + xv + 1 } else { xv };
    let mut result = pkg.make_vector_node(idx, edges, true);
    {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, result.weight, x.weight);
        result.weight = w;
    }

    let cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let cached_value = CachedValue::new(result.node, result.weight, &cn);
    pkg.vector_kronecker_cache.insert(key, cached_value);
    Ok(result)
}

pub fn kronecker_matrix(pkg: &mut Package, x: MatrixEdge, y: MatrixEdge, inc_idx: bool) -> Result<MatrixEdge> {
    let e = kronecker2_matrix(pkg, x, y, inc_idx)?;
    if e.weight.is_exactly_zero() || e.weight.is_exactly_one() {
        return Ok(e);
    }
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let canonical = cn.lookup(e.weight);
    cn.return_to_cache(e.weight);
    Ok(MatrixEdge { node: e.node, weight: canonical })
}

fn lift_diagonal(pkg: &mut Package, y: MatrixEdge, levels: std::ops::RangeInclusive<i32>, inc_idx: bool) -> MatrixEdge {
    let mut e = y;
    for lvl in levels {
        let d = pkg.radix.radix(lvl as usize) as usize;
        let mut children = vec![MatrixEdge::ZERO; d * d];
        for i in 0..d {
            children[i * d + i] = e;
        }
        let ev = matrix_var(pkg, e);
        let idx = if inc_idx { ev + 1 } else { ev };
        let _ = lvl;
        e = pkg.make_matrix_node(idx, children, false);
    }
    e
}

fn kronecker2_matrix(pkg: &mut Package, x: MatrixEdge, y: MatrixEdge, inc_idx: bool) -> Result<MatrixEdge> {
    if x.weight.is_exactly_zero() || y.weight.is_exactly_zero() {
        return Ok(MatrixEdge::ZERO);
    }
    if x.is_terminal() {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, x.weight, y.weight);
        return Ok(MatrixEdge { node: y.node, weight: w });
    }

    let qx = quantize(pkg, x.weight);
    let qy = quantize(pkg, y.weight);
    let key = BinaryKey::new((x.node, qx.0, qx.1), (y.node, qy.0, qy.1));
    if let Some(cached) = pkg.matrix_kronecker_cache.lookup(key) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let (node, weight) = cached.materialize(&mut cn);
        if weight.is_exactly_zero() {
            return Ok(MatrixEdge::ZERO);
        }
        return Ok(MatrixEdge { node, weight });
    }

    let x_node = x.node.unwrap();
    let xv = matrix_var(pkg, x);

    let result = if pkg.matrices.node(x_node).identity {
        let yv = matrix_var(pkg, y);
        let base = lift_diagonal(pkg, y, (yv + 1)..=(yv + 1), inc_idx);
        let e = lift_diagonal(pkg, base, (yv + 2)..=(yv + xv + 1), inc_idx);
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        let yr = cn.scalars.val(y.weight.real);
        let yi = cn.scalars.val(y.weight.imag);
        cn.scalars.set_temporary(w.real, yr);
        cn.scalars.set_temporary(w.imag, yi);
        MatrixEdge { node: e.node, weight: w }
    } else {
        let d = pkg.radix.radix(xv as usize) as usize;
        let mut edges = vec![MatrixEdge::ZERO; d * d];
        let children: Vec<MatrixEdge> = pkg.matrices.node(x_node).children.clone();
        for (i, child) in children.into_iter().enumerate() {
            edges[i] = kronecker2_matrix(pkg, child, y, inc_idx)?;
        }
        let yv = matrix_var(pkg, y);
        let idx = if inc_idx { yv + xv + 1 } else { xv };
        let mut e = pkg.make_matrix_node(idx, edges, true);
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, e.weight, x.weight);
        e.weight = w;
        e
    };

    let cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let cached_value = CachedValue::new(result.node, result.weight, &cn);
    pkg.matrix_kronecker_cache.insert(key, cached_value);
    Ok(result)
}

