//! Memoized matrix·matrix and matrix·vector multiplication.

use crate::complex::ComplexHandle;
use crate::compute::{BinaryKey, CachedValue};
use crate::node::{MatrixEdge, VectorEdge, VectorNodeRef};
use crate::package::{MatrixBinaryKey, MatrixVectorKey, Package};

use super::add::{add_matrix, add_vector};

fn matrix_var(pkg: &Package, e: MatrixEdge) -> i32 {
    e.node.map(|n| pkg.matrices.node(n).var).unwrap_or(-1)
}

fn vector_var(pkg: &Package, e: VectorEdge) -> i32 {
    e.node.map(|n| pkg.vectors.node(n).var).unwrap_or(-1)
}

fn is_identity_matrix(pkg: &Package, e: MatrixEdge) -> bool {
    e.node.map(|n| pkg.matrices.node(n).identity).unwrap_or(true)
}

fn factor_to_one(pkg: &mut Package, w: ComplexHandle) -> ComplexHandle {
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    cn.lookup(w)
}

/// `multiply2`: recurses from the joint top variable of `x` and `y` down to
/// `start - 1`, where it forms the terminal product of the two weights.
/// `x` is always the matrix operand; `y` may be a matrix or a vector,
/// selected by the caller's choice of recursion function.
pub fn multiply_matrix_matrix(pkg: &mut Package, x: MatrixEdge, y: MatrixEdge, start: i32) -> MatrixEdge {
    if x.weight.is_exactly_zero() || y.weight.is_exactly_zero() {
        return MatrixEdge::ZERO;
    }
    let v = matrix_var(pkg, x).max(matrix_var(pkg, y));
    if v < start {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, x.weight, y.weight);
        return MatrixEdge { node: None, weight: w };
    }

    if is_identity_matrix(pkg, x) && is_identity_matrix(pkg, y) {
        let id = pkg.make_identity_range(start as usize, v as usize).unwrap_or(MatrixEdge::ONE);
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, x.weight, y.weight);
        return MatrixEdge { node: id.node, weight: w };
    }
    if is_identity_matrix(pkg, y) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, x.weight, y.weight);
        return MatrixEdge { node: x.node, weight: w };
    }
    if is_identity_matrix(pkg, x) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, x.weight, y.weight);
        return MatrixEdge { node: y.node, weight: w };
    }

    let xu = MatrixEdge { node: x.node, weight: factor_to_one(pkg, x.weight) };
    let yu = MatrixEdge { node: y.node, weight: factor_to_one(pkg, y.weight) };
    let key: MatrixBinaryKey = BinaryKey::new(xu.node, yu.node);
    if let Some(cached) = pkg.matrix_matrix_mul_cache.lookup(key) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let (node, w) = cached.materialize(&mut cn);
        let out = cn.get_temporary();
        let xy = cn.get_temporary();
        cn.mul(xy, x.weight, y.weight);
        cn.mul(out, w, xy);
        cn.return_to_cache(w);
        cn.return_to_cache(xy);
        return MatrixEdge { node, weight: out };
    }

    let d = pkg.radix.radix(v as usize) as usize;
    let mut children = vec![MatrixEdge::ZERO; d * d];
    for i in 0..d {
        for j in 0..d {
            let mut sum = MatrixEdge::ZERO;
            for k in 0..d {
                let xik = child_at(pkg, x, v, i * d + k);
                let ykj = child_at(pkg, y, v, k * d + j);
                let prod = multiply_matrix_matrix(pkg, xik, ykj, start);
                sum = add_matrix(pkg, sum, prod);
            }
            children[i * d + j] = sum;
        }
    }

    let result = pkg.make_matrix_node(v, children, true);
    let cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let cached_value = CachedValue::new(result.node, ComplexHandle::ONE, &cn);
    pkg.matrix_matrix_mul_cache.insert(key, cached_value);

    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let out = cn.get_temporary();
    let xy = cn.get_temporary();
    cn.mul(xy, x.weight, y.weight);
    cn.mul(out, result.weight, xy);
    cn.return_to_cache(xy);
    MatrixEdge { node: result.node, weight: cn.lookup(out) }
}

fn child_at(pkg: &Package, e: MatrixEdge, v: i32, idx: usize) -> MatrixEdge {
    if matrix_var(pkg, e) == v {
        pkg.matrices.node(e.node.unwrap()).children[idx]
    } else {
        e
    }
}

fn vector_child_at(pkg: &Package, e: VectorEdge, v: i32, idx: usize) -> VectorEdge {
    if vector_var(pkg, e) == v {
        pkg.vectors.node(e.node.unwrap()).children[idx]
    } else {
        e
    }
}

/// Matrix·vector multiplication.
pub fn multiply_matrix_vector(pkg: &mut Package, x: MatrixEdge, y: VectorEdge, start: i32) -> VectorEdge {
    if x.weight.is_exactly_zero() || y.weight.is_exactly_zero() {
        return VectorEdge::ZERO;
    }
    let v = matrix_var(pkg, x).max(vector_var(pkg, y));
    if v < start {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, x.weight, y.weight);
        return VectorEdge { node: None, weight: w };
    }

    if is_identity_matrix(pkg, x) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let w = cn.get_temporary();
        cn.mul(w, x.weight, y.weight);
        return VectorEdge { node: y.node, weight: w };
    }

    let xu = MatrixEdge { node: x.node, weight: factor_to_one(pkg, x.weight) };
    let yu = VectorEdge { node: y.node, weight: factor_to_one(pkg, y.weight) };
    let key: MatrixVectorKey = BinaryKey::new(xu.node, yu.node);
    if let Some(cached) = pkg.matrix_vector_mul_cache.lookup(key) {
        let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
        let (node, w) = cached.materialize(&mut cn);
        let out = cn.get_temporary();
        let xy = cn.get_temporary();
        cn.mul(xy, x.weight, y.weight);
        cn.mul(out, w, xy);
        cn.return_to_cache(w);
        cn.return_to_cache(xy);
        return VectorEdge { node, weight: out };
    }

    let d = pkg.radix.radix(v as usize) as usize;
    let mut children = vec![VectorEdge::ZERO; d];
    for i in 0..d {
        let mut sum = VectorEdge::ZERO;
        for k in 0..d {
            let xik = child_at(pkg, x, v, i * d + k);
            let yk = vector_child_at(pkg, y, v, k);
            let prod = multiply_matrix_vector(pkg, xik, yk, start);
            sum = add_vector(pkg, sum, prod);
        }
        children[i] = sum;
    }

    let result = pkg.make_vector_node(v, children, true);
    let cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let cached_value: CachedValue<VectorNodeRef> = CachedValue::new(result.node, ComplexHandle::ONE, &cn);
    pkg.matrix_vector_mul_cache.insert(key, cached_value);

    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    let out = cn.get_temporary();
    let xy = cn.get_temporary();
    cn.mul(xy, x.weight, y.weight);
    cn.mul(out, result.weight, xy);
    cn.return_to_cache(xy);
    VectorEdge { node: result.node, weight: cn.lookup(out) }
}

