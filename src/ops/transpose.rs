//! Structural and memoized transpose / conjugate-transpose of matrix DDs.

use crate::complex::ComplexNumbers;
use crate::node::MatrixEdge;
use crate::package::Package;
use crate::unique_table::MatrixUniqueTable;

fn block_size(children: usize) -> usize {
    (children as f64).sqrt().round() as usize
}

/// A plain structural transpose against a bare [`MatrixUniqueTable`], with no
/// weight rescaling and no memoization. Exists so [`crate::identity`]'s
/// special-matrix check can compare a node against its own transpose without
/// depending on [`Package`] (which in turn depends on `identity` for
/// `makeDDNode`'s bookkeeping) — a plain function avoids the cycle.
pub fn transpose_raw(table: &mut MatrixUniqueTable, edge: MatrixEdge) -> MatrixEdge {
    let Some(n) = edge.node else { return edge };
    let node = table.node(n).clone();
    let d = block_size(node.children.len());
    let mut children = vec![MatrixEdge::ZERO; d * d];
    for i in 0..d {
        for j in 0..d {
            children[j * d + i] = transpose_raw(table, node.children[i * d + j]);
        }
    }
    let fresh = table.get_node(node.var, children);
    let canonical = table.lookup(fresh);
    MatrixEdge { node: Some(canonical), weight: edge.weight }
}

/// `transpose(e)`: swaps children `[i·d+j] ↔ [j·d+i]` recursively and rebuilds
/// through `makeDDNode`, multiplying in the incoming edge weight. A
/// `symmetric`-flagged node is its own transpose, so the recursion stops
/// there without rebuilding anything.
///
/// Memoized in [`Package::transpose_cache`](crate::package::Package), keyed by
/// the bare node (weight factors out linearly: `transpose(w·X) = w ·
/// transpose(X)`).
pub fn transpose(pkg: &mut Package, e: MatrixEdge) -> MatrixEdge {
    let Some(n) = e.node else { return e };
    if pkg.matrices.node(n).symmetric {
        return e;
    }

    if let Some(cached) = pkg.transpose_cache.lookup(e.node) {
        let mut cn = ComplexNumbers::new(&mut pkg.scalars);
        let (node, w) = cached.materialize(&mut cn);
        let out = cn.get_temporary();
        cn.mul(out, w, e.weight);
        cn.return_to_cache(w);
        return MatrixEdge { node, weight: cn.lookup(out) };
    }

    let node = pkg.matrices.node(n).clone();
    let d = block_size(node.children.len());
    let mut children = vec![MatrixEdge::ZERO; d * d];
    for i in 0..d {
        for j in 0..d {
            children[j * d + i] = transpose(pkg, node.children[i * d + j]);
        }
    }
    let result = pkg.make_matrix_node(node.var, children, true);

    let cn = ComplexNumbers::new(&mut pkg.scalars);
    let cached_value = crate::compute::CachedValue::new(result.node, result.weight, &cn);
    pkg.transpose_cache.insert(e.node, cached_value);

    let mut cn = ComplexNumbers::new(&mut pkg.scalars);
    let out = cn.get_temporary();
    cn.mul(out, result.weight, e.weight);
    MatrixEdge { node: result.node, weight: cn.lookup(out) }
}

/// `conjugateTranspose(e)`: as [`transpose`], but every weight (including
/// the incoming edge weight) is conjugated along the way. No `symmetric`
/// short-circuit — a real-symmetric matrix is its own conjugate transpose,
/// but a complex-symmetric one is not, so the flag alone doesn't decide it.
pub fn conjugate_transpose(pkg: &mut Package, e: MatrixEdge) -> MatrixEdge {
    let Some(n) = e.node else {
        let cn = ComplexNumbers::new(&mut pkg.scalars);
        return MatrixEdge { node: None, weight: cn.conj(e.weight) };
    };

    if let Some(cached) = pkg.conjugate_transpose_cache.lookup(e.node) {
        let mut cn = ComplexNumbers::new(&mut pkg.scalars);
        let (node, w) = cached.materialize(&mut cn);
        let conj_ew = cn.conj(e.weight);
        let out = cn.get_temporary();
        cn.mul(out, w, conj_ew);
        cn.return_to_cache(w);
        cn.return_to_cache(conj_ew);
        return MatrixEdge { node, weight: cn.lookup(out) };
    }

    let node = pkg.matrices.node(n).clone();
    let d = block_size(node.children.len());
    let mut children = vec![MatrixEdge::ZERO; d * d];
    for i in 0..d {
        for j in 0..d {
            children[j * d + i] = conjugate_transpose(pkg, node.children[i * d + j]);
        }
    }
    let result = pkg.make_matrix_node(node.var, children, true);

    let cn = ComplexNumbers::new(&mut pkg.scalars);
    let cached_value = crate::compute::CachedValue::new(result.node, result.weight, &cn);
    pkg.conjugate_transpose_cache.insert(e.node, cached_value);

    let mut cn = ComplexNumbers::new(&mut pkg.scalars);
    let conj_ew = cn.conj(e.weight);
    let out = cn.get_temporary();
    cn.mul(out, result.weight, conj_ew);
    cn.return_to_cache(conj_ew);
    MatrixEdge { node: result.node, weight: cn.lookup(out) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageConfig;

    #[test]
    fn transpose_of_identity_is_identity() {
        let mut pkg = Package::with_uniform_radix(2, 2, PackageConfig::default()).unwrap();
        let id = pkg.make_identity(2).unwrap();
        let t = transpose(&mut pkg, id);
        assert_eq!(pkg.get_vectorized_matrix(t), pkg.get_vectorized_matrix(id));
    }

    #[test]
    fn conjugate_transpose_of_real_symmetric_matrix_is_itself() {
        let mut pkg = Package::with_uniform_radix(1, 2, PackageConfig::default()).unwrap();
        let id = pkg.make_identity(1).unwrap();
        let ct = conjugate_transpose(&mut pkg, id);
        assert_eq!(pkg.get_vectorized_matrix(ct), pkg.get_vectorized_matrix(id));
    }
}
