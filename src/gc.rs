//! Reference counting and garbage collection.
//!
//! Reclaims only what refcounting has already marked as dead. External code
//! (and internal compute-table entries) hold `VectorNodeRef`/`MatrixNodeRef`
//! handles that must stay valid for every node that survives a collection,
//! so this sweep removes dead slots in place rather than rebuilding the
//! arena and remapping every surviving reference.
//!
//! `incRef`/`decRef` recurse into children only on the `0 → 1` / `1 → 0`
//! refcount transition: a node's children only need visiting when the node
//! itself is newly kept alive or newly eligible for collection.

use crate::node::{MatrixEdge, VectorEdge};
use crate::package::Package;

/// Sweeps every unique table for refcount-`0` nodes, the scalar store for
/// refcount-`0` entries, and unconditionally invalidates every compute
/// table. Returns the total number of entries freed.
pub fn sweep(pkg: &mut Package, force: bool) -> usize {
    let freed_vectors = pkg.vectors.garbage_collect();
    let freed_matrices = pkg.matrices.garbage_collect();
    let freed_scalars = pkg.scalars.garbage_collect(force);

    pkg.vector_add_cache.clear();
    pkg.matrix_add_cache.clear();
    pkg.matrix_matrix_mul_cache.clear();
    pkg.matrix_vector_mul_cache.clear();
    pkg.vector_kronecker_cache.clear();
    pkg.matrix_kronecker_cache.clear();
    pkg.vector_inner_product_cache.clear();
    pkg.transpose_cache.clear();
    pkg.conjugate_transpose_cache.clear();

    tracing::debug!(freed_vectors, freed_matrices, freed_scalars, "garbage collected");
    freed_vectors + freed_matrices + freed_scalars
}

/// Recursively increments a vector edge's refcount: the weight always, and
/// the node (plus, on the `0 → 1` transition, every child edge) if present.
pub fn inc_ref_vector(pkg: &mut Package, e: VectorEdge) {
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    cn.inc_ref(e.weight);
    if let Some(n) = e.node {
        if pkg.vectors.inc_ref(n) {
            let children: Vec<VectorEdge> = pkg.vectors.node(n).children.clone();
            for child in children {
                inc_ref_vector(pkg, child);
            }
        }
    }
}

/// Recursively decrements a vector edge's refcount, recursing into children
/// only on the `1 → 0` transition.
pub fn dec_ref_vector(pkg: &mut Package, e: VectorEdge) {
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    cn.dec_ref(e.weight);
    if let Some(n) = e.node {
        if pkg.vectors.dec_ref(n) {
            let children: Vec<VectorEdge> = pkg.vectors.node(n).children.clone();
            for child in children {
                dec_ref_vector(pkg, child);
            }
        }
    }
}

pub fn inc_ref_matrix(pkg: &mut Package, e: MatrixEdge) {
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    cn.inc_ref(e.weight);
    if let Some(n) = e.node {
        if pkg.matrices.inc_ref(n) {
            let children: Vec<MatrixEdge> = pkg.matrices.node(n).children.clone();
            for child in children {
                inc_ref_matrix(pkg, child);
            }
        }
    }
}

pub fn dec_ref_matrix(pkg: &mut Package, e: MatrixEdge) {
    let mut cn = crate::complex::ComplexNumbers::new(&mut pkg.scalars);
    cn.dec_ref(e.weight);
    if let Some(n) = e.node {
        if pkg.matrices.dec_ref(n) {
            let children: Vec<MatrixEdge> = pkg.matrices.node(n).children.clone();
            for child in children {
                dec_ref_matrix(pkg, child);
            }
        }
    }
}
