//! The identity ladder cache and the special-matrix recognizer that feeds
//! it (`symmetric` / `identity` node flags, checked once per freshly
//! inserted matrix node rather than on every query).

use crate::complex::ComplexHandle;
use crate::node::{MatrixEdge, MatrixNode, MatrixNodeRef};
use crate::radix::RadixTable;
use crate::unique_table::MatrixUniqueTable;

/// Caches `makeIdentity(0, high)` results, indexed by `high`. A request for
/// a range beyond the cache extends the largest cached prefix and memoizes
/// every new level it builds along the way; see
/// [`Package::make_identity`](crate::package::Package::make_identity).
#[derive(Default)]
pub struct IdentityCache {
    entries: Vec<Option<MatrixEdge>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn get(&self, high: usize) -> Option<MatrixEdge> {
        self.entries.get(high).copied().flatten()
    }

    pub fn set(&mut self, high: usize, edge: MatrixEdge) {
        if self.entries.len() <= high {
            self.entries.resize(high + 1, None);
        }
        self.entries[high] = Some(edge);
    }

    /// The highest level with a cached prefix, if any.
    pub fn cached_prefix_top(&self) -> Option<usize> {
        self.entries.iter().rposition(Option::is_some)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn child_is_symmetric(table: &MatrixUniqueTable, edge: MatrixEdge) -> bool {
    match edge.node {
        None => true,
        Some(r) => table.node(r).symmetric,
    }
}

fn child_is_identity(table: &MatrixUniqueTable, edge: MatrixEdge) -> bool {
    match edge.node {
        None => true,
        Some(r) => table.node(r).identity,
    }
}

/// Sets `symmetric` and `identity` on a freshly inserted matrix node.
///
/// A node is symmetric iff every diagonal child is itself symmetric and
/// every off-diagonal pair `(i, j)` / `(j, i)` are transposes of each other.
/// A node is identity iff every off-diagonal weight is `Zero`, every
/// diagonal weight is `One`, and every diagonal child is itself identity.
/// `transpose` is injected rather than called directly to avoid a module
/// cycle with [`crate::ops::transpose`], which itself allocates nodes
/// through this same unique table.
pub fn check_special_matrices(
    table: &mut MatrixUniqueTable,
    radix: &RadixTable,
    node: MatrixNodeRef,
    mut transpose: impl FnMut(&mut MatrixUniqueTable, MatrixEdge) -> MatrixEdge,
) {
    let var = table.node(node).var;
    if var < 0 {
        return;
    }
    table.node_mut(node).symmetric = false;
    table.node_mut(node).identity = false;

    let dim = radix.radix(var as usize) as usize;
    let children: Vec<MatrixEdge> = table.node(node).children.clone();

    for i in 0..dim {
        if !child_is_symmetric(table, children[i * dim + i]) {
            return;
        }
    }
    for i in 0..dim {
        for j in 0..dim {
            if i == j {
                continue;
            }
            let transposed = transpose(table, children[i * dim + j]);
            if transposed != children[j * dim + i] {
                return;
            }
        }
    }
    table.node_mut(node).symmetric = true;

    for i in 0..dim {
        for j in 0..dim {
            let e = children[i * dim + j];
            if i == j {
                if !child_is_identity(table, e) || e.weight != ComplexHandle::ONE {
                    return;
                }
            } else if e.weight != ComplexHandle::ZERO {
                return;
            }
        }
    }
    table.node_mut(node).identity = true;
}

/// A node type usable interchangeably wherever a `symmetric`/`identity`
/// flag pair matters; kept for documentation purposes — `MatrixNode` is the
/// only implementor in this crate today.
pub trait SpecialMatrixFlags {
    fn symmetric(&self) -> bool;
    fn identity(&self) -> bool;
}

impl SpecialMatrixFlags for MatrixNode {
    fn symmetric(&self) -> bool {
        self.symmetric
    }
    fn identity(&self) -> bool {
        self.identity
    }
}
