use std::hash::{Hash, Hasher};

use slotmap::new_key_type;

use crate::complex::ComplexHandle;

new_key_type! {
    /// A stable handle to a vector-node slot in a [`Package`](crate::Package)'s arena.
    ///
    /// A `slotmap` key: opaque, cheap to copy, and scoped to the package
    /// that allocated it.
    pub struct VectorNodeRef;
    /// A stable handle to a matrix-node slot.
    pub struct MatrixNodeRef;
}

/// An edge: a child reference plus the complex weight on that edge.
///
/// `node: None` denotes a terminal (variable index `-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorEdge {
    pub node: Option<VectorNodeRef>,
    pub weight: ComplexHandle,
}

impl VectorEdge {
    pub const ZERO: Self = Self {
        node: None,
        weight: ComplexHandle::ZERO,
    };
    pub const ONE: Self = Self {
        node: None,
        weight: ComplexHandle::ONE,
    };

    pub fn is_terminal(&self) -> bool {
        self.node.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixEdge {
    pub node: Option<MatrixNodeRef>,
    pub weight: ComplexHandle,
}

impl MatrixEdge {
    pub const ZERO: Self = Self {
        node: None,
        weight: ComplexHandle::ZERO,
    };
    pub const ONE: Self = Self {
        node: None,
        weight: ComplexHandle::ONE,
    };

    pub fn is_terminal(&self) -> bool {
        self.node.is_none()
    }
}

/// A vector node: fans out `d_var` ways.
///
/// Equality/hashing (used by the unique table) only considers `var` and
/// `children` — `refcount` is mutable bookkeeping, not part of a node's
/// structural identity.
#[derive(Debug, Clone)]
pub struct VectorNode {
    pub var: i32,
    pub children: Vec<VectorEdge>,
    pub refcount: u32,
}

impl PartialEq for VectorNode {
    fn eq(&self, other: &Self) -> bool {
        self.var == other.var && self.children == other.children
    }
}
impl Eq for VectorNode {}

impl Hash for VectorNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.var.hash(state);
        self.children.hash(state);
    }
}

/// A matrix node: fans out `d_var²` ways, children indexed row-major
/// (`i * d_var + j` = sub-block at row `i`, column `j`).
#[derive(Debug, Clone)]
pub struct MatrixNode {
    pub var: i32,
    pub children: Vec<MatrixEdge>,
    pub refcount: u32,
    pub symmetric: bool,
    pub identity: bool,
}

impl PartialEq for MatrixNode {
    fn eq(&self, other: &Self) -> bool {
        self.var == other.var && self.children == other.children
    }
}
impl Eq for MatrixNode {}

impl Hash for MatrixNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.var.hash(state);
        self.children.hash(state);
    }
}
