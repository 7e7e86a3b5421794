//! The recursive DD operators: addition, multiplication, Kronecker product,
//! transpose, and inner product. Each lives in its own module but all share
//! [`Package`]'s arenas and compute-table caches.

pub mod add;
pub mod inner_product;
pub mod kronecker;
pub mod multiply;
pub mod transpose;

use crate::complex::ComplexHandle;
use crate::error::Result;
use crate::node::{MatrixEdge, VectorEdge};
use crate::package::Package;

impl Package {
    /// Elementwise sum of two vector DDs.
    pub fn add_vector(&mut self, x: VectorEdge, y: VectorEdge) -> VectorEdge {
        add::add_vector(self, x, y)
    }

    /// Elementwise sum of two matrix DDs.
    pub fn add_matrix(&mut self, x: MatrixEdge, y: MatrixEdge) -> MatrixEdge {
        add::add_matrix(self, x, y)
    }

    /// `x · y`, matrix-matrix, over registers `[start, ∞)`.
    pub fn multiply_matrix(&mut self, x: MatrixEdge, y: MatrixEdge, start: i32) -> MatrixEdge {
        multiply::multiply_matrix_matrix(self, x, y, start)
    }

    /// `x · y`, matrix-vector, over registers `[start, ∞)`.
    pub fn apply(&mut self, x: MatrixEdge, y: VectorEdge, start: i32) -> VectorEdge {
        multiply::multiply_matrix_vector(self, x, y, start)
    }

    /// `x ⊗ y`, vector Kronecker product. `inc_idx` re-bases `x`'s levels
    /// above `y`'s so the two spans don't collide.
    pub fn kronecker_vector(&mut self, x: VectorEdge, y: VectorEdge, inc_idx: bool) -> Result<VectorEdge> {
        kronecker::kronecker_vector(self, x, y, inc_idx)
    }

    /// `x ⊗ y`, matrix Kronecker product.
    pub fn kronecker_matrix(&mut self, x: MatrixEdge, y: MatrixEdge, inc_idx: bool) -> Result<MatrixEdge> {
        kronecker::kronecker_matrix(self, x, y, inc_idx)
    }

    /// The transpose `xᵀ`.
    pub fn transpose(&mut self, x: MatrixEdge) -> MatrixEdge {
        transpose::transpose(self, x)
    }

    /// The conjugate transpose `x†`.
    pub fn conjugate_transpose(&mut self, x: MatrixEdge) -> MatrixEdge {
        transpose::conjugate_transpose(self, x)
    }

    /// `⟨x|y⟩`.
    pub fn inner_product(&mut self, x: VectorEdge, y: VectorEdge) -> ComplexHandle {
        inner_product::inner_product(self, x, y)
    }

    /// `|⟨x|y⟩|²`.
    pub fn fidelity(&mut self, x: VectorEdge, y: VectorEdge) -> f64 {
        inner_product::fidelity(self, x, y)
    }
}
