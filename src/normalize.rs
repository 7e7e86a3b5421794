//! Vector and matrix node normalization.
//!
//! The two are deliberately kept as separate functions rather than unified
//! behind a shared abstraction: a vector edge's weight is renormalized to
//! unit `ℓ²`-norm on every construction, while a matrix edge's weight only
//! ever extracts the argmax child's weight without a final `‖·‖` pass. That
//! difference is load-bearing (it is what lets matrix nodes cheaply
//! recognize the identity and symmetric special cases in
//! [`crate::identity`]) rather than an oversight to be papered over with a
//! generic `Normalizable` trait.

use crate::complex::{ComplexHandle, ComplexNumbers};
use crate::node::{MatrixEdge, MatrixNodeRef, VectorEdge, VectorNodeRef};
use crate::unique_table::{MatrixUniqueTable, VectorUniqueTable};

/// Normalizes a freshly built vector node in place and returns the edge that
/// should point at it (or at a terminal, if the node collapsed).
///
/// `cached` marks the incoming edge's weight (and any non-zero child
/// weights) as scratch handles owned by the caller, rather than canonical
/// handles already present in the scalar store — see
/// [`ComplexNumbers::get_temporary`].
pub fn normalize_vector(
    table: &mut VectorUniqueTable,
    cn: &mut ComplexNumbers,
    node: VectorNodeRef,
    cached: bool,
) -> VectorEdge {
    let mut children = std::mem::take(&mut table.node_mut(node).children);
    let tol = cn.scalars.tolerance();

    let zero: Vec<bool> = children.iter().map(|e| cn.approx_zero(e.weight)).collect();

    if cached {
        for (i, is_zero) in zero.iter().enumerate() {
            if *is_zero && children[i].weight != ComplexHandle::ZERO {
                cn.return_to_cache(children[i].weight);
                children[i] = VectorEdge::ZERO;
            }
        }
    }

    let nonzero: Vec<usize> = zero
        .iter()
        .enumerate()
        .filter(|(_, z)| !**z)
        .map(|(i, _)| i)
        .collect();

    if nonzero.is_empty() {
        if !cached {
            table.return_node(node);
        }
        return VectorEdge::ZERO;
    }

    if nonzero.len() == 1 {
        let idx = nonzero[0];
        let weight_from_child = children[idx].weight;
        let edge_weight = if cached && weight_from_child != ComplexHandle::ONE {
            weight_from_child
        } else {
            cn.lookup(weight_from_child)
        };
        children[idx].weight = ComplexHandle::ONE;
        table.node_mut(node).children = children;
        return VectorEdge {
            node: Some(node),
            weight: edge_weight,
        };
    }

    let len = children.len();
    let mut sum_norm2 = 0.0;
    for e in &children {
        sum_norm2 += cn.mag2(e.weight);
    }

    let mut mag2_max = cn.mag2(children[0].weight);
    let mut argmax = 0usize;
    for i in 1..=len {
        let counter_back = len - i;
        let m = cn.mag2(children[counter_back].weight);
        if m + tol >= mag2_max {
            mag2_max = m;
            argmax = counter_back;
        }
    }

    let norm = sum_norm2.sqrt();
    let mag_max = mag2_max.sqrt();
    let common_factor = norm / mag_max;

    let max_weight = children[argmax].weight;
    let edge_weight = if cached && max_weight != ComplexHandle::ONE {
        let r = cn.scalars.val(max_weight.real) * common_factor;
        let i = cn.scalars.val(max_weight.imag) * common_factor;
        cn.scalars.set_temporary(max_weight.real, r);
        cn.scalars.set_temporary(max_weight.imag, i);
        max_weight
    } else {
        let r = cn.scalars.val(max_weight.real) * common_factor;
        let i = cn.scalars.val(max_weight.imag) * common_factor;
        let w = cn.lookup_values(r, i);
        if cn.approx_zero(w) {
            table.node_mut(node).children = children;
            return VectorEdge::ZERO;
        }
        w
    };

    let new_max_weight = cn.lookup_values(mag_max / norm, 0.0);
    children[argmax] = if new_max_weight.is_exactly_zero() {
        VectorEdge::ZERO
    } else {
        VectorEdge {
            node: children[argmax].node,
            weight: new_max_weight,
        }
    };

    for i in 0..len {
        if i == argmax {
            continue;
        }
        let old_weight = children[i].weight;
        let quotient = if cached && old_weight != ComplexHandle::ZERO {
            cn.return_to_cache(old_weight);
            let c = cn.get_temporary();
            cn.div(c, old_weight, edge_weight);
            cn.lookup(c)
        } else {
            let c = cn.get_temporary();
            cn.div(c, old_weight, edge_weight);
            cn.lookup(c)
        };
        children[i].weight = quotient;
        if quotient.is_exactly_zero() {
            children[i] = VectorEdge::ZERO;
        }
    }
    table.node_mut(node).children = children;
    VectorEdge {
        node: Some(node),
        weight: edge_weight,
    }
}

/// Normalizes a freshly built matrix node in place. Unlike
/// [`normalize_vector`], this extracts the magnitude-argmax child's weight
/// onto the incoming edge without a final unit-norm pass — a matrix DD's
/// weights only need to be proportional to the true entries, not unit-norm.
pub fn normalize_matrix(
    table: &mut MatrixUniqueTable,
    cn: &mut ComplexNumbers,
    node: MatrixNodeRef,
    cached: bool,
) -> MatrixEdge {
    let mut children = std::mem::take(&mut table.node_mut(node).children);
    let tol = cn.scalars.tolerance();

    let zero: Vec<bool> = children.iter().map(|e| cn.approx_zero(e.weight)).collect();

    if cached {
        for (i, is_zero) in zero.iter().enumerate() {
            if *is_zero && children[i].weight != ComplexHandle::ZERO {
                cn.return_to_cache(children[i].weight);
                children[i] = MatrixEdge::ZERO;
            }
        }
    }

    let mut argmax: Option<usize> = None;
    let mut max_magnitude = 0.0;
    let mut max_weight = ComplexHandle::ONE;
    for (i, is_zero) in zero.iter().enumerate() {
        if *is_zero {
            continue;
        }
        let magnitude = cn.mag2(children[i].weight);
        match argmax {
            None => {
                argmax = Some(i);
                max_magnitude = magnitude;
                max_weight = children[i].weight;
            }
            Some(_) if magnitude - max_magnitude > tol => {
                argmax = Some(i);
                max_magnitude = magnitude;
                max_weight = children[i].weight;
            }
            _ => {}
        }
    }

    let Some(argmax) = argmax else {
        if !cached {
            table.return_node(node);
        }
        return MatrixEdge::ZERO;
    };

    let mut edge_weight = ComplexHandle::ONE;
    for i in 0..children.len() {
        if i == argmax {
            if cached {
                if edge_weight.is_exactly_one() {
                    edge_weight = max_weight;
                } else {
                    let c = cn.get_temporary();
                    cn.mul(c, edge_weight, max_weight);
                    edge_weight = c;
                }
            } else if edge_weight.is_exactly_one() {
                edge_weight = max_weight;
            } else {
                let c = cn.get_temporary();
                cn.mul(c, edge_weight, max_weight);
                edge_weight = cn.lookup(c);
            }
            children[i].weight = ComplexHandle::ONE;
        } else {
            if cached && !zero[i] && children[i].weight != ComplexHandle::ONE {
                cn.return_to_cache(children[i].weight);
            }
            if cn.approx_one(children[i].weight) {
                children[i].weight = ComplexHandle::ONE;
            }
            let c = cn.get_temporary();
            cn.div(c, children[i].weight, max_weight);
            children[i].weight = cn.lookup(c);
        }
    }

    table.node_mut(node).children = children;
    MatrixEdge {
        node: Some(node),
        weight: edge_weight,
    }
}
