//! `⟨x|y⟩` and the derived fidelity `|⟨x|y⟩|²`.

use crate::complex::{ComplexHandle, ComplexNumbers};
use crate::compute::{BinaryKey, CachedValue};
use crate::node::VectorNodeRef;
use crate::package::{Package, VectorBinaryKey};

/// The node-structural part of the inner product, with both edges' weights
/// factored out — `⟨x|y⟩` is sesquilinear in each operand's weight, so the
/// structural result for a given node pair is reusable across any scaling of
/// either operand, same as [`crate::ops::multiply`]'s factored cache.
fn ip_struct(pkg: &mut Package, xn: Option<VectorNodeRef>, yn: Option<VectorNodeRef>) -> ComplexHandle {
    if xn.is_none() && yn.is_none() {
        return ComplexHandle::ONE;
    }

    let key: VectorBinaryKey = BinaryKey::new(xn, yn);
    if let Some(cached) = pkg.vector_inner_product_cache.lookup(key) {
        let mut cn = ComplexNumbers::new(&mut pkg.scalars);
        let (_, w) = cached.materialize(&mut cn);
        return cn.lookup(w);
    }

    let xc = pkg.vectors.node(xn.unwrap()).children.clone();
    let yc = pkg.vectors.node(yn.unwrap()).children.clone();

    let mut acc = ComplexHandle::ZERO;
    for (xe, ye) in xc.into_iter().zip(yc.into_iter()) {
        if xe.weight.is_exactly_zero() || ye.weight.is_exactly_zero() {
            continue;
        }
        let sub = ip_struct(pkg, xe.node, ye.node);

        let mut cn = ComplexNumbers::new(&mut pkg.scalars);
        let cxw = cn.conj(xe.weight);
        let term = cn.get_temporary();
        cn.mul(term, cxw, ye.weight);
        cn.mul(term, term, sub);

        let sum = cn.get_temporary();
        cn.add(sum, acc, term);
        cn.return_to_cache(term);
        acc = cn.lookup(sum);
        cn.return_to_cache(sum);
    }

    let cn = ComplexNumbers::new(&mut pkg.scalars);
    let cached_value: CachedValue<VectorNodeRef> = CachedValue::new(None, acc, &cn);
    pkg.vector_inner_product_cache.insert(key, cached_value);
    acc
}

/// `⟨x|y⟩ = sum over basis paths of conj(x's amplitude) * y's amplitude`.
pub fn inner_product(pkg: &mut Package, x: crate::node::VectorEdge, y: crate::node::VectorEdge) -> ComplexHandle {
    if x.weight.is_exactly_zero() || y.weight.is_exactly_zero() {
        return ComplexHandle::ZERO;
    }
    let structural = ip_struct(pkg, x.node, y.node);

    let mut cn = ComplexNumbers::new(&mut pkg.scalars);
    let cxw = cn.conj(x.weight);
    let top = cn.get_temporary();
    cn.mul(top, cxw, y.weight);
    let out = cn.get_temporary();
    cn.mul(out, top, structural);
    cn.return_to_cache(top);
    cn.lookup(out)
}

/// `|⟨x|y⟩|²`.
pub fn fidelity(pkg: &mut Package, x: crate::node::VectorEdge, y: crate::node::VectorEdge) -> f64 {
    let ip = inner_product(pkg, x, y);
    let cn = ComplexNumbers::new(&mut pkg.scalars);
    cn.mag2(ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageConfig;

    #[test]
    fn inner_product_of_state_with_itself_is_one() {
        let mut pkg = Package::with_uniform_radix(2, 2, PackageConfig::default()).unwrap();
        let e = pkg.make_basis_state(2, &[1, 0], 0).unwrap();
        let ip = inner_product(&mut pkg, e, e);
        let cn = ComplexNumbers::new(&mut pkg.scalars);
        assert!((cn.mag2(ip) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_basis_states_have_zero_inner_product() {
        let mut pkg = Package::with_uniform_radix(1, 3, PackageConfig::default()).unwrap();
        let a = pkg.make_basis_state(1, &[0], 0).unwrap();
        let b = pkg.make_basis_state(1, &[1], 0).unwrap();
        let ip = inner_product(&mut pkg, a, b);
        let cn = ComplexNumbers::new(&mut pkg.scalars);
        assert!(cn.mag2(ip) < 1e-12);
    }

    #[test]
    fn fidelity_of_identical_states_is_one() {
        let mut pkg = Package::with_uniform_radix(1, 2, PackageConfig::default()).unwrap();
        let a = pkg.make_basis_state(1, &[1], 0).unwrap();
        assert!((fidelity(&mut pkg, a, a) - 1.0).abs() < 1e-9);
    }
}
