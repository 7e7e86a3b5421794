//! End-to-end scenarios exercising the external `Package` interface against
//! concrete gate sequences.

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use qmdd::prelude::*;

fn c(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

fn hadamard() -> Vec<Complex64> {
    vec![c(FRAC_1_SQRT_2), c(FRAC_1_SQRT_2), c(FRAC_1_SQRT_2), c(-FRAC_1_SQRT_2)]
}

/// Cyclic shift `|k⟩ ↦ |k+1 mod d⟩`.
fn shift(d: usize, step: i64) -> Vec<Complex64> {
    let mut m = vec![c(0.0); d * d];
    for j in 0..d {
        let i = (((j as i64 + step) % d as i64) + d as i64) % d as i64;
        m[i as usize * d + j] = c(1.0);
    }
    m
}

fn amp(pkg: &mut Package, e: VectorEdge, path: &[usize]) -> Complex64 {
    pkg.get_value_by_path(e, path)
}

fn assert_close(got: Complex64, want: Complex64, tol: f64) {
    assert!((got - want).norm() < tol, "got {got:?}, want {want:?}");
}

#[test]
fn hadamard_with_qutrit_controlled_shift_entangles_the_pair() {
    let radix = RadixTable::new(vec![2, 3]).unwrap();
    let mut pkg = Package::new(radix, PackageConfig::default());

    let zero = pkg.make_zero_state(2, 0).unwrap();
    let gate_h = pkg.make_gate_dd(&hadamard(), 2, &[], 0, 0).unwrap();
    let after_h = pkg.apply(gate_h, zero, 0);

    let x3 = shift(3, 1);
    let controls = [Control { register: 0, level: 1 }];
    let gate_cx = pkg.make_gate_dd(&x3, 2, &controls, 1, 0).unwrap();
    let result = pkg.apply(gate_cx, after_h, 0);

    assert_close(amp(&mut pkg, result, &[0, 0]), c(FRAC_1_SQRT_2), 1e-9);
    assert_close(amp(&mut pkg, result, &[1, 1]), c(FRAC_1_SQRT_2), 1e-9);
    assert_close(amp(&mut pkg, result, &[0, 1]), c(0.0), 1e-9);
    assert_close(amp(&mut pkg, result, &[1, 0]), c(0.0), 1e-9);
    assert_close(amp(&mut pkg, result, &[1, 2]), c(0.0), 1e-9);

    assert!((pkg.fidelity(result, result) - 1.0).abs() < 1e-9);
}

#[test]
fn qutrit_ghz_has_equal_thirds_fidelity_with_each_basis_state() {
    let radix = RadixTable::new(vec![3, 3, 3]).unwrap();
    let mut pkg = Package::new(radix, PackageConfig::default());

    // A balanced qutrit "Hadamard" spreading |0> into an equal superposition
    // of |0>, |1>, |2>.
    let third = 1.0 / 3f64.sqrt();
    let h3 = vec![c(third); 9];

    let zero = pkg.make_zero_state(3, 0).unwrap();
    let gate_h3 = pkg.make_gate_dd(&h3, 3, &[], 0, 0).unwrap();
    let mut state = pkg.apply(gate_h3, zero, 0);

    let shift_fwd = shift(3, 1);
    let shift_back = shift(3, 2);

    let g1 = pkg
        .make_gate_dd(&shift_fwd, 3, &[Control { register: 0, level: 1 }], 1, 0)
        .unwrap();
    let g2 = pkg
        .make_gate_dd(&shift_back, 3, &[Control { register: 0, level: 2 }], 1, 0)
        .unwrap();
    let reg1_step = pkg.multiply_matrix(g2, g1, 0);
    state = pkg.apply(reg1_step, state, 0);

    let g3 = pkg
        .make_gate_dd(
            &shift_fwd,
            3,
            &[Control { register: 0, level: 1 }, Control { register: 1, level: 1 }],
            2,
            0,
        )
        .unwrap();
    let g4 = pkg
        .make_gate_dd(
            &shift_back,
            3,
            &[Control { register: 0, level: 2 }, Control { register: 1, level: 2 }],
            2,
            0,
        )
        .unwrap();
    let reg2_step = pkg.multiply_matrix(g4, g3, 0);
    state = pkg.apply(reg2_step, state, 0);

    let b0 = pkg.make_basis_state(3, &[0, 0, 0], 0).unwrap();
    let b1 = pkg.make_basis_state(3, &[1, 1, 1], 0).unwrap();
    let b2 = pkg.make_basis_state(3, &[2, 2, 2], 0).unwrap();

    assert!((pkg.fidelity(state, b0) - 1.0 / 3.0).abs() < 1e-9);
    assert!((pkg.fidelity(state, b1) - 1.0 / 3.0).abs() < 1e-9);
    assert!((pkg.fidelity(state, b2) - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn repeated_hadamard_returns_to_the_original_state() {
    let radix = RadixTable::new(vec![2]).unwrap();
    let mut pkg = Package::new(radix, PackageConfig::default());

    let zero = pkg.make_zero_state(1, 0).unwrap();
    let gate_h = pkg.make_gate_dd(&hadamard(), 1, &[], 0, 0).unwrap();
    // Keep both alive across the forced sweeps below; nothing else pins them.
    pkg.inc_ref_vector(zero);
    pkg.inc_ref_matrix(gate_h);

    pkg.garbage_collect(true);
    let scalars_before = pkg.scalar_live_count();

    let mut state = zero;
    for _ in 0..8 {
        state = pkg.apply(gate_h, state, 0);
    }

    assert_eq!(state.node, zero.node);
    assert_eq!(pkg.get_vector(state), pkg.get_vector(zero));

    pkg.garbage_collect(true);
    assert_eq!(
        pkg.scalar_live_count(),
        scalars_before,
        "round trip through the scratch pool must not leak canonical or scratch scalar entries"
    );
}

#[test]
fn norm_is_preserved_across_a_long_mixed_radix_gate_sequence() {
    let radix = RadixTable::new(vec![2, 3, 4]).unwrap();
    let mut pkg = Package::new(radix, PackageConfig::default());

    let mut state = pkg.make_zero_state(3, 0).unwrap();
    let gates: Vec<(Vec<Complex64>, usize)> = vec![
        (hadamard(), 0),
        (shift(3, 1), 1),
        (shift(4, 1), 2),
        (shift(3, 2), 1),
        (shift(4, 3), 2),
    ];

    for round in 0..40 {
        let (matrix, target) = &gates[round % gates.len()];
        let gate = pkg.make_gate_dd(matrix, 3, &[], *target, 0).unwrap();
        state = pkg.apply(gate, state, 0);
        let norm2 = pkg.fidelity(state, state);
        assert!((norm2 - 1.0).abs() < 1e-6, "round {round}: norm^2 = {norm2}");
    }
}

#[test]
fn identity_is_a_true_fixed_point_of_multiply() {
    let radix = RadixTable::new(vec![2, 3]).unwrap();
    let mut pkg = Package::new(radix, PackageConfig::default());

    let gate_h = pkg.make_gate_dd(&hadamard(), 2, &[], 0, 0).unwrap();
    let id = pkg.make_identity(2).unwrap();

    let left = pkg.multiply_matrix(id, gate_h, 0);
    let right = pkg.multiply_matrix(gate_h, id, 0);

    assert_eq!(left.node, gate_h.node);
    assert_eq!(right.node, gate_h.node);
}

#[test]
fn unitary_gate_inverts_under_conjugate_transpose() {
    let radix = RadixTable::new(vec![2]).unwrap();
    let mut pkg = Package::new(radix, PackageConfig::default());

    let gate_h = pkg.make_gate_dd(&hadamard(), 1, &[], 0, 0).unwrap();
    let gate_h_dag = pkg.conjugate_transpose(gate_h);
    let product = pkg.multiply_matrix(gate_h_dag, gate_h, 0);
    let id = pkg.make_identity(1).unwrap();

    assert_eq!(product.node, id.node);
}

#[test]
fn transpose_and_conjugate_transpose_are_involutions() {
    let radix = RadixTable::new(vec![3]).unwrap();
    let mut pkg = Package::new(radix, PackageConfig::default());

    let x3 = shift(3, 1);
    let gate = pkg.make_gate_dd(&x3, 1, &[], 0, 0).unwrap();

    let t = pkg.transpose(gate);
    let tt = pkg.transpose(t);
    assert_eq!(tt.node, gate.node);

    let ct = pkg.conjugate_transpose(gate);
    let ctct = pkg.conjugate_transpose(ct);
    assert_eq!(ctct.node, gate.node);
}

#[test]
fn kronecker_of_single_register_states_matches_the_joint_basis_state() {
    let radix = RadixTable::new(vec![2, 3]).unwrap();
    let mut pkg = Package::new(radix, PackageConfig::default());

    let low = pkg.make_basis_state(1, &[1], 0).unwrap();
    let high = pkg.make_basis_state(1, &[2], 1).unwrap();
    let joint = pkg.kronecker_vector(high, low, false).unwrap();

    let whole = pkg.make_basis_state(2, &[1, 2], 0).unwrap();

    assert_eq!(joint.node, whole.node);
    assert_eq!(pkg.get_vector(joint), pkg.get_vector(whole));
}
