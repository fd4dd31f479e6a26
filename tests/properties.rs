use proptest::prelude::*;
use quboc::{BoundModel, Model, VarDomain};
use std::collections::HashMap;

const EPS: f64 = 1.0e-9;

fn coeff() -> impl Strategy<Value = f64> {
	// small magnitudes keep float comparisons exact enough
	(-8i32..=8).prop_map(|n| n as f64 * 0.5)
}

/// Quadratic over `n` bits from dense coefficient lists.
fn build(n: usize, linear: &[f64], quadratic: &[f64]) -> BoundModel {
	let mut model = Model::new();
	let m = model.declare("m", VarDomain::Binary, &[n]).unwrap();
	let mut terms = Vec::new();
	for (i, &a) in linear.iter().enumerate() {
		let v = model.var_at(m, &[i]).unwrap();
		let c = model.constant(a);
		terms.push(model.mul(c, v).unwrap());
	}
	let mut pair = 0;
	for i in 0..n {
		for k in i + 1..n {
			let a = model.var_at(m, &[i]).unwrap();
			let b = model.var_at(m, &[k]).unwrap();
			let ab = model.mul(a, b).unwrap();
			let c = model.constant(quadratic[pair]);
			terms.push(model.mul(c, ab).unwrap());
			pair += 1;
		}
	}
	let objective = model.sum(&terms);
	model
		.compile(objective)
		.unwrap()
		.bind(&HashMap::new())
		.unwrap()
}

fn direct_energy(linear: &[f64], quadratic: &[f64], bits: &[bool]) -> f64 {
	let n = bits.len();
	let mut energy = 0.0;
	for (i, &a) in linear.iter().enumerate() {
		if bits[i] {
			energy += a;
		}
	}
	let mut pair = 0;
	for i in 0..n {
		for k in i + 1..n {
			if bits[i] && bits[k] {
				energy += quadratic[pair];
			}
			pair += 1;
		}
	}
	energy
}

proptest! {
	#[test]
	fn energy_matches_direct_evaluation(
		linear in proptest::collection::vec(coeff(), 5),
		quadratic in proptest::collection::vec(coeff(), 10),
		assignment in proptest::collection::vec(any::<bool>(), 5),
	) {
		let bound = build(5, &linear, &quadratic);
		let expected = direct_energy(&linear, &quadratic, &assignment);
		let energy = bound.energy(&assignment).unwrap();
		prop_assert!((energy - expected).abs() < EPS);
		prop_assert_eq!(bound.decode(&assignment).unwrap().energy(), energy);
	}

	#[test]
	fn qubo_and_ising_agree(
		linear in proptest::collection::vec(coeff(), 4),
		quadratic in proptest::collection::vec(coeff(), 6),
	) {
		let bound = build(4, &linear, &quadratic);
		let (h, j, offset) = bound.ising();
		for bits in 0..16u32 {
			let assignment: Vec<bool> = (0..4).map(|i| bits & (1 << i) != 0).collect();
			let spins: Vec<f64> = assignment
				.iter()
				.map(|&b| if b { 1.0 } else { -1.0 })
				.collect();
			let mut ising = offset;
			for (i, hi) in h.iter().enumerate() {
				ising += hi * spins[i];
			}
			for ((i, k), jik) in &j {
				ising += jik * spins[*i] * spins[*k];
			}
			let qubo = bound.energy(&assignment).unwrap();
			prop_assert!((ising - qubo).abs() < EPS);
		}
	}

	#[test]
	fn compilation_is_reproducible(
		linear in proptest::collection::vec(coeff(), 4),
		quadratic in proptest::collection::vec(coeff(), 6),
	) {
		let a = build(4, &linear, &quadratic);
		let b = build(4, &linear, &quadratic);
		prop_assert_eq!(
			serde_json::to_string(&a).unwrap(),
			serde_json::to_string(&b).unwrap()
		);
	}
}
