use crate::error::{DecodeError, Result};
use crate::model::Comparator;
use crate::registry::{unflatten, IndexEntry, VarDecl, VarDomain};
use crate::solution::{ConstraintReport, Solution, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TOLERANCE: f64 = 1.0e-9;

/// Fully numeric quadratic form over matrix indices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct NumericQuad {
	pub offset: f64,
	pub linear: Vec<(usize, f64)>,
	pub quadratic: Vec<((usize, usize), f64)>,
}

impl NumericQuad {
	pub fn energy(&self, bits: &[bool]) -> f64 {
		let mut energy = self.offset;
		for (i, coeff) in &self.linear {
			if bits[*i] {
				energy += coeff;
			}
		}
		for ((i, j), coeff) in &self.quadratic {
			if bits[*i] && bits[*j] {
				energy += coeff;
			}
		}
		energy
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BoundChecker {
	pub label: String,
	pub comparator: Comparator,
	pub target: f64,
	pub body: NumericQuad,
}

impl BoundChecker {
	fn report(&self, bits: &[bool]) -> ConstraintReport {
		let value = self.body.energy(bits);
		let tolerance = TOLERANCE * (1.0 + self.target.abs());
		let violation = match self.comparator {
			Comparator::Eq => (value - self.target).abs(),
			Comparator::Le => (value - self.target).max(0.0),
			Comparator::Ge => (self.target - value).max(0.0),
		};
		ConstraintReport {
			satisfied: violation <= tolerance,
			violation: if violation <= tolerance { 0.0 } else { violation },
		}
	}
}

/// Concrete QUBO produced by [`crate::CompiledModel::bind`]: every
/// coefficient is a number. Immutable; safe to read from multiple threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundModel {
	pub(crate) terms: NumericQuad,
	pub(crate) index_table: Vec<IndexEntry>,
	pub(crate) var_decls: Vec<VarDecl>,
	pub(crate) checkers: Vec<BoundChecker>,
}

impl BoundModel {
	pub fn offset(&self) -> f64 {
		self.terms.offset
	}

	/// Diagonal entries, sorted by index.
	pub fn linear(&self) -> &[(usize, f64)] {
		&self.terms.linear
	}

	/// Off-diagonal entries, sorted, with `i < j` and one entry per pair.
	pub fn quadratic(&self) -> &[((usize, usize), f64)] {
		&self.terms.quadratic
	}

	pub fn num_indices(&self) -> usize {
		self.index_table.len()
	}

	pub fn index_table(&self) -> &[IndexEntry] {
		&self.index_table
	}

	/// The model as an index-pair map plus offset; linear terms appear on
	/// the diagonal.
	pub fn qubo(&self) -> (BTreeMap<(usize, usize), f64>, f64) {
		let mut map = BTreeMap::new();
		for (i, coeff) in &self.terms.linear {
			map.insert((*i, *i), *coeff);
		}
		for (pair, coeff) in &self.terms.quadratic {
			map.insert(*pair, *coeff);
		}
		(map, self.terms.offset)
	}

	/// The equivalent Ising form `(h, J, offset)` under `x = (s + 1) / 2`.
	pub fn ising(&self) -> (Vec<f64>, BTreeMap<(usize, usize), f64>, f64) {
		let mut h = vec![0.0; self.index_table.len()];
		let mut j: BTreeMap<(usize, usize), f64> = BTreeMap::new();
		let mut offset = self.terms.offset;
		for (i, a) in &self.terms.linear {
			h[*i] += a / 2.0;
			offset += a / 2.0;
		}
		for ((i, k), b) in &self.terms.quadratic {
			*j.entry((*i, *k)).or_insert(0.0) += b / 4.0;
			h[*i] += b / 4.0;
			h[*k] += b / 4.0;
			offset += b / 4.0;
		}
		(h, j, offset)
	}

	/// Recompute the energy of a bit assignment.
	pub fn energy(&self, bits: &[bool]) -> Result<f64> {
		if bits.len() != self.index_table.len() {
			return Err(DecodeError::LengthMismatch {
				expected: self.index_table.len(),
				got: bits.len(),
			}
			.into());
		}
		let energy = self.terms.energy(bits);
		if !energy.is_finite() {
			return Err(DecodeError::NonFiniteEnergy { computed: energy }.into());
		}
		Ok(energy)
	}

	/// Reassemble domain-native values and constraint reports from a
	/// sampled bit assignment.
	pub fn decode(&self, bits: &[bool]) -> Result<Solution> {
		let energy = self.energy(bits)?;
		let mut values = BTreeMap::new();
		for decl in &self.var_decls {
			for element in 0..decl.elements() {
				let start = decl.first_index + element * decl.bits_per_element;
				let value = match decl.domain {
					VarDomain::Binary => Value::Binary(bits[start]),
					VarDomain::Spin => Value::Spin(if bits[start] { 1 } else { -1 }),
					VarDomain::Integer { low, .. } => {
						let mut v = low;
						for (k, weight) in decl.weights.iter().enumerate() {
							if bits[start + k] {
								v += weight;
							}
						}
						Value::Integer(v)
					}
				};
				values.insert((decl.name.clone(), unflatten(element, &decl.shape)), value);
			}
		}
		let constraints = self
			.checkers
			.iter()
			.map(|c| (c.label.clone(), c.report(bits)))
			.collect();
		Ok(Solution::new(values, constraints, energy, bits.to_vec()))
	}

	/// Decode and cross-check a solver-reported energy against the
	/// recomputed one.
	pub fn decode_with_energy(&self, bits: &[bool], reported: f64) -> Result<Solution> {
		let solution = self.decode(bits)?;
		let computed = solution.energy();
		if (reported - computed).abs() > TOLERANCE * (1.0 + computed.abs()) {
			return Err(DecodeError::EnergyMismatch { reported, computed }.into());
		}
		Ok(solution)
	}
}
