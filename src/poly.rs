use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Coefficient that may still depend on placeholders: a constant plus a sum
/// of placeholder monomials. Small and serializable by construction — no
/// captured closures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct Coeff {
	constant: f64,
	terms: Vec<(Vec<usize>, f64)>,
}

impl Coeff {
	pub fn constant(value: f64) -> Self {
		Self {
			constant: value,
			terms: Vec::new(),
		}
	}

	pub fn placeholder(id: usize) -> Self {
		Self {
			constant: 0.0,
			terms: vec![(vec![id], 1.0)],
		}
	}

	pub fn is_zero(&self) -> bool {
		self.constant == 0.0 && self.terms.iter().all(|(_, v)| *v == 0.0)
	}

	pub fn is_constant(&self) -> bool {
		self.terms.is_empty()
	}

	pub fn constant_part(&self) -> f64 {
		self.constant
	}

	fn add_term(&mut self, mono: &[usize], value: f64) {
		if value == 0.0 {
			return;
		}
		match self.terms.binary_search_by(|(m, _)| m.as_slice().cmp(mono)) {
			Ok(i) => self.terms[i].1 += value,
			Err(i) => self.terms.insert(i, (mono.to_vec(), value)),
		}
	}

	pub fn add_assign(&mut self, other: &Coeff) {
		self.constant += other.constant;
		for (mono, value) in &other.terms {
			self.add_term(mono, *value);
		}
	}

	pub fn mul(&self, other: &Coeff) -> Coeff {
		let mut out = Coeff::constant(self.constant * other.constant);
		for (mono, value) in &other.terms {
			out.add_term(mono, self.constant * value);
		}
		for (mono, value) in &self.terms {
			out.add_term(mono, other.constant * value);
		}
		for (m1, v1) in &self.terms {
			for (m2, v2) in &other.terms {
				let mut mono = m1.clone();
				mono.extend_from_slice(m2);
				mono.sort_unstable();
				out.add_term(&mono, v1 * v2);
			}
		}
		out
	}

	pub fn eval(&self, values: &[f64]) -> f64 {
		let mut out = self.constant;
		for (mono, value) in &self.terms {
			out += value * mono.iter().fold(1.0, |acc, &id| acc * values[id]);
		}
		out
	}

	pub fn collect_placeholders(&self, out: &mut BTreeSet<usize>) {
		for (mono, _) in &self.terms {
			out.extend(mono.iter().copied());
		}
	}
}

/// Quadratic polynomial over matrix indices accumulated during lowering.
/// Quadratic keys always hold `i < j`; same-index products collapse to the
/// linear entry (binary algebra).
#[derive(Debug, Clone, Default)]
pub(crate) struct Poly {
	pub offset: Coeff,
	pub linear: BTreeMap<usize, Coeff>,
	pub quadratic: BTreeMap<(usize, usize), Coeff>,
}

impl Poly {
	pub fn from_coeff(coeff: Coeff) -> Self {
		Self {
			offset: coeff,
			..Self::default()
		}
	}

	pub fn from_var(index: usize) -> Self {
		let mut out = Self::default();
		out.linear.insert(index, Coeff::constant(1.0));
		out
	}

	pub fn degree(&self) -> usize {
		if !self.quadratic.is_empty() {
			2
		} else if !self.linear.is_empty() {
			1
		} else {
			0
		}
	}

	fn add_linear(&mut self, index: usize, coeff: Coeff) {
		self.linear.entry(index).or_default().add_assign(&coeff);
	}

	fn add_quadratic(&mut self, pair: (usize, usize), coeff: Coeff) {
		self.quadratic.entry(pair).or_default().add_assign(&coeff);
	}

	pub fn add_assign(&mut self, other: &Poly) {
		self.offset.add_assign(&other.offset);
		for (index, coeff) in &other.linear {
			self.add_linear(*index, coeff.clone());
		}
		for (pair, coeff) in &other.quadratic {
			self.add_quadratic(*pair, coeff.clone());
		}
	}

	pub fn mul(&self, other: &Poly) -> Result<Poly> {
		let degree = self.degree() + other.degree();
		if degree > 2 {
			return Err(DomainError::DegreeOverflow { degree }.into());
		}
		let mut out = Poly::from_coeff(self.offset.mul(&other.offset));
		for (index, coeff) in &other.linear {
			out.add_linear(*index, self.offset.mul(coeff));
		}
		for (pair, coeff) in &other.quadratic {
			out.add_quadratic(*pair, self.offset.mul(coeff));
		}
		for (index, coeff) in &self.linear {
			out.add_linear(*index, other.offset.mul(coeff));
		}
		for (pair, coeff) in &self.quadratic {
			out.add_quadratic(*pair, other.offset.mul(coeff));
		}
		for (i, ci) in &self.linear {
			for (j, cj) in &other.linear {
				let coeff = ci.mul(cj);
				if i == j {
					// x * x = x for binary bits
					out.add_linear(*i, coeff);
				} else {
					out.add_quadratic((*i.min(j), *i.max(j)), coeff);
				}
			}
		}
		Ok(out)
	}
}

#[test]
fn coeff_arith_test() {
	let mut c = Coeff::constant(2.0);
	c.add_assign(&Coeff::placeholder(0));
	c.add_assign(&Coeff::placeholder(0));
	// 2 + 2*p0
	assert_eq!(c.eval(&[3.0]), 8.0);
	let d = c.mul(&Coeff::placeholder(1));
	// 2*p1 + 2*p0*p1
	assert_eq!(d.eval(&[3.0, 5.0]), 40.0);
	assert!(!d.is_constant());
	let mut phs = BTreeSet::new();
	d.collect_placeholders(&mut phs);
	assert_eq!(phs.into_iter().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn poly_mul_test() {
	// (x0 + x1) * (x0 + x1) = x0 + x1 + 2 x0 x1
	let mut sum = Poly::from_var(0);
	sum.add_assign(&Poly::from_var(1));
	let sq = sum.mul(&sum).unwrap();
	assert_eq!(sq.linear[&0].eval(&[]), 1.0);
	assert_eq!(sq.linear[&1].eval(&[]), 1.0);
	assert_eq!(sq.quadratic[&(0, 1)].eval(&[]), 2.0);
	let overflow = sq.mul(&Poly::from_var(2));
	assert!(overflow.is_err());
}
