use std::collections::BTreeMap;

/// Variable element key: declared name plus shape indices (empty for
/// scalars).
pub type VarKey = (String, Vec<usize>);

/// Domain-native value of one variable element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Value {
	Binary(bool),
	Spin(i8),
	Integer(i64),
}

impl Value {
	pub fn as_f64(&self) -> f64 {
		match self {
			Value::Binary(b) => {
				if *b {
					1.0
				} else {
					0.0
				}
			}
			Value::Spin(s) => *s as f64,
			Value::Integer(i) => *i as f64,
		}
	}
}

/// Satisfaction report of one constraint at a decoded assignment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstraintReport {
	pub satisfied: bool,
	pub violation: f64,
}

/// Decoded sample: structured values, per-constraint reports and the
/// recomputed energy.
#[derive(Clone, PartialEq)]
pub struct Solution {
	values: BTreeMap<VarKey, Value>,
	constraints: BTreeMap<String, ConstraintReport>,
	energy: f64,
	bits: Vec<bool>,
}

impl Solution {
	pub(crate) fn new(
		values: BTreeMap<VarKey, Value>,
		constraints: BTreeMap<String, ConstraintReport>,
		energy: f64,
		bits: Vec<bool>,
	) -> Self {
		Self {
			values,
			constraints,
			energy,
			bits,
		}
	}

	/// Value of a scalar variable.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.get_at(name, &[])
	}

	/// Value of one element of a shaped variable.
	pub fn get_at(&self, name: &str, indices: &[usize]) -> Option<&Value> {
		self.values.get(&(name.to_string(), indices.to_vec()))
	}

	pub fn values(&self) -> &BTreeMap<VarKey, Value> {
		&self.values
	}

	pub fn constraint(&self, label: &str) -> Option<&ConstraintReport> {
		self.constraints.get(label)
	}

	pub fn constraints(&self) -> &BTreeMap<String, ConstraintReport> {
		&self.constraints
	}

	/// Labels of constraints not satisfied at this assignment.
	pub fn unsatisfied(&self) -> Vec<&str> {
		self.constraints
			.iter()
			.filter(|(_, r)| !r.satisfied)
			.map(|(label, _)| label.as_str())
			.collect()
	}

	/// Energy recomputed from the bound model, matching it exactly.
	pub fn energy(&self) -> f64 {
		self.energy
	}

	/// The raw sampled bits, index-table order.
	pub fn bits(&self) -> &[bool] {
		&self.bits
	}
}

impl std::fmt::Debug for Solution {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_map()
			.entries(self.values.iter().map(|((name, indices), value)| {
				if indices.is_empty() {
					(name.clone(), value)
				} else {
					(format!("{}{:?}", name, indices), value)
				}
			}))
			.finish()
	}
}

impl std::ops::Index<&str> for Solution {
	type Output = Value;

	fn index(&self, name: &str) -> &Self::Output {
		self.get(name).expect("no such scalar variable")
	}
}
