use crate::error::{DeclarationError, DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value domain of a decision variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarDomain {
	/// Takes values in {0, 1}.
	Binary,
	/// Takes values in {-1, +1}; lowered over a binary surrogate sharing
	/// the same matrix index.
	Spin,
	/// Takes integer values in `low..=high`, binary-encoded over
	/// `ceil(log2(high - low + 1))` bits.
	Integer { low: i64, high: i64 },
}

/// Handle to a declared variable. Only meaningful together with the
/// `Model` that produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VarHandle(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct VarDecl {
	pub name: String,
	pub domain: VarDomain,
	pub shape: Vec<usize>,
	pub first_index: usize,
	pub bits_per_element: usize,
	pub weights: Vec<i64>,
}

impl VarDecl {
	pub fn elements(&self) -> usize {
		self.shape.iter().product()
	}
}

/// One row of the index table: what a matrix index stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexEntry {
	/// One bit of a declared variable element.
	Element {
		name: String,
		indices: Vec<usize>,
		bit: usize,
		weight: i64,
	},
	/// One bit of an inequality slack variable.
	Slack {
		label: String,
		bit: usize,
		weight: i64,
	},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PhDecl {
	pub name: String,
	pub default: Option<f64>,
}

/// Append-only store of variables, placeholders and matrix indices.
#[derive(Debug, Default)]
pub(crate) struct Registry {
	pub vars: Vec<VarDecl>,
	by_name: HashMap<String, usize>,
	pub index_table: Vec<IndexEntry>,
	pub placeholders: Vec<PhDecl>,
	ph_by_name: HashMap<String, usize>,
}

impl Registry {
	pub fn declare(&mut self, name: &str, domain: VarDomain, shape: &[usize]) -> Result<VarHandle> {
		if let Some(&id) = self.by_name.get(name) {
			let decl = &self.vars[id];
			return if decl.domain == domain && decl.shape == shape {
				Ok(VarHandle(id))
			} else {
				Err(DeclarationError::DuplicateDeclaration {
					name: name.to_string(),
				}
				.into())
			};
		}
		let weights = match domain {
			VarDomain::Binary | VarDomain::Spin => vec![1],
			VarDomain::Integer { low, high } => {
				if low > high {
					return Err(DomainError::DomainMismatch {
						name: name.to_string(),
						reason: format!("empty integer range {}..={}", low, high),
					}
					.into());
				}
				bit_weights((high - low) as u64)
			}
		};
		let decl = VarDecl {
			name: name.to_string(),
			domain,
			shape: shape.to_vec(),
			first_index: self.index_table.len(),
			bits_per_element: weights.len(),
			weights,
		};
		for element in 0..decl.elements() {
			let indices = unflatten(element, shape);
			for (bit, weight) in decl.weights.iter().enumerate() {
				self.index_table.push(IndexEntry::Element {
					name: name.to_string(),
					indices: indices.clone(),
					bit,
					weight: *weight,
				});
			}
		}
		let id = self.vars.len();
		self.vars.push(decl);
		self.by_name.insert(name.to_string(), id);
		Ok(VarHandle(id))
	}

	pub fn resolve(&self, name: &str) -> Result<VarHandle> {
		self.by_name
			.get(name)
			.map(|&id| VarHandle(id))
			.ok_or_else(|| {
				DeclarationError::UnknownVariable {
					name: name.to_string(),
				}
				.into()
			})
	}

	pub fn decl(&self, handle: VarHandle) -> &VarDecl {
		&self.vars[handle.0]
	}

	/// Flat element offset of `indices` within the variable's shape.
	pub fn element_offset(&self, handle: VarHandle, indices: &[usize]) -> Result<usize> {
		let decl = &self.vars[handle.0];
		if indices.len() != decl.shape.len() {
			return Err(DomainError::DomainMismatch {
				name: decl.name.clone(),
				reason: format!(
					"expected {} indices, got {}",
					decl.shape.len(),
					indices.len()
				),
			}
			.into());
		}
		let mut flat = 0;
		for (i, (&idx, &dim)) in indices.iter().zip(decl.shape.iter()).enumerate() {
			if idx >= dim {
				return Err(DomainError::DomainMismatch {
					name: decl.name.clone(),
					reason: format!("index {} out of range in dimension {}", idx, i),
				}
				.into());
			}
			flat = flat * dim + idx;
		}
		Ok(flat)
	}

	pub fn placeholder(&mut self, name: &str, default: Option<f64>) -> Result<usize> {
		if let Some(&id) = self.ph_by_name.get(name) {
			return match (self.placeholders[id].default, default) {
				(_, None) => Ok(id),
				(None, Some(v)) => {
					self.placeholders[id].default = Some(v);
					Ok(id)
				}
				(Some(a), Some(b)) if a == b => Ok(id),
				_ => Err(DeclarationError::DuplicateDeclaration {
					name: name.to_string(),
				}
				.into()),
			};
		}
		let id = self.placeholders.len();
		self.placeholders.push(PhDecl {
			name: name.to_string(),
			default,
		});
		self.ph_by_name.insert(name.to_string(), id);
		Ok(id)
	}

	/// Allocate slack bits covering `0..=range` for an inequality constraint.
	pub fn slack(&mut self, label: &str, range: u64) -> Vec<(usize, i64)> {
		let mut out = Vec::new();
		for (bit, weight) in bit_weights(range).into_iter().enumerate() {
			let index = self.index_table.len();
			self.index_table.push(IndexEntry::Slack {
				label: label.to_string(),
				bit,
				weight,
			});
			out.push((index, weight));
		}
		out
	}
}

/// Bit weights 1, 2, 4, ..., remainder so that subset sums cover exactly
/// `0..=range`.
pub(crate) fn bit_weights(range: u64) -> Vec<i64> {
	let mut weights = Vec::new();
	let mut covered = 0u64;
	let mut w = 1u64;
	while covered + w <= range {
		weights.push(w as i64);
		covered += w;
		w *= 2;
	}
	if covered < range {
		weights.push((range - covered) as i64);
	}
	weights
}

pub(crate) fn unflatten(mut element: usize, shape: &[usize]) -> Vec<usize> {
	let mut indices = vec![0; shape.len()];
	for k in (0..shape.len()).rev() {
		indices[k] = element % shape[k];
		element /= shape[k];
	}
	indices
}

#[test]
fn bit_weights_test() {
	assert_eq!(bit_weights(0), Vec::<i64>::new());
	assert_eq!(bit_weights(1), vec![1]);
	assert_eq!(bit_weights(2), vec![1, 1]);
	assert_eq!(bit_weights(3), vec![1, 2]);
	assert_eq!(bit_weights(4), vec![1, 2, 1]);
	assert_eq!(bit_weights(7), vec![1, 2, 4]);
	for range in 0..40u64 {
		let ws = bit_weights(range);
		assert_eq!(ws.iter().sum::<i64>(), range as i64);
		// every value in 0..=range is reachable
		let mut reachable = vec![false; range as usize + 1];
		reachable[0] = true;
		for w in ws {
			for v in (0..reachable.len()).rev() {
				if reachable[v] && v + (w as usize) < reachable.len() {
					reachable[v + w as usize] = true;
				}
			}
		}
		assert!(reachable.iter().all(|r| *r), "range {}", range);
	}
}

#[test]
fn declare_test() {
	let mut reg = Registry::default();
	let a = reg.declare("a", VarDomain::Binary, &[]).unwrap();
	let a2 = reg.declare("a", VarDomain::Binary, &[]).unwrap();
	assert_eq!(a, a2);
	assert!(reg.declare("a", VarDomain::Spin, &[]).is_err());
	let m = reg.declare("m", VarDomain::Binary, &[2, 3]).unwrap();
	assert_eq!(reg.decl(m).elements(), 6);
	assert_eq!(reg.element_offset(m, &[1, 2]).unwrap(), 5);
	assert!(reg.element_offset(m, &[2, 0]).is_err());
	assert!(reg.element_offset(m, &[0]).is_err());
	assert_eq!(reg.index_table.len(), 7);
	assert!(reg.resolve("m").is_ok());
	assert!(reg.resolve("q").is_err());
}

#[test]
fn integer_declare_test() {
	let mut reg = Registry::default();
	let v = reg
		.declare("v", VarDomain::Integer { low: 2, high: 9 }, &[])
		.unwrap();
	assert_eq!(reg.decl(v).weights, vec![1, 2, 4]);
	assert_eq!(reg.index_table.len(), 3);
	assert!(reg
		.declare("w", VarDomain::Integer { low: 3, high: 1 }, &[])
		.is_err());
}
