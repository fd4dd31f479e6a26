use crate::bound::{BoundChecker, BoundModel, NumericQuad};
use crate::error::{PlaceholderError, Result};
use crate::expr::{Graph, Node, NodeId};
use crate::model::{Comparator, ConstraintDecl, Model};
use crate::poly::{Coeff, Poly};
use crate::registry::{IndexEntry, PhDecl, VarDecl};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Quadratic coefficient entries whose values may still depend on
/// placeholders. Entries are sorted by index and hold one summed
/// coefficient per key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct SymbolicQuad {
	pub offset: Coeff,
	pub linear: Vec<(usize, Coeff)>,
	pub quadratic: Vec<((usize, usize), Coeff)>,
}

impl SymbolicQuad {
	fn from_poly(poly: Poly) -> Self {
		Self {
			offset: poly.offset,
			linear: poly
				.linear
				.into_iter()
				.filter(|(_, c)| !c.is_zero())
				.collect(),
			quadratic: poly
				.quadratic
				.into_iter()
				.filter(|(_, c)| !c.is_zero())
				.collect(),
		}
	}

	fn constant_part(&self) -> NumericQuad {
		NumericQuad {
			offset: self.offset.constant_part(),
			linear: self
				.linear
				.iter()
				.map(|(i, c)| (*i, c.constant_part()))
				.collect(),
			quadratic: self
				.quadratic
				.iter()
				.map(|(p, c)| (*p, c.constant_part()))
				.collect(),
		}
	}

	fn eval(&self, values: &[f64]) -> NumericQuad {
		NumericQuad {
			offset: self.offset.eval(values),
			linear: self.linear.iter().map(|(i, c)| (*i, c.eval(values))).collect(),
			quadratic: self
				.quadratic
				.iter()
				.map(|(p, c)| (*p, c.eval(values)))
				.collect(),
		}
	}

	fn collect_placeholders(&self, out: &mut BTreeSet<usize>) {
		self.offset.collect_placeholders(out);
		for (_, c) in &self.linear {
			c.collect_placeholders(out);
		}
		for (_, c) in &self.quadratic {
			c.collect_placeholders(out);
		}
	}
}

/// Position of one coefficient entry inside a [`SymbolicQuad`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub(crate) enum EntryRef {
	Offset,
	Linear(usize),
	Quadratic(usize),
}

/// Decode-time checker for one constraint declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Checker {
	pub label: String,
	pub comparator: Comparator,
	pub target: f64,
	pub body: SymbolicQuad,
}

/// Immutable result of lowering: the canonical coefficient map with
/// symbolic placeholder entries, the index table and the constraint
/// checkers. Safe to share across threads; [`CompiledModel::bind`] writes
/// into a fresh [`BoundModel`] per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledModel {
	pub(crate) terms: SymbolicQuad,
	pub(crate) base: NumericQuad,
	pub(crate) index_table: Vec<IndexEntry>,
	pub(crate) var_decls: Vec<VarDecl>,
	pub(crate) placeholders: Vec<PhDecl>,
	pub(crate) deps: Vec<(usize, Vec<EntryRef>)>,
	pub(crate) checkers: Vec<Checker>,
}

pub(crate) fn lower(model: Model, root: NodeId) -> Result<CompiledModel> {
	let Model {
		graph,
		registry,
		constraints,
	} = model;
	let mut memo: Vec<Option<Poly>> = vec![None; graph.len()];
	let mut bodies: Vec<(usize, Poly)> = Vec::new();
	let total = visit(&graph, &constraints, &mut memo, &mut bodies, root)?;
	let terms = SymbolicQuad::from_poly(total);

	bodies.sort_by_key(|(decl, _)| *decl);
	let checkers = bodies
		.into_iter()
		.map(|(decl, poly)| {
			let ConstraintDecl {
				label,
				comparator,
				target,
				..
			} = constraints[decl].clone();
			Checker {
				label,
				comparator,
				target,
				body: SymbolicQuad::from_poly(poly),
			}
		})
		.collect::<Vec<_>>();

	let mut deps: BTreeMap<usize, Vec<EntryRef>> = BTreeMap::new();
	let record = |coeff: &Coeff, entry: EntryRef, deps: &mut BTreeMap<usize, Vec<EntryRef>>| {
		let mut phs = BTreeSet::new();
		coeff.collect_placeholders(&mut phs);
		for ph in phs {
			deps.entry(ph).or_default().push(entry);
		}
	};
	record(&terms.offset, EntryRef::Offset, &mut deps);
	for (pos, (_, coeff)) in terms.linear.iter().enumerate() {
		record(coeff, EntryRef::Linear(pos), &mut deps);
	}
	for (pos, (_, coeff)) in terms.quadratic.iter().enumerate() {
		record(coeff, EntryRef::Quadratic(pos), &mut deps);
	}

	let base = terms.constant_part();
	debug!(
		indices = registry.index_table.len(),
		linear = terms.linear.len(),
		quadratic = terms.quadratic.len(),
		checkers = checkers.len(),
		nodes = graph.len(),
		"lowered model"
	);
	Ok(CompiledModel {
		terms,
		base,
		index_table: registry.index_table,
		var_decls: registry.vars,
		placeholders: registry.placeholders,
		deps: deps.into_iter().collect(),
		checkers,
	})
}

/// Depth-first lowering, memoized by node identity so shared subtrees are
/// visited once. Summation order is fixed by index (BTreeMap) independent
/// of traversal scheduling.
fn visit(
	graph: &Graph,
	constraints: &[ConstraintDecl],
	memo: &mut Vec<Option<Poly>>,
	bodies: &mut Vec<(usize, Poly)>,
	id: NodeId,
) -> Result<Poly> {
	if let Some(poly) = &memo[id.0 as usize] {
		return Ok(poly.clone());
	}
	let poly = match graph.node(id) {
		Node::Const(v) => Poly::from_coeff(Coeff::constant(*v)),
		Node::Var(index) => Poly::from_var(*index),
		Node::Placeholder(ph) => Poly::from_coeff(Coeff::placeholder(*ph)),
		Node::Add(children) => {
			let mut acc = Poly::default();
			for &child in children {
				let term = visit(graph, constraints, memo, bodies, child)?;
				acc.add_assign(&term);
			}
			acc
		}
		Node::Mul(children) => {
			let mut acc = Poly::from_coeff(Coeff::constant(1.0));
			for &child in children {
				let factor = visit(graph, constraints, memo, bodies, child)?;
				acc = acc.mul(&factor)?;
			}
			acc
		}
		Node::Constraint { penalty, decl } => {
			let (penalty, decl) = (*penalty, *decl);
			let body = visit(graph, constraints, memo, bodies, constraints[decl].body)?;
			bodies.push((decl, body));
			visit(graph, constraints, memo, bodies, penalty)?
		}
	};
	memo[id.0 as usize] = Some(poly.clone());
	Ok(poly)
}

impl CompiledModel {
	pub fn num_indices(&self) -> usize {
		self.index_table.len()
	}

	pub fn index_table(&self) -> &[IndexEntry] {
		&self.index_table
	}

	pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
		self.placeholders.iter().map(|p| p.name.as_str())
	}

	/// Re-evaluate placeholder-dependent coefficient entries against
	/// concrete values and return an independent numeric model. May be
	/// called repeatedly with different values.
	pub fn bind(&self, values: &HashMap<String, f64>) -> Result<BoundModel> {
		for name in values.keys() {
			if !self.placeholders.iter().any(|p| &p.name == name) {
				return Err(PlaceholderError::UnknownPlaceholder {
					name: name.clone(),
				}
				.into());
			}
		}
		let mut used: BTreeSet<usize> = self.deps.iter().map(|(ph, _)| *ph).collect();
		for checker in &self.checkers {
			checker.body.collect_placeholders(&mut used);
		}
		let mut ph_values = vec![0.0f64; self.placeholders.len()];
		for &ph in &used {
			let decl = &self.placeholders[ph];
			ph_values[ph] = match values.get(&decl.name).copied().or(decl.default) {
				Some(v) => v,
				None => {
					return Err(PlaceholderError::MissingPlaceholder {
						name: decl.name.clone(),
					}
					.into())
				}
			};
		}
		let mut terms = self.base.clone();
		let mut touched: BTreeSet<EntryRef> = BTreeSet::new();
		for (_, refs) in &self.deps {
			touched.extend(refs.iter().copied());
		}
		for entry in &touched {
			match entry {
				EntryRef::Offset => terms.offset = self.terms.offset.eval(&ph_values),
				EntryRef::Linear(pos) => {
					terms.linear[*pos].1 = self.terms.linear[*pos].1.eval(&ph_values)
				}
				EntryRef::Quadratic(pos) => {
					terms.quadratic[*pos].1 = self.terms.quadratic[*pos].1.eval(&ph_values)
				}
			}
		}
		let checkers = self
			.checkers
			.iter()
			.map(|c| BoundChecker {
				label: c.label.clone(),
				comparator: c.comparator,
				target: c.target,
				body: c.body.eval(&ph_values),
			})
			.collect();
		debug!(
			placeholders = used.len(),
			rebound = touched.len(),
			"bound placeholder values"
		);
		Ok(BoundModel {
			terms,
			index_table: self.index_table.clone(),
			var_decls: self.var_decls.clone(),
			checkers,
		})
	}
}
