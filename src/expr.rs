use crate::error::{DomainError, Result};
use std::collections::HashMap;

/// Index of an interned node. Nodes only reference strictly smaller ids, so
/// the arena is acyclic by construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub(crate) u32);

/// Handle to an interned expression. Only meaningful together with the
/// `Model` that created it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Expr(pub(crate) NodeId);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
	Const(f64),
	Var(usize),
	Placeholder(usize),
	Add(Vec<NodeId>),
	Mul(Vec<NodeId>),
	Constraint { penalty: NodeId, decl: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
	Const(u64),
	Var(usize),
	Placeholder(usize),
	Add(Vec<NodeId>),
	Mul(Vec<NodeId>),
}

/// Arena of expression nodes with an interning memo keyed by
/// (operator, sorted child ids). Structurally identical construction calls
/// return the same node, so shared subterms compile once.
#[derive(Debug, Default)]
pub(crate) struct Graph {
	nodes: Vec<Node>,
	memo: HashMap<NodeKey, NodeId>,
}

impl Graph {
	pub fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.0 as usize]
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	fn intern(&mut self, key: NodeKey, node: Node) -> NodeId {
		if let Some(&id) = self.memo.get(&key) {
			return id;
		}
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(node);
		self.memo.insert(key, id);
		id
	}

	pub fn constant(&mut self, value: f64) -> NodeId {
		self.intern(NodeKey::Const(value.to_bits()), Node::Const(value))
	}

	pub fn var(&mut self, index: usize) -> NodeId {
		self.intern(NodeKey::Var(index), Node::Var(index))
	}

	pub fn placeholder(&mut self, id: usize) -> NodeId {
		self.intern(NodeKey::Placeholder(id), Node::Placeholder(id))
	}

	/// Constraint nodes are never shared: one per declaration.
	pub fn constraint(&mut self, penalty: NodeId, decl: usize) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(Node::Constraint { penalty, decl });
		id
	}

	/// Flatten nested sums, fold constants, drop zero addends.
	pub fn add(&mut self, children: &[NodeId]) -> NodeId {
		let mut folded = 0.0f64;
		let mut flat = Vec::with_capacity(children.len());
		for &child in children {
			match self.node(child) {
				Node::Add(inner) => {
					for &c in inner {
						if let Node::Const(v) = self.node(c) {
							folded += v;
						} else {
							flat.push(c);
						}
					}
				}
				Node::Const(v) => folded += v,
				_ => flat.push(child),
			}
		}
		if flat.is_empty() {
			return self.constant(folded);
		}
		if folded != 0.0 {
			let c = self.constant(folded);
			flat.push(c);
		}
		flat.sort_unstable();
		if flat.len() == 1 {
			return flat[0];
		}
		self.intern(NodeKey::Add(flat.clone()), Node::Add(flat))
	}

	/// Flatten nested products, fold constants, expand sums of products and
	/// collapse repeated binary factors. Fails `DegreeOverflow` when a
	/// monomial would hold three or more distinct variables.
	pub fn mul(&mut self, children: &[NodeId]) -> Result<NodeId> {
		let mut coeff = 1.0f64;
		let mut factors = Vec::new();
		let mut sums: Vec<Vec<NodeId>> = Vec::new();
		for &child in children {
			match self.node(child) {
				Node::Const(v) => coeff *= v,
				Node::Add(inner) => sums.push(inner.clone()),
				Node::Mul(inner) => {
					for &f in inner {
						if let Node::Const(v) = self.node(f) {
							coeff *= v;
						} else {
							factors.push(f);
						}
					}
				}
				Node::Var(_) | Node::Placeholder(_) => factors.push(child),
				Node::Constraint { .. } => {
					return Err(DomainError::DomainMismatch {
						name: "constraint".to_string(),
						reason: "constraint penalties cannot be multiplied".to_string(),
					}
					.into())
				}
			}
		}
		if coeff == 0.0 {
			return Ok(self.constant(0.0));
		}
		if !sums.is_empty() {
			// distribute: (a + b)(c + d) -> ac + ad + bc + bd
			let mut combos: Vec<Vec<NodeId>> = vec![Vec::new()];
			for sum in &sums {
				let mut next = Vec::with_capacity(combos.len() * sum.len());
				for prefix in &combos {
					for &term in sum {
						let mut combo = prefix.clone();
						combo.push(term);
						next.push(combo);
					}
				}
				combos = next;
			}
			let mut addends = Vec::with_capacity(combos.len());
			for combo in combos {
				let mut term = factors.clone();
				if coeff != 1.0 {
					let c = self.constant(coeff);
					term.push(c);
				}
				term.extend(combo);
				addends.push(self.mul(&term)?);
			}
			return Ok(self.add(&addends));
		}
		let mut vars = Vec::new();
		let mut rest = Vec::new();
		for f in factors {
			match self.node(f) {
				Node::Var(_) => vars.push(f),
				_ => rest.push(f),
			}
		}
		vars.sort_unstable();
		vars.dedup(); // x * x = x for binary bits
		let degree = vars.len();
		if degree > 2 {
			return Err(DomainError::DegreeOverflow { degree }.into());
		}
		let mut flat = vars;
		flat.extend(rest);
		if flat.is_empty() {
			return Ok(self.constant(coeff));
		}
		if coeff == 1.0 && flat.len() == 1 {
			return Ok(flat[0]);
		}
		if coeff != 1.0 {
			let c = self.constant(coeff);
			flat.push(c);
		}
		flat.sort_unstable();
		Ok(self.intern(NodeKey::Mul(flat.clone()), Node::Mul(flat)))
	}

	pub fn neg(&mut self, a: NodeId) -> Result<NodeId> {
		let minus_one = self.constant(-1.0);
		self.mul(&[minus_one, a])
	}

	pub fn sub(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
		let nb = self.neg(b)?;
		Ok(self.add(&[a, nb]))
	}

	pub fn pow(&mut self, a: NodeId, exponent: u32) -> Result<NodeId> {
		let mut out = self.constant(1.0);
		for _ in 0..exponent {
			out = self.mul(&[out, a])?;
		}
		Ok(out)
	}
}

#[test]
fn memo_dedup_test() {
	let mut g = Graph::default();
	let x = g.var(0);
	let y = g.var(1);
	assert_eq!(x, g.var(0));
	let xy = g.add(&[x, y]);
	assert_eq!(xy, g.add(&[y, x]));
	let m = g.mul(&[x, y]).unwrap();
	assert_eq!(m, g.mul(&[y, x]).unwrap());
	let before = g.len();
	g.add(&[x, y]);
	g.mul(&[x, y]).unwrap();
	assert_eq!(g.len(), before);
}

#[test]
fn constant_folding_test() {
	let mut g = Graph::default();
	let a = g.constant(2.0);
	let b = g.constant(3.0);
	let x = g.var(0);
	let s = g.add(&[a, b]);
	assert_eq!(*g.node(s), Node::Const(5.0));
	let p = g.mul(&[a, b]).unwrap();
	assert_eq!(*g.node(p), Node::Const(6.0));
	let zero = g.constant(0.0);
	assert_eq!(g.add(&[x, zero]), x);
	let z = g.mul(&[x, zero]).unwrap();
	assert_eq!(*g.node(z), Node::Const(0.0));
	let one = g.constant(1.0);
	assert_eq!(g.mul(&[x, one]).unwrap(), x);
}

#[test]
fn idempotence_test() {
	let mut g = Graph::default();
	let x = g.var(0);
	assert_eq!(g.mul(&[x, x]).unwrap(), x);
	let y = g.var(1);
	// x * x * y stays quadratic
	assert!(g.mul(&[x, x, y]).is_ok());
}

#[test]
fn sum_expansion_test() {
	let mut g = Graph::default();
	let x = g.var(0);
	let y = g.var(1);
	let sum = g.add(&[x, y]);
	// (x + y)^2 = x + y + 2xy
	let sq = g.mul(&[sum, sum]).unwrap();
	let xy = g.mul(&[x, y]).unwrap();
	match g.node(sq) {
		Node::Add(children) => {
			assert_eq!(children.len(), 4);
			assert!(children.contains(&x));
			assert!(children.contains(&y));
			assert_eq!(children.iter().filter(|&&c| c == xy).count(), 2);
		}
		o => panic!("expected flat sum, got {:?}", o),
	}
}

#[test]
fn degree_overflow_test() {
	let mut g = Graph::default();
	let x = g.var(0);
	let y = g.var(1);
	let z = g.var(2);
	let err = g.mul(&[x, y, z]).unwrap_err();
	assert_eq!(
		err,
		crate::error::Error::Domain(DomainError::DegreeOverflow { degree: 3 })
	);
	// expansion that would produce a cubic term fails too
	let sum = g.add(&[x, y]);
	let xy = g.mul(&[x, y]).unwrap();
	assert!(g.mul(&[sum, xy]).is_err());
}
