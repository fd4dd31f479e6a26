use crate::compiled::CompiledModel;
use crate::error::{DeclarationError, DomainError, Result};
use crate::expr::{Expr, Graph, NodeId};
use crate::registry::{Registry, VarDomain, VarHandle};
use serde::{Deserialize, Serialize};

/// Comparator of a constraint declaration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
	Eq,
	Le,
	Ge,
}

#[derive(Debug, Clone)]
pub(crate) struct ConstraintDecl {
	pub label: String,
	pub body: NodeId,
	pub comparator: Comparator,
	pub target: f64,
}

/// Compilation session: declares variables and placeholders, builds the
/// expression DAG and lowers it into a [`CompiledModel`]. Single-threaded
/// and synchronous; the session is consumed by [`Model::compile`] and only
/// the compiled model and its decode metadata persist.
#[derive(Debug, Default)]
pub struct Model {
	pub(crate) graph: Graph,
	pub(crate) registry: Registry,
	pub(crate) constraints: Vec<ConstraintDecl>,
}

impl Model {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declare a variable with a shape (`&[]` for a scalar). Re-declaring
	/// with the same domain and shape returns the existing handle.
	pub fn declare(&mut self, name: &str, domain: VarDomain, shape: &[usize]) -> Result<VarHandle> {
		self.registry.declare(name, domain, shape)
	}

	pub fn resolve(&self, name: &str) -> Result<VarHandle> {
		self.registry.resolve(name)
	}

	/// Reference a scalar variable.
	pub fn var(&mut self, handle: VarHandle) -> Result<Expr> {
		self.var_at(handle, &[])
	}

	/// Reference one element of a shaped variable.
	pub fn var_at(&mut self, handle: VarHandle, indices: &[usize]) -> Result<Expr> {
		let element = self.registry.element_offset(handle, indices)?;
		let decl = self.registry.decl(handle);
		let domain = decl.domain;
		let start = decl.first_index + element * decl.bits_per_element;
		let weights = decl.weights.clone();
		let id = match domain {
			VarDomain::Binary => self.graph.var(start),
			VarDomain::Spin => {
				// spin s = 2b - 1 over a binary surrogate sharing the index
				let two = self.graph.constant(2.0);
				let b = self.graph.var(start);
				let scaled = self.graph.mul(&[two, b])?;
				let minus_one = self.graph.constant(-1.0);
				self.graph.add(&[scaled, minus_one])
			}
			VarDomain::Integer { low, .. } => {
				let mut parts = Vec::with_capacity(weights.len() + 1);
				if low != 0 {
					parts.push(self.graph.constant(low as f64));
				}
				for (k, w) in weights.iter().enumerate() {
					let c = self.graph.constant(*w as f64);
					let b = self.graph.var(start + k);
					parts.push(self.graph.mul(&[c, b])?);
				}
				self.graph.add(&parts)
			}
		};
		Ok(Expr(id))
	}

	/// Declare and reference a scalar binary variable.
	pub fn binary(&mut self, name: &str) -> Result<Expr> {
		let handle = self.declare(name, VarDomain::Binary, &[])?;
		self.var(handle)
	}

	/// Declare and reference a scalar spin variable.
	pub fn spin(&mut self, name: &str) -> Result<Expr> {
		let handle = self.declare(name, VarDomain::Spin, &[])?;
		self.var(handle)
	}

	/// Declare and reference a scalar bounded integer variable.
	pub fn integer(&mut self, name: &str, low: i64, high: i64) -> Result<Expr> {
		let handle = self.declare(name, VarDomain::Integer { low, high }, &[])?;
		self.var(handle)
	}

	/// Named numeric slot resolved at bind time.
	pub fn placeholder(&mut self, name: &str) -> Result<Expr> {
		let id = self.registry.placeholder(name, None)?;
		Ok(Expr(self.graph.placeholder(id)))
	}

	pub fn placeholder_with_default(&mut self, name: &str, default: f64) -> Result<Expr> {
		let id = self.registry.placeholder(name, Some(default))?;
		Ok(Expr(self.graph.placeholder(id)))
	}

	pub fn constant(&mut self, value: f64) -> Expr {
		Expr(self.graph.constant(value))
	}

	pub fn add(&mut self, a: Expr, b: Expr) -> Expr {
		Expr(self.graph.add(&[a.0, b.0]))
	}

	pub fn sum(&mut self, terms: &[Expr]) -> Expr {
		let ids: Vec<NodeId> = terms.iter().map(|e| e.0).collect();
		Expr(self.graph.add(&ids))
	}

	pub fn neg(&mut self, a: Expr) -> Result<Expr> {
		Ok(Expr(self.graph.neg(a.0)?))
	}

	pub fn sub(&mut self, a: Expr, b: Expr) -> Result<Expr> {
		Ok(Expr(self.graph.sub(a.0, b.0)?))
	}

	pub fn mul(&mut self, a: Expr, b: Expr) -> Result<Expr> {
		Ok(Expr(self.graph.mul(&[a.0, b.0])?))
	}

	pub fn product(&mut self, factors: &[Expr]) -> Result<Expr> {
		let ids: Vec<NodeId> = factors.iter().map(|e| e.0).collect();
		Ok(Expr(self.graph.mul(&ids)?))
	}

	/// Small-integer power, expanded eagerly.
	pub fn pow(&mut self, a: Expr, exponent: u32) -> Result<Expr> {
		Ok(Expr(self.graph.pow(a.0, exponent)?))
	}

	/// Declare an equality constraint: penalty `weight * (body - target)^2`
	/// plus a decode-time checker. The returned expression must be added
	/// into the objective. Inequalities need caller-declared bounds; use
	/// [`Model::constrain_bounded`].
	pub fn constrain(
		&mut self,
		body: Expr,
		comparator: Comparator,
		target: f64,
		label: &str,
		weight: Expr,
	) -> Result<Expr> {
		self.check_label(label)?;
		match comparator {
			Comparator::Eq => {
				let penalty = self.penalty(body, None, target, weight)?;
				Ok(self.push_constraint(label, body, comparator, target, penalty))
			}
			Comparator::Le | Comparator::Ge => Err(DomainError::InvalidRange {
				label: label.to_string(),
				reason: "inequality constraints need caller-declared bounds".to_string(),
			}
			.into()),
		}
	}

	/// Declare a constraint whose body is known to stay within
	/// `bounds = (low, high)`. For `Le`/`Ge` a binary-encoded slack variable
	/// sized to the feasible range converts the inequality to an equality
	/// before squaring.
	pub fn constrain_bounded(
		&mut self,
		body: Expr,
		comparator: Comparator,
		target: f64,
		label: &str,
		weight: Expr,
		bounds: (i64, i64),
	) -> Result<Expr> {
		self.check_label(label)?;
		let (low, high) = bounds;
		if low > high {
			return Err(DomainError::InvalidRange {
				label: label.to_string(),
				reason: format!("empty bounds {}..={}", low, high),
			}
			.into());
		}
		if comparator == Comparator::Eq {
			let penalty = self.penalty(body, None, target, weight)?;
			return Ok(self.push_constraint(label, body, comparator, target, penalty));
		}
		if target.fract() != 0.0 {
			return Err(DomainError::InvalidRange {
				label: label.to_string(),
				reason: format!("target {} must be integral for a binary-encoded slack", target),
			}
			.into());
		}
		let range = match comparator {
			Comparator::Le => target as i64 - low,
			Comparator::Ge => high - target as i64,
			Comparator::Eq => unreachable!(),
		};
		if range < 0 {
			return Err(DomainError::InvalidRange {
				label: label.to_string(),
				reason: format!(
					"target {} lies outside the declared bounds {}..={}",
					target, low, high
				),
			}
			.into());
		}
		let mut slack_terms = Vec::new();
		for (index, w) in self.registry.slack(label, range as u64) {
			let c = self.graph.constant(w as f64);
			let b = self.graph.var(index);
			slack_terms.push(Expr(self.graph.mul(&[c, b])?));
		}
		let slack = self.sum(&slack_terms);
		let signed = match comparator {
			Comparator::Le => slack,
			Comparator::Ge => self.neg(slack)?,
			Comparator::Eq => unreachable!(),
		};
		let penalty = self.penalty(body, Some(signed), target, weight)?;
		Ok(self.push_constraint(label, body, comparator, target, penalty))
	}

	/// `weight * (body + slack - target)^2`
	fn penalty(
		&mut self,
		body: Expr,
		slack: Option<Expr>,
		target: f64,
		weight: Expr,
	) -> Result<Expr> {
		let mut residual = body;
		if let Some(slack) = slack {
			residual = self.add(residual, slack);
		}
		let t = self.constant(target);
		let diff = self.sub(residual, t)?;
		let squared = self.mul(diff, diff)?;
		self.mul(weight, squared)
	}

	fn check_label(&self, label: &str) -> Result<()> {
		if self.constraints.iter().any(|c| c.label == label) {
			return Err(DeclarationError::DuplicateDeclaration {
				name: label.to_string(),
			}
			.into());
		}
		Ok(())
	}

	fn push_constraint(
		&mut self,
		label: &str,
		body: Expr,
		comparator: Comparator,
		target: f64,
		penalty: Expr,
	) -> Expr {
		let decl = self.constraints.len();
		self.constraints.push(ConstraintDecl {
			label: label.to_string(),
			body: body.0,
			comparator,
			target,
		});
		Expr(self.graph.constraint(penalty.0, decl))
	}

	/// Lower `objective` (with any constraint expressions added into it)
	/// into the canonical coefficient map. Consumes the session; only the
	/// compiled model and decode metadata persist.
	pub fn compile(self, objective: Expr) -> Result<CompiledModel> {
		crate::compiled::lower(self, objective.0)
	}
}
