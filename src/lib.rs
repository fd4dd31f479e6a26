//! quboc formulates combinatorial optimization problems as QUBO instances
//! from polynomial expressions with constraints and placeholders, and
//! decodes sampled bit assignments back into structured values.
//!
//! Expressions are built inside a [`Model`] session as a maximal-sharing
//! DAG, compiled once into a canonical coefficient map, and rebound to
//! different placeholder values without recompiling. The sampler itself is
//! an external collaborator: it receives the bound coefficient map (QUBO or
//! Ising form) and hands bit assignments back to the decoder.
//!
//! # Examples
//!
//! ## Simple objective
//! ```
//! # use quboc::Model;
//! # fn main() -> quboc::Result<()> {
//! // minimize 2xy - x - y over binary x, y
//! let mut model = Model::new();
//! let x = model.binary("x")?;
//! let y = model.binary("y")?;
//! let two = model.constant(2.0);
//! let xy = model.mul(x, y)?;
//! let quad = model.mul(two, xy)?;
//! let lin = model.add(x, y);
//! let objective = model.sub(quad, lin)?;
//! let compiled = model.compile(objective)?;
//! let bound = compiled.bind(&std::collections::HashMap::new())?;
//! assert_eq!(bound.decode(&[true, true])?.energy(), 0.0);
//! assert_eq!(bound.decode(&[true, false])?.energy(), -1.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Constraint with a placeholder weight
//! ```
//! # use quboc::{Comparator, Model};
//! # fn main() -> quboc::Result<()> {
//! let mut model = Model::new();
//! let a = model.binary("a")?;
//! let b = model.binary("b")?;
//! let w = model.placeholder("w")?;
//! let sum = model.add(a, b);
//! let one_hot = model.constrain(sum, Comparator::Eq, 1.0, "one-hot", w)?;
//! let objective = model.add(a, one_hot);
//! let compiled = model.compile(objective)?;
//! // compile once, rebind many times
//! let bound = compiled.bind(&vec![("w".to_string(), 5.0)].into_iter().collect())?;
//! let good = bound.decode(&[false, true])?;
//! assert!(good.constraint("one-hot").unwrap().satisfied);
//! assert_eq!(good.energy(), 0.0);
//! let bad = bound.decode(&[true, true])?;
//! assert!(!bad.constraint("one-hot").unwrap().satisfied);
//! assert_eq!(bad.energy(), 6.0);
//! # Ok(())
//! # }
//! ```

mod bound;
mod compiled;
mod error;
mod expr;
mod model;
mod poly;
mod registry;
mod solution;

pub use bound::BoundModel;
pub use compiled::CompiledModel;
pub use error::{DeclarationError, DecodeError, DomainError, Error, PlaceholderError, Result};
pub use expr::Expr;
pub use model::{Comparator, Model};
pub use registry::{IndexEntry, VarDomain, VarHandle};
pub use solution::{ConstraintReport, Solution, Value, VarKey};
