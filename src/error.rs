use thiserror::Error;

/// Errors raised while declaring variables, placeholders or constraints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeclarationError {
	#[error("`{name}` is already declared with a different domain, shape or default")]
	DuplicateDeclaration { name: String },
	#[error("unknown variable `{name}`")]
	UnknownVariable { name: String },
}

/// Errors raised while building or lowering expressions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
	#[error("term of degree {degree} exceeds the quadratic limit")]
	DegreeOverflow { degree: usize },
	#[error("invalid slack range for constraint `{label}`: {reason}")]
	InvalidRange { label: String, reason: String },
	#[error("domain mismatch for `{name}`: {reason}")]
	DomainMismatch { name: String, reason: String },
}

/// Errors raised while binding placeholder values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaceholderError {
	#[error("placeholder `{name}` has neither a bound value nor a default")]
	MissingPlaceholder { name: String },
	#[error("`{name}` is not a placeholder of this model")]
	UnknownPlaceholder { name: String },
}

/// Errors raised while decoding sampled bit assignments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
	#[error("bit vector has length {got} but the model has {expected} indices")]
	LengthMismatch { expected: usize, got: usize },
	#[error("reported energy {reported} does not match recomputed energy {computed}")]
	EnergyMismatch { reported: f64, computed: f64 },
	#[error("recomputed energy {computed} is not finite")]
	NonFiniteEnergy { computed: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
	#[error(transparent)]
	Declaration(#[from] DeclarationError),
	#[error(transparent)]
	Domain(#[from] DomainError),
	#[error(transparent)]
	Placeholder(#[from] PlaceholderError),
	#[error(transparent)]
	Decode(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
