use quboc::{
	Comparator, DeclarationError, DecodeError, DomainError, Error, IndexEntry, Model,
	PlaceholderError,
};
use std::collections::HashMap;

fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
	pairs
		.iter()
		.map(|(name, value)| (name.to_string(), *value))
		.collect()
}

#[test]
fn eq_constraint_test() {
	// a + b == 1 under a placeholder weight
	let mut model = Model::new();
	let a = model.binary("a").unwrap();
	let b = model.binary("b").unwrap();
	let w = model.placeholder("w").unwrap();
	let sum = model.add(a, b);
	let objective = model
		.constrain(sum, Comparator::Eq, 1.0, "one-hot", w)
		.unwrap();
	let compiled = model.compile(objective).unwrap();
	let bound = compiled.bind(&values(&[("w", 5.0)])).unwrap();

	let good = bound.decode(&[true, false]).unwrap();
	let report = good.constraint("one-hot").unwrap();
	assert!(report.satisfied);
	assert_eq!(report.violation, 0.0);
	assert_eq!(good.energy(), 0.0);

	let bad = bound.decode(&[true, true]).unwrap();
	let report = bad.constraint("one-hot").unwrap();
	assert!(!report.satisfied);
	assert_eq!(report.violation, 1.0);
	// extra energy equals the weight
	assert_eq!(bad.energy(), 5.0);
	assert_eq!(bad.unsatisfied(), vec!["one-hot"]);
}

#[test]
fn placeholder_rebind_test() {
	// rebinding the weight scales only the constraint's entries
	let mut model = Model::new();
	let a = model.binary("a").unwrap();
	let b = model.binary("b").unwrap();
	let w = model.placeholder("w").unwrap();
	let three = model.constant(3.0);
	let obj = model.mul(three, a).unwrap();
	let sum = model.add(a, b);
	let pen = model
		.constrain(sum, Comparator::Eq, 1.0, "one-hot", w)
		.unwrap();
	let objective = model.add(obj, pen);
	let compiled = model.compile(objective).unwrap();

	// w * (a + b - 1)^2 = w * (2ab - a - b + 1)
	let five = compiled.bind(&values(&[("w", 5.0)])).unwrap();
	assert_eq!(five.offset(), 5.0);
	assert_eq!(five.linear(), &[(0, -2.0), (1, -5.0)]);
	assert_eq!(five.quadratic(), &[((0, 1), 10.0)]);

	let ten = compiled.bind(&values(&[("w", 10.0)])).unwrap();
	assert_eq!(ten.offset(), 10.0);
	assert_eq!(ten.linear(), &[(0, -7.0), (1, -10.0)]);
	assert_eq!(ten.quadratic(), &[((0, 1), 20.0)]);
}

#[test]
fn le_constraint_test() {
	// x + y <= 1 with body bounds (0, 2): one slack bit
	let mut model = Model::new();
	let x = model.binary("x").unwrap();
	let y = model.binary("y").unwrap();
	let weight = model.constant(1.0);
	let sum = model.add(x, y);
	let objective = model
		.constrain_bounded(sum, Comparator::Le, 1.0, "cap", weight, (0, 2))
		.unwrap();
	let compiled = model.compile(objective).unwrap();
	assert_eq!(compiled.num_indices(), 3);
	assert!(matches!(
		compiled.index_table()[2],
		IndexEntry::Slack { weight: 1, .. }
	));
	let bound = compiled.bind(&HashMap::new()).unwrap();

	// feasible, slack absorbs the gap
	let sol = bound.decode(&[true, false, false]).unwrap();
	assert!(sol.constraint("cap").unwrap().satisfied);
	assert_eq!(sol.energy(), 0.0);
	let sol = bound.decode(&[false, false, true]).unwrap();
	assert!(sol.constraint("cap").unwrap().satisfied);
	assert_eq!(sol.energy(), 0.0);

	// infeasible regardless of slack
	let sol = bound.decode(&[true, true, false]).unwrap();
	let report = sol.constraint("cap").unwrap();
	assert!(!report.satisfied);
	assert_eq!(report.violation, 1.0);
	assert_eq!(sol.energy(), 1.0);

	// slack bits never show up as decoded variables
	assert_eq!(sol.values().len(), 2);
}

#[test]
fn ge_constraint_test() {
	// x + y >= 1 with body bounds (0, 2)
	let mut model = Model::new();
	let x = model.binary("x").unwrap();
	let y = model.binary("y").unwrap();
	let weight = model.constant(2.0);
	let sum = model.add(x, y);
	let objective = model
		.constrain_bounded(sum, Comparator::Ge, 1.0, "cover", weight, (0, 2))
		.unwrap();
	let bound = model
		.compile(objective)
		.unwrap()
		.bind(&HashMap::new())
		.unwrap();
	assert_eq!(bound.num_indices(), 3);

	let sol = bound.decode(&[false, false, false]).unwrap();
	let report = sol.constraint("cover").unwrap();
	assert!(!report.satisfied);
	assert_eq!(report.violation, 1.0);
	// 2 * (0 - 0 - 1)^2
	assert_eq!(sol.energy(), 2.0);

	let sol = bound.decode(&[true, true, true]).unwrap();
	assert!(sol.constraint("cover").unwrap().satisfied);
	assert_eq!(sol.energy(), 0.0);
}

#[test]
fn invalid_range_test() {
	let mut model = Model::new();
	let x = model.binary("x").unwrap();
	let w = model.constant(1.0);
	// no bounds supplied
	assert!(matches!(
		model.constrain(x, Comparator::Le, 1.0, "c1", w).unwrap_err(),
		Error::Domain(DomainError::InvalidRange { .. })
	));
	// empty bounds
	assert!(matches!(
		model
			.constrain_bounded(x, Comparator::Le, 1.0, "c2", w, (2, 1))
			.unwrap_err(),
		Error::Domain(DomainError::InvalidRange { .. })
	));
	// fractional target cannot be slack-encoded
	assert!(matches!(
		model
			.constrain_bounded(x, Comparator::Le, 0.5, "c3", w, (0, 1))
			.unwrap_err(),
		Error::Domain(DomainError::InvalidRange { .. })
	));
	// target outside the declared bounds
	assert!(matches!(
		model
			.constrain_bounded(x, Comparator::Le, -1.0, "c4", w, (0, 1))
			.unwrap_err(),
		Error::Domain(DomainError::InvalidRange { .. })
	));
}

#[test]
fn duplicate_label_test() {
	let mut model = Model::new();
	let x = model.binary("x").unwrap();
	let w = model.constant(1.0);
	model.constrain(x, Comparator::Eq, 1.0, "c", w).unwrap();
	assert!(matches!(
		model.constrain(x, Comparator::Eq, 0.0, "c", w).unwrap_err(),
		Error::Declaration(DeclarationError::DuplicateDeclaration { .. })
	));
}

#[test]
fn placeholder_binding_test() {
	let mut model = Model::new();
	let x = model.binary("x").unwrap();
	let w = model.placeholder("w").unwrap();
	let objective = model.mul(w, x).unwrap();
	let compiled = model.compile(objective).unwrap();
	assert!(matches!(
		compiled.bind(&HashMap::new()).unwrap_err(),
		Error::Placeholder(PlaceholderError::MissingPlaceholder { .. })
	));
	assert!(matches!(
		compiled.bind(&values(&[("typo", 1.0)])).unwrap_err(),
		Error::Placeholder(PlaceholderError::UnknownPlaceholder { .. })
	));
	assert_eq!(
		compiled.bind(&values(&[("w", 4.0)])).unwrap().linear(),
		&[(0, 4.0)]
	);
}

#[test]
fn placeholder_default_test() {
	let mut model = Model::new();
	let x = model.binary("x").unwrap();
	let w = model.placeholder_with_default("w", 2.0).unwrap();
	let objective = model.mul(w, x).unwrap();
	let compiled = model.compile(objective).unwrap();
	// default applies when no value is supplied
	assert_eq!(
		compiled.bind(&HashMap::new()).unwrap().linear(),
		&[(0, 2.0)]
	);
	// an explicit value overrides the default
	assert_eq!(
		compiled.bind(&values(&[("w", 7.0)])).unwrap().linear(),
		&[(0, 7.0)]
	);
}

#[test]
fn decode_error_test() {
	let mut model = Model::new();
	let x = model.binary("x").unwrap();
	let bound = model.compile(x).unwrap().bind(&HashMap::new()).unwrap();
	assert!(matches!(
		bound.decode(&[true, false]).unwrap_err(),
		Error::Decode(DecodeError::LengthMismatch {
			expected: 1,
			got: 2
		})
	));
	assert!(bound.decode_with_energy(&[true], 1.0).is_ok());
	assert!(matches!(
		bound.decode_with_energy(&[true], 2.0).unwrap_err(),
		Error::Decode(DecodeError::EnergyMismatch { .. })
	));
}

#[test]
fn weight_expression_test() {
	// the penalty weight may itself be a placeholder product
	let mut model = Model::new();
	let a = model.binary("a").unwrap();
	let p = model.placeholder("p").unwrap();
	let q = model.placeholder("q").unwrap();
	let weight = model.mul(p, q).unwrap();
	let objective = model
		.constrain(a, Comparator::Eq, 1.0, "pin", weight)
		.unwrap();
	let compiled = model.compile(objective).unwrap();
	let bound = compiled.bind(&values(&[("p", 2.0), ("q", 3.0)])).unwrap();
	// 6 * (a - 1)^2 = 6 - 6a
	assert_eq!(bound.offset(), 6.0);
	assert_eq!(bound.linear(), &[(0, -6.0)]);
	assert_eq!(bound.decode(&[true]).unwrap().energy(), 0.0);
}
