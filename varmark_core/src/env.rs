use std::collections::HashMap;
use std::fmt::Display;

use float_cmp::approx_eq;

use crate::expr::evaluate;
use crate::scanner::Definition;

/// The computed value bound to a variable name.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Value {
	/// A successfully evaluated numeric value.
	Number(f64),
	/// The raw, unevaluated expression text. Bound when evaluation fails so
	/// the document still shows something meaningful.
	Raw(String),
}

impl Eq for Value {}
impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Number(value), Value::Number(other_value)) => {
				approx_eq!(f64, *value, *other_value, ulps = 2)
			}
			(Value::Raw(value), Value::Raw(other_value)) => value == other_value,
			_ => false,
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			// Integral floats print without a decimal point, matching how the
			// host displays plain numbers (`5`, not `5.0`).
			Value::Number(number) => {
				if number.fract() == 0.0 && number.is_finite() && number.abs() < 1e15 {
					write!(f, "{}", *number as i64)
				} else {
					write!(f, "{number}")
				}
			}
			Value::Raw(raw) => write!(f, "{raw}"),
		}
	}
}

/// A diagnostic recorded when a definition's expression fails to evaluate.
/// These never abort a run; the failing variable falls back to its raw
/// expression text and later definitions evaluate normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalDiagnostic {
	/// The variable whose expression failed.
	pub name: String,
	/// The raw expression text.
	pub expression: String,
	/// Human-readable cause from the evaluator.
	pub message: String,
	/// Byte offset of the definition's opening `%%`.
	pub offset: usize,
}

/// A definition together with the value it resolved to in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDefinition {
	/// The variable name.
	pub name: String,
	/// The raw expression text.
	pub expression: String,
	/// The bound value (numeric, or the raw expression on failure).
	pub value: Value,
	/// Byte offset of the definition's opening `%%`.
	pub offset: usize,
}

/// The mapping from variable name to value for a single run. Built fresh
/// every run by folding the scanned definitions in text order; insertion
/// overwrites, giving sequential-assignment (last-wins) semantics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Environment {
	values: HashMap<String, Value>,
}

impl Environment {
	/// Evaluate every definition in scan order, accumulating the
	/// environment as it goes so each expression only sees strictly
	/// earlier definitions. Returns the final environment, the per-
	/// definition resolution record, and any evaluation diagnostics.
	pub fn from_definitions(
		definitions: &[Definition],
	) -> (Self, Vec<ResolvedDefinition>, Vec<EvalDiagnostic>) {
		let mut env = Self::default();
		let mut resolved = Vec::with_capacity(definitions.len());
		let mut diagnostics = Vec::new();

		for definition in definitions {
			let value = match evaluate(&definition.expression, &env) {
				Ok(number) => Value::Number(number),
				Err(error) => {
					tracing::warn!(
						name = %definition.name,
						expression = %definition.expression,
						%error,
						"expression evaluation failed; falling back to raw text"
					);
					diagnostics.push(EvalDiagnostic {
						name: definition.name.clone(),
						expression: definition.expression.clone(),
						message: error.to_string(),
						offset: definition.offset,
					});
					Value::Raw(definition.expression.clone())
				}
			};

			env.insert(definition.name.clone(), value.clone());
			resolved.push(ResolvedDefinition {
				name: definition.name.clone(),
				expression: definition.expression.clone(),
				value,
				offset: definition.offset,
			});
		}

		(env, resolved, diagnostics)
	}

	pub fn insert(&mut self, name: String, value: Value) {
		self.values.insert(name, value);
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.values.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.values.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}
