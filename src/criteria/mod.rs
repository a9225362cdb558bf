//! Criteria expression engine
//!
//! Compiles and evaluates the boolean membership predicate a batch uses to
//! decide which instances belong to it. An expression is evaluated against a
//! single instance snapshot (a JSON projection of the instance's attributes,
//! see [`crate::domain::Instance::criteria_snapshot`]). Evaluation is pure:
//! the same expression and snapshot always produce the same result.

mod eval;
mod lexer;
mod parser;

use serde_json::Value as Json;
use thiserror::Error;

pub use eval::Value;

/// Errors from compiling or evaluating a criteria expression
#[derive(Debug, Error)]
pub enum ExpressionError {
	#[error("parse error at offset {offset}: {message}")]
	Parse { offset: usize, message: String },

	/// The expression referenced an attribute the snapshot does not expose
	#[error("unknown attribute {0:?}")]
	UnknownAttribute(String),

	/// Operands or index out of range for the operator applied to them
	#[error("type error: {0}")]
	TypeMismatch(String),

	/// Wrong arity or argument type for a built-in function
	#[error("invalid call to {function}: {message}")]
	InvalidFunctionCall { function: String, message: String },

	#[error("invalid regular expression {pattern:?}: {message}")]
	Regex { pattern: String, message: String },
}

/// A parsed membership predicate, reusable across many snapshots
#[derive(Debug, Clone)]
pub struct CompiledExpression {
	source: String,
	root: parser::Expr,
}

impl CompiledExpression {
	/// Parse an expression without evaluating it. Registries call this to
	/// reject malformed criteria at batch create/update time.
	pub fn parse(expression: &str) -> Result<Self, ExpressionError> {
		let tokens = lexer::tokenize(expression)?;
		let root = parser::parse(&tokens)?;
		Ok(Self {
			source: expression.to_string(),
			root,
		})
	}

	/// Evaluate against one instance snapshot. The result must be boolean;
	/// an expression yielding any other type is a type error.
	pub fn matches(&self, snapshot: &Json) -> Result<bool, ExpressionError> {
		match eval::evaluate(&self.root, snapshot)? {
			Value::Bool(b) => Ok(b),
			other => Err(ExpressionError::TypeMismatch(format!(
				"expression {:?} evaluated to {}, expected a boolean",
				self.source,
				other.type_name()
			))),
		}
	}

	pub fn source(&self) -> &str {
		&self.source
	}
}

/// One-shot compile and evaluate
pub fn evaluate(expression: &str, snapshot: &Json) -> Result<bool, ExpressionError> {
	CompiledExpression::parse(expression)?.matches(snapshot)
}
