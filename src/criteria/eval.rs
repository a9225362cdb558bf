//! Evaluation of a parsed criteria expression against one instance snapshot

use regex::Regex;
use serde_json::{Map, Value as Json};

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::ExpressionError;

/// Runtime value produced while walking an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Bool(bool),
	Int(i64),
	Str(String),
	List(Vec<Value>),
	Record(Map<String, Json>),
}

impl Value {
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Bool(_) => "boolean",
			Value::Int(_) => "integer",
			Value::Str(_) => "string",
			Value::List(_) => "list",
			Value::Record(_) => "record",
		}
	}

	fn from_json(value: &Json) -> Result<Self, ExpressionError> {
		match value {
			Json::Bool(b) => Ok(Value::Bool(*b)),
			Json::Number(n) => n.as_i64().map(Value::Int).ok_or_else(|| {
				ExpressionError::TypeMismatch(format!("non-integer number {n} in snapshot"))
			}),
			Json::String(s) => Ok(Value::Str(s.clone())),
			Json::Array(items) => Ok(Value::List(
				items.iter().map(Value::from_json).collect::<Result<_, _>>()?,
			)),
			Json::Object(fields) => Ok(Value::Record(fields.clone())),
			Json::Null => Err(ExpressionError::TypeMismatch(
				"null value in snapshot".to_string(),
			)),
		}
	}
}

fn type_error(message: impl Into<String>) -> ExpressionError {
	ExpressionError::TypeMismatch(message.into())
}

pub(super) fn evaluate(expr: &Expr, snapshot: &Json) -> Result<Value, ExpressionError> {
	match expr {
		Expr::Bool(b) => Ok(Value::Bool(*b)),
		Expr::Int(n) => Ok(Value::Int(*n)),
		Expr::Str(s) => Ok(Value::Str(s.clone())),
		Expr::List(items) => Ok(Value::List(
			items
				.iter()
				.map(|item| evaluate(item, snapshot))
				.collect::<Result<_, _>>()?,
		)),
		Expr::Ident(name) => {
			let root = snapshot
				.as_object()
				.ok_or_else(|| type_error("snapshot is not a record"))?;
			let field = root
				.get(name)
				.ok_or_else(|| ExpressionError::UnknownAttribute(name.clone()))?;
			Value::from_json(field)
		}
		Expr::Field(base, name) => match evaluate(base, snapshot)? {
			Value::Record(fields) => {
				let field = fields
					.get(name)
					.ok_or_else(|| ExpressionError::UnknownAttribute(name.clone()))?;
				Value::from_json(field)
			}
			other => Err(type_error(format!(
				"cannot access field {name:?} of a {}",
				other.type_name()
			))),
		},
		Expr::Index(base, index) => {
			let base = evaluate(base, snapshot)?;
			let index = match evaluate(index, snapshot)? {
				Value::Int(n) => n,
				other => {
					return Err(type_error(format!(
						"sequence index must be an integer, got {}",
						other.type_name()
					)))
				}
			};
			match base {
				Value::List(items) => {
					if index < 0 || index as usize >= items.len() {
						return Err(type_error(format!(
							"index {index} out of range for sequence of length {}",
							items.len()
						)));
					}
					Ok(items[index as usize].clone())
				}
				other => Err(type_error(format!(
					"cannot index into a {}",
					other.type_name()
				))),
			}
		}
		Expr::Call(name, args) => call(name, args, snapshot),
		Expr::Unary(op, operand) => {
			let operand = evaluate(operand, snapshot)?;
			match (op, operand) {
				(UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
				(UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
				(UnaryOp::Not, other) => Err(type_error(format!(
					"\"!\" requires a boolean, got {}",
					other.type_name()
				))),
				(UnaryOp::Neg, other) => Err(type_error(format!(
					"unary \"-\" requires an integer, got {}",
					other.type_name()
				))),
			}
		}
		Expr::Binary(op, left, right) => binary(*op, left, right, snapshot),
	}
}

fn binary(
	op: BinaryOp,
	left: &Expr,
	right: &Expr,
	snapshot: &Json,
) -> Result<Value, ExpressionError> {
	// Boolean connectives short-circuit.
	if matches!(op, BinaryOp::And | BinaryOp::Or) {
		let l = bool_operand(op, evaluate(left, snapshot)?)?;
		return match (op, l) {
			(BinaryOp::And, false) => Ok(Value::Bool(false)),
			(BinaryOp::Or, true) => Ok(Value::Bool(true)),
			_ => {
				let r = bool_operand(op, evaluate(right, snapshot)?)?;
				Ok(Value::Bool(r))
			}
		};
	}

	let l = evaluate(left, snapshot)?;
	let r = evaluate(right, snapshot)?;
	match op {
		BinaryOp::Eq => Ok(Value::Bool(values_equal(&l, &r)?)),
		BinaryOp::Ne => Ok(Value::Bool(!values_equal(&l, &r)?)),
		BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
			let (a, b) = int_operands(op, l, r)?;
			Ok(Value::Bool(match op {
				BinaryOp::Lt => a < b,
				BinaryOp::Le => a <= b,
				BinaryOp::Gt => a > b,
				BinaryOp::Ge => a >= b,
				_ => unreachable!(),
			}))
		}
		BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
			let (a, b) = int_operands(op, l, r)?;
			match op {
				BinaryOp::Add => Ok(Value::Int(a.wrapping_add(b))),
				BinaryOp::Sub => Ok(Value::Int(a.wrapping_sub(b))),
				BinaryOp::Mul => Ok(Value::Int(a.wrapping_mul(b))),
				BinaryOp::Div => {
					if b == 0 {
						Err(type_error("division by zero"))
					} else {
						Ok(Value::Int(a / b))
					}
				}
				BinaryOp::Rem => {
					if b == 0 {
						Err(type_error("division by zero"))
					} else {
						Ok(Value::Int(a % b))
					}
				}
				_ => unreachable!(),
			}
		}
		BinaryOp::In => match r {
			Value::List(items) => {
				for item in &items {
					if values_equal(&l, item)? {
						return Ok(Value::Bool(true));
					}
				}
				Ok(Value::Bool(false))
			}
			other => Err(type_error(format!(
				"\"in\" requires a list on the right, got {}",
				other.type_name()
			))),
		},
		BinaryOp::Contains | BinaryOp::StartsWith | BinaryOp::EndsWith => {
			let (a, b) = str_operands(op, l, r)?;
			Ok(Value::Bool(match op {
				BinaryOp::Contains => a.contains(&b),
				BinaryOp::StartsWith => a.starts_with(&b),
				BinaryOp::EndsWith => a.ends_with(&b),
				_ => unreachable!(),
			}))
		}
		BinaryOp::Matches => {
			let (subject, pattern) = str_operands(op, l, r)?;
			let regex = Regex::new(&pattern).map_err(|e| ExpressionError::Regex {
				pattern: pattern.clone(),
				message: e.to_string(),
			})?;
			Ok(Value::Bool(regex.is_match(&subject)))
		}
		BinaryOp::And | BinaryOp::Or => unreachable!(),
	}
}

fn bool_operand(op: BinaryOp, value: Value) -> Result<bool, ExpressionError> {
	match value {
		Value::Bool(b) => Ok(b),
		other => Err(type_error(format!(
			"{} requires boolean operands, got {}",
			op_name(op),
			other.type_name()
		))),
	}
}

fn int_operands(op: BinaryOp, l: Value, r: Value) -> Result<(i64, i64), ExpressionError> {
	match (l, r) {
		(Value::Int(a), Value::Int(b)) => Ok((a, b)),
		(l, r) => Err(type_error(format!(
			"{} requires integer operands, got {} and {}",
			op_name(op),
			l.type_name(),
			r.type_name()
		))),
	}
}

fn str_operands(op: BinaryOp, l: Value, r: Value) -> Result<(String, String), ExpressionError> {
	match (l, r) {
		(Value::Str(a), Value::Str(b)) => Ok((a, b)),
		(l, r) => Err(type_error(format!(
			"{} requires string operands, got {} and {}",
			op_name(op),
			l.type_name(),
			r.type_name()
		))),
	}
}

fn values_equal(l: &Value, r: &Value) -> Result<bool, ExpressionError> {
	match (l, r) {
		(Value::Bool(a), Value::Bool(b)) => Ok(a == b),
		(Value::Int(a), Value::Int(b)) => Ok(a == b),
		(Value::Str(a), Value::Str(b)) => Ok(a == b),
		(l, r) => Err(type_error(format!(
			"cannot compare {} with {}",
			l.type_name(),
			r.type_name()
		))),
	}
}

fn op_name(op: BinaryOp) -> &'static str {
	match op {
		BinaryOp::Or => "\"||\"",
		BinaryOp::And => "\"&&\"",
		BinaryOp::Eq => "\"==\"",
		BinaryOp::Ne => "\"!=\"",
		BinaryOp::Lt => "\"<\"",
		BinaryOp::Le => "\"<=\"",
		BinaryOp::Gt => "\">\"",
		BinaryOp::Ge => "\">=\"",
		BinaryOp::In => "\"in\"",
		BinaryOp::Contains => "\"contains\"",
		BinaryOp::StartsWith => "\"startsWith\"",
		BinaryOp::EndsWith => "\"endsWith\"",
		BinaryOp::Matches => "\"matches\"",
		BinaryOp::Add => "\"+\"",
		BinaryOp::Sub => "\"-\"",
		BinaryOp::Mul => "\"*\"",
		BinaryOp::Div => "\"/\"",
		BinaryOp::Rem => "\"%\"",
	}
}

fn call(name: &str, args: &[Expr], snapshot: &Json) -> Result<Value, ExpressionError> {
	match name {
		"len" => {
			if args.len() != 1 {
				return Err(ExpressionError::InvalidFunctionCall {
					function: "len".to_string(),
					message: format!("expected exactly one argument, got {}", args.len()),
				});
			}
			match evaluate(&args[0], snapshot)? {
				Value::List(items) => Ok(Value::Int(items.len() as i64)),
				Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
				other => Err(ExpressionError::InvalidFunctionCall {
					function: "len".to_string(),
					message: format!("expected a list or string, got {}", other.type_name()),
				}),
			}
		}
		"path_base" => Ok(Value::Str(path_base(&path_arg("path_base", args, snapshot)?))),
		"path_dir" => Ok(Value::Str(path_dir(&path_arg("path_dir", args, snapshot)?))),
		other => Err(ExpressionError::InvalidFunctionCall {
			function: other.to_string(),
			message: "unknown function".to_string(),
		}),
	}
}

/// Both path helpers require exactly one string-typed argument; anything
/// else is a hard error, never a default.
fn path_arg(function: &str, args: &[Expr], snapshot: &Json) -> Result<String, ExpressionError> {
	if args.len() != 1 {
		return Err(ExpressionError::InvalidFunctionCall {
			function: function.to_string(),
			message: format!("expected exactly one argument, got {}", args.len()),
		});
	}
	match evaluate(&args[0], snapshot)? {
		Value::Str(s) => Ok(s),
		other => Err(ExpressionError::InvalidFunctionCall {
			function: function.to_string(),
			message: format!("expected a string argument, got {}", other.type_name()),
		}),
	}
}

/// Final segment of a slash-separated path
fn path_base(path: &str) -> String {
	if path.is_empty() {
		return ".".to_string();
	}
	let trimmed = path.trim_end_matches('/');
	if trimmed.is_empty() {
		return "/".to_string();
	}
	match trimmed.rfind('/') {
		Some(i) => trimmed[i + 1..].to_string(),
		None => trimmed.to_string(),
	}
}

/// Path with the final segment removed
fn path_dir(path: &str) -> String {
	match path.rfind('/') {
		None => ".".to_string(),
		Some(i) => {
			let dir = path[..i].trim_end_matches('/');
			if dir.is_empty() {
				"/".to_string()
			} else {
				dir.to_string()
			}
		}
	}
}
