//! Recursive-descent parser producing the criteria expression AST
//!
//! Precedence, loosest first: `||`, `&&`, comparisons (`== != < <= > >=`
//! plus the word operators `in contains startsWith endsWith matches`),
//! additive, multiplicative, unary `! -`, then postfix field access,
//! indexing and calls.

use super::lexer::{Spanned, Token};
use super::ExpressionError;

#[derive(Debug, Clone)]
pub(super) enum Expr {
	Bool(bool),
	Int(i64),
	Str(String),
	List(Vec<Expr>),
	Ident(String),
	Field(Box<Expr>, String),
	Index(Box<Expr>, Box<Expr>),
	Call(String, Vec<Expr>),
	Unary(UnaryOp, Box<Expr>),
	Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum UnaryOp {
	Not,
	Neg,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum BinaryOp {
	Or,
	And,
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	In,
	Contains,
	StartsWith,
	EndsWith,
	Matches,
	Add,
	Sub,
	Mul,
	Div,
	Rem,
}

pub(super) fn parse(tokens: &[Spanned]) -> Result<Expr, ExpressionError> {
	let mut parser = Parser { tokens, pos: 0 };
	let expr = parser.parse_or()?;
	if let Some(extra) = parser.peek() {
		return Err(parser.error_at(extra.offset, "unexpected trailing input"));
	}
	Ok(expr)
}

struct Parser<'a> {
	tokens: &'a [Spanned],
	pos: usize,
}

impl<'a> Parser<'a> {
	fn peek(&self) -> Option<&'a Spanned> {
		self.tokens.get(self.pos)
	}

	fn advance(&mut self) -> Option<&'a Spanned> {
		let t = self.tokens.get(self.pos);
		if t.is_some() {
			self.pos += 1;
		}
		t
	}

	fn error_at(&self, offset: usize, message: impl Into<String>) -> ExpressionError {
		ExpressionError::Parse {
			offset,
			message: message.into(),
		}
	}

	fn error_eof(&self, message: impl Into<String>) -> ExpressionError {
		let offset = self.tokens.last().map(|t| t.offset + 1).unwrap_or(0);
		ExpressionError::Parse {
			offset,
			message: message.into(),
		}
	}

	fn expect(&mut self, token: Token, what: &str) -> Result<(), ExpressionError> {
		match self.advance() {
			Some(t) if t.token == token => Ok(()),
			Some(t) => Err(self.error_at(t.offset, format!("expected {what}"))),
			None => Err(self.error_eof(format!("expected {what}"))),
		}
	}

	fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
		let mut left = self.parse_and()?;
		while matches!(self.peek(), Some(t) if t.token == Token::OrOr) {
			self.advance();
			let right = self.parse_and()?;
			left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
		}
		Ok(left)
	}

	fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
		let mut left = self.parse_comparison()?;
		while matches!(self.peek(), Some(t) if t.token == Token::AndAnd) {
			self.advance();
			let right = self.parse_comparison()?;
			left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
		}
		Ok(left)
	}

	fn comparison_op(&self) -> Option<BinaryOp> {
		match self.peek().map(|t| &t.token) {
			Some(Token::Eq) => Some(BinaryOp::Eq),
			Some(Token::Ne) => Some(BinaryOp::Ne),
			Some(Token::Lt) => Some(BinaryOp::Lt),
			Some(Token::Le) => Some(BinaryOp::Le),
			Some(Token::Gt) => Some(BinaryOp::Gt),
			Some(Token::Ge) => Some(BinaryOp::Ge),
			Some(Token::Ident(word)) => match word.as_str() {
				"in" => Some(BinaryOp::In),
				"contains" => Some(BinaryOp::Contains),
				"startsWith" => Some(BinaryOp::StartsWith),
				"endsWith" => Some(BinaryOp::EndsWith),
				"matches" => Some(BinaryOp::Matches),
				_ => None,
			},
			_ => None,
		}
	}

	fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
		let mut left = self.parse_additive()?;
		while let Some(op) = self.comparison_op() {
			self.advance();
			let right = self.parse_additive()?;
			left = Expr::Binary(op, Box::new(left), Box::new(right));
		}
		Ok(left)
	}

	fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
		let mut left = self.parse_multiplicative()?;
		loop {
			let op = match self.peek().map(|t| &t.token) {
				Some(Token::Plus) => BinaryOp::Add,
				Some(Token::Minus) => BinaryOp::Sub,
				_ => break,
			};
			self.advance();
			let right = self.parse_multiplicative()?;
			left = Expr::Binary(op, Box::new(left), Box::new(right));
		}
		Ok(left)
	}

	fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
		let mut left = self.parse_unary()?;
		loop {
			let op = match self.peek().map(|t| &t.token) {
				Some(Token::Star) => BinaryOp::Mul,
				Some(Token::Slash) => BinaryOp::Div,
				Some(Token::Percent) => BinaryOp::Rem,
				_ => break,
			};
			self.advance();
			let right = self.parse_unary()?;
			left = Expr::Binary(op, Box::new(left), Box::new(right));
		}
		Ok(left)
	}

	fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
		match self.peek().map(|t| &t.token) {
			Some(Token::Not) => {
				self.advance();
				let operand = self.parse_unary()?;
				Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)))
			}
			Some(Token::Minus) => {
				self.advance();
				let operand = self.parse_unary()?;
				Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)))
			}
			_ => self.parse_postfix(),
		}
	}

	fn parse_postfix(&mut self) -> Result<Expr, ExpressionError> {
		let mut expr = self.parse_primary()?;
		loop {
			match self.peek().map(|t| &t.token) {
				Some(Token::Dot) => {
					self.advance();
					match self.advance() {
						Some(Spanned { token: Token::Ident(name), .. }) => {
							expr = Expr::Field(Box::new(expr), name.clone());
						}
						Some(t) => {
							return Err(self.error_at(t.offset, "expected field name after \".\""))
						}
						None => return Err(self.error_eof("expected field name after \".\"")),
					}
				}
				Some(Token::LBracket) => {
					self.advance();
					let index = self.parse_or()?;
					self.expect(Token::RBracket, "\"]\"")?;
					expr = Expr::Index(Box::new(expr), Box::new(index));
				}
				_ => break,
			}
		}
		Ok(expr)
	}

	fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
		match self.advance() {
			Some(Spanned { token: Token::Int(value), .. }) => Ok(Expr::Int(*value)),
			Some(Spanned { token: Token::Str(value), .. }) => Ok(Expr::Str(value.clone())),
			Some(Spanned { token: Token::Ident(name), offset }) => match name.as_str() {
				"true" => Ok(Expr::Bool(true)),
				"false" => Ok(Expr::Bool(false)),
				// Word operators can never start an expression.
				"in" | "contains" | "startsWith" | "endsWith" | "matches" => {
					Err(self.error_at(*offset, format!("unexpected operator {name:?}")))
				}
				_ => {
					if matches!(self.peek(), Some(t) if t.token == Token::LParen) {
						self.advance();
						let args = self.parse_call_args()?;
						Ok(Expr::Call(name.clone(), args))
					} else {
						Ok(Expr::Ident(name.clone()))
					}
				}
			},
			Some(Spanned { token: Token::LParen, .. }) => {
				let inner = self.parse_or()?;
				self.expect(Token::RParen, "\")\"")?;
				Ok(inner)
			}
			Some(Spanned { token: Token::LBracket, .. }) => {
				let mut items = Vec::new();
				if matches!(self.peek(), Some(t) if t.token == Token::RBracket) {
					self.advance();
					return Ok(Expr::List(items));
				}
				loop {
					items.push(self.parse_or()?);
					match self.advance() {
						Some(Spanned { token: Token::Comma, .. }) => continue,
						Some(Spanned { token: Token::RBracket, .. }) => break,
						Some(t) => {
							return Err(self.error_at(t.offset, "expected \",\" or \"]\""))
						}
						None => return Err(self.error_eof("expected \",\" or \"]\"")),
					}
				}
				Ok(Expr::List(items))
			}
			Some(t) => Err(self.error_at(t.offset, "expected an expression")),
			None => Err(self.error_eof("expected an expression")),
		}
	}

	fn parse_call_args(&mut self) -> Result<Vec<Expr>, ExpressionError> {
		let mut args = Vec::new();
		if matches!(self.peek(), Some(t) if t.token == Token::RParen) {
			self.advance();
			return Ok(args);
		}
		loop {
			args.push(self.parse_or()?);
			match self.advance() {
				Some(Spanned { token: Token::Comma, .. }) => continue,
				Some(Spanned { token: Token::RParen, .. }) => break,
				Some(t) => return Err(self.error_at(t.offset, "expected \",\" or \")\"")),
				None => return Err(self.error_eof("expected \",\" or \")\"")),
			}
		}
		Ok(args)
	}
}

#[cfg(test)]
mod tests {
	use super::super::lexer::tokenize;
	use super::*;

	fn parse_str(input: &str) -> Result<Expr, ExpressionError> {
		parse(&tokenize(input)?)
	}

	#[test]
	fn precedence_and_binds_tighter_than_or() {
		// a || b && c parses as a || (b && c)
		let expr = parse_str("a || b && c").unwrap();
		match expr {
			Expr::Binary(BinaryOp::Or, _, right) => {
				assert!(matches!(*right, Expr::Binary(BinaryOp::And, _, _)));
			}
			other => panic!("unexpected shape: {other:?}"),
		}
	}

	#[test]
	fn not_applies_to_whole_postfix_chain() {
		let expr = parse_str("!Disks[0].IsShared").unwrap();
		match expr {
			Expr::Unary(UnaryOp::Not, inner) => {
				assert!(matches!(*inner, Expr::Field(_, _)));
			}
			other => panic!("unexpected shape: {other:?}"),
		}
	}

	#[test]
	fn empty_list_and_call() {
		assert!(matches!(parse_str("[]").unwrap(), Expr::List(items) if items.is_empty()));
		assert!(matches!(parse_str("len(Disks)").unwrap(), Expr::Call(name, args) if name == "len" && args.len() == 1));
	}

	#[test]
	fn trailing_input_rejected() {
		assert!(parse_str("true false").is_err());
	}
}
