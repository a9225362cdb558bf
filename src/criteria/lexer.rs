//! Tokenizer for the criteria expression language

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
	Ident(String),
	Int(i64),
	Str(String),
	LParen,
	RParen,
	LBracket,
	RBracket,
	Comma,
	Dot,
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	AndAnd,
	OrOr,
	Not,
	Plus,
	Minus,
	Star,
	Slash,
	Percent,
}

#[derive(Debug, Clone)]
pub(super) struct Spanned {
	pub token: Token,
	pub offset: usize,
}

fn err(offset: usize, message: impl Into<String>) -> ExpressionError {
	ExpressionError::Parse {
		offset,
		message: message.into(),
	}
}

pub(super) fn tokenize(input: &str) -> Result<Vec<Spanned>, ExpressionError> {
	let bytes = input.as_bytes();
	let mut tokens = Vec::new();
	let mut i = 0;

	while i < bytes.len() {
		let start = i;
		let c = bytes[i];
		match c {
			b' ' | b'\t' | b'\r' | b'\n' => {
				i += 1;
				continue;
			}
			b'(' => tokens.push(Spanned { token: Token::LParen, offset: start }),
			b')' => tokens.push(Spanned { token: Token::RParen, offset: start }),
			b'[' => tokens.push(Spanned { token: Token::LBracket, offset: start }),
			b']' => tokens.push(Spanned { token: Token::RBracket, offset: start }),
			b',' => tokens.push(Spanned { token: Token::Comma, offset: start }),
			b'.' => tokens.push(Spanned { token: Token::Dot, offset: start }),
			b'+' => tokens.push(Spanned { token: Token::Plus, offset: start }),
			b'-' => tokens.push(Spanned { token: Token::Minus, offset: start }),
			b'*' => tokens.push(Spanned { token: Token::Star, offset: start }),
			b'/' => tokens.push(Spanned { token: Token::Slash, offset: start }),
			b'%' => tokens.push(Spanned { token: Token::Percent, offset: start }),
			b'=' => {
				if bytes.get(i + 1) == Some(&b'=') {
					i += 1;
					tokens.push(Spanned { token: Token::Eq, offset: start });
				} else {
					return Err(err(start, "expected \"==\""));
				}
			}
			b'!' => {
				if bytes.get(i + 1) == Some(&b'=') {
					i += 1;
					tokens.push(Spanned { token: Token::Ne, offset: start });
				} else {
					tokens.push(Spanned { token: Token::Not, offset: start });
				}
			}
			b'<' => {
				if bytes.get(i + 1) == Some(&b'=') {
					i += 1;
					tokens.push(Spanned { token: Token::Le, offset: start });
				} else {
					tokens.push(Spanned { token: Token::Lt, offset: start });
				}
			}
			b'>' => {
				if bytes.get(i + 1) == Some(&b'=') {
					i += 1;
					tokens.push(Spanned { token: Token::Ge, offset: start });
				} else {
					tokens.push(Spanned { token: Token::Gt, offset: start });
				}
			}
			b'&' => {
				if bytes.get(i + 1) == Some(&b'&') {
					i += 1;
					tokens.push(Spanned { token: Token::AndAnd, offset: start });
				} else {
					return Err(err(start, "expected \"&&\""));
				}
			}
			b'|' => {
				if bytes.get(i + 1) == Some(&b'|') {
					i += 1;
					tokens.push(Spanned { token: Token::OrOr, offset: start });
				} else {
					return Err(err(start, "expected \"||\""));
				}
			}
			b'"' | b'\'' => {
				let quote = c;
				let mut value = String::new();
				i += 1;
				loop {
					match bytes.get(i) {
						None => return Err(err(start, "unterminated string literal")),
						Some(&b) if b == quote => break,
						Some(&b'\\') => {
							let escaped = bytes
								.get(i + 1)
								.ok_or_else(|| err(start, "unterminated string literal"))?;
							match escaped {
								b'"' | b'\'' | b'\\' => value.push(*escaped as char),
								b'n' => value.push('\n'),
								b't' => value.push('\t'),
								other => {
									return Err(err(
										i,
										format!("unsupported escape \"\\{}\"", *other as char),
									))
								}
							}
							i += 2;
						}
						Some(&b) => {
							// Multi-byte UTF-8 sequences pass through untouched.
							let ch_len = utf8_len(b);
							value.push_str(&input[i..i + ch_len]);
							i += ch_len;
						}
					}
				}
				tokens.push(Spanned { token: Token::Str(value), offset: start });
			}
			b'0'..=b'9' => {
				while i < bytes.len() && bytes[i].is_ascii_digit() {
					i += 1;
				}
				let text = &input[start..i];
				let value = text
					.parse::<i64>()
					.map_err(|_| err(start, format!("integer literal {text:?} out of range")))?;
				tokens.push(Spanned { token: Token::Int(value), offset: start });
				continue;
			}
			b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
				while i < bytes.len()
					&& (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
				{
					i += 1;
				}
				tokens.push(Spanned {
					token: Token::Ident(input[start..i].to_string()),
					offset: start,
				});
				continue;
			}
			other => {
				return Err(err(start, format!("unexpected character {:?}", other as char)))
			}
		}
		i += 1;
	}

	Ok(tokens)
}

fn utf8_len(first: u8) -> usize {
	match first {
		b if b < 0x80 => 1,
		b if b < 0xE0 => 2,
		b if b < 0xF0 => 3,
		_ => 4,
	}
}
