use logos::Logos;
use thiserror::Error;

use crate::env::Environment;
use crate::env::Value;

/// Tokens of the constrained expression grammar: numbers, identifiers,
/// the four arithmetic operators, and parentheses.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum ExprToken {
	#[token("+")]
	Plus,
	#[token("-")]
	Minus,
	#[token("*")]
	Star,
	#[token("/")]
	Slash,
	#[token("(")]
	ParenOpen,
	#[token(")")]
	ParenClose,
	#[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
	Number(f64),
	#[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
	Ident(String),
}

/// A recoverable expression evaluation failure. The caller falls back to
/// binding the raw expression text and continues with later definitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvalError {
	#[error("undefined variable `{0}`")]
	UndefinedVariable(String),

	#[error("division by zero")]
	DivisionByZero,

	#[error("unexpected `{0}` in expression")]
	UnexpectedToken(String),

	#[error("unexpected end of expression")]
	UnexpectedEnd,

	#[error("unrecognized input in expression")]
	InvalidToken,

	#[error("trailing input after expression")]
	TrailingInput,
}

/// If the trimmed expression is purely a numeric literal (optional leading
/// `-`, optional fractional part), return it directly. This is the fast
/// path: no substitution or arithmetic machinery is involved.
pub fn numeric_literal(expression: &str) -> Option<f64> {
	let trimmed = expression.trim();
	let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);

	if unsigned.is_empty() {
		return None;
	}

	let mut parts = unsigned.splitn(2, '.');
	let integral = parts.next()?;
	if integral.is_empty() || !integral.bytes().all(|byte| byte.is_ascii_digit()) {
		return None;
	}
	if let Some(fraction) = parts.next() {
		if fraction.is_empty() || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
			return None;
		}
	}

	trimmed.parse::<f64>().ok()
}

/// Replace every identifier token bound in the environment with its value
/// text. Identifiers not found in the environment are left as literal text
/// so that forward-referencing typos surface as evaluation errors instead
/// of silently vanishing. Numbers, operators, whitespace, and anything the
/// expression lexer rejects are copied through unchanged.
fn substitute(expression: &str, env: &Environment) -> String {
	let mut output = String::with_capacity(expression.len());
	let mut last_end = 0;

	for (token, span) in ExprToken::lexer(expression).spanned() {
		output.push_str(&expression[last_end..span.start]);
		last_end = span.end;

		match token {
			Ok(ExprToken::Ident(name)) => {
				match env.get(&name) {
					Some(Value::Number(number)) => output.push_str(&Value::Number(*number).to_string()),
					Some(Value::Raw(raw)) => output.push_str(raw),
					None => output.push_str(&expression[span]),
				}
			}
			_ => output.push_str(&expression[span]),
		}
	}

	output.push_str(&expression[last_end..]);
	output
}

/// Recursive-descent evaluator with conventional operator precedence:
/// `expression := term (('+' | '-') term)*`,
/// `term := factor (('*' | '/') factor)*`,
/// `factor := number | identifier | '-' factor | '(' expression ')'`.
struct ExprParser {
	tokens: Vec<ExprToken>,
	cursor: usize,
}

impl ExprParser {
	fn tokenize(source: &str) -> Result<Self, EvalError> {
		let mut tokens = Vec::new();
		for token in ExprToken::lexer(source) {
			tokens.push(token.map_err(|()| EvalError::InvalidToken)?);
		}

		Ok(Self { tokens, cursor: 0 })
	}

	fn peek(&self) -> Option<&ExprToken> {
		self.tokens.get(self.cursor)
	}

	fn advance(&mut self) -> Option<ExprToken> {
		let token = self.tokens.get(self.cursor).cloned();
		if token.is_some() {
			self.cursor += 1;
		}
		token
	}

	fn expression(&mut self) -> Result<f64, EvalError> {
		let mut value = self.term()?;

		while let Some(token) = self.peek() {
			match token {
				ExprToken::Plus => {
					self.cursor += 1;
					value += self.term()?;
				}
				ExprToken::Minus => {
					self.cursor += 1;
					value -= self.term()?;
				}
				_ => break,
			}
		}

		Ok(value)
	}

	fn term(&mut self) -> Result<f64, EvalError> {
		let mut value = self.factor()?;

		while let Some(token) = self.peek() {
			match token {
				ExprToken::Star => {
					self.cursor += 1;
					value *= self.factor()?;
				}
				ExprToken::Slash => {
					self.cursor += 1;
					let divisor = self.factor()?;
					if divisor == 0.0 {
						return Err(EvalError::DivisionByZero);
					}
					value /= divisor;
				}
				_ => break,
			}
		}

		Ok(value)
	}

	fn factor(&mut self) -> Result<f64, EvalError> {
		match self.advance() {
			Some(ExprToken::Number(number)) => Ok(number),
			Some(ExprToken::Minus) => Ok(-self.factor()?),
			Some(ExprToken::ParenOpen) => {
				let value = self.expression()?;
				match self.advance() {
					Some(ExprToken::ParenClose) => Ok(value),
					Some(token) => Err(EvalError::UnexpectedToken(display_token(&token))),
					None => Err(EvalError::UnexpectedEnd),
				}
			}
			Some(ExprToken::Ident(name)) => Err(EvalError::UndefinedVariable(name)),
			Some(token) => Err(EvalError::UnexpectedToken(display_token(&token))),
			None => Err(EvalError::UnexpectedEnd),
		}
	}
}

fn display_token(token: &ExprToken) -> String {
	match token {
		ExprToken::Plus => "+".to_string(),
		ExprToken::Minus => "-".to_string(),
		ExprToken::Star => "*".to_string(),
		ExprToken::Slash => "/".to_string(),
		ExprToken::ParenOpen => "(".to_string(),
		ExprToken::ParenClose => ")".to_string(),
		ExprToken::Number(number) => Value::Number(*number).to_string(),
		ExprToken::Ident(name) => name.clone(),
	}
}

/// Evaluate an expression against the environment of already-defined
/// variables. Identifiers bound in the environment are substituted first;
/// the substituted source is then parsed and evaluated with conventional
/// precedence and parenthesization.
pub fn evaluate(expression: &str, env: &Environment) -> Result<f64, EvalError> {
	if let Some(number) = numeric_literal(expression) {
		return Ok(number);
	}

	let substituted = substitute(expression, env);
	let mut parser = ExprParser::tokenize(&substituted)?;
	let value = parser.expression()?;

	if parser.peek().is_some() {
		return Err(EvalError::TrailingInput);
	}

	Ok(value)
}
