//! Restricted arithmetic evaluator for untrusted formula text.
//!
//! The parser only ever produces the node kinds of [`Expr`]; anything it does
//! not recognise (names, calls, strings, comparisons, brackets, commas) is
//! rejected while tokenizing or parsing, before any evaluation happens.

use crate::{Rank, SandboxLimits};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("unsafe expression: {0}")]
    UnsafeExpression(String),
    #[error("division by zero")]
    DivisionByZero,
}

impl SandboxError {
    fn unsafe_expr(detail: impl Into<String>) -> Self {
        Self::UnsafeExpression(detail.into())
    }

    fn unsupported() -> Self {
        Self::unsafe_expr("unsupported construct")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { left: Box<Expr>, op: BinaryOp, right: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Replaces standalone rank letters (A, J, Q, K in either case) with their
/// values. A letter touching another letter, digit, `_` or `.` is left alone.
pub fn substitute_ranks(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len());
    for (idx, ch) in chars.iter().copied().enumerate() {
        let isolated = (idx == 0 || !is_word_char(chars[idx - 1]))
            && chars.get(idx + 1).map_or(true, |next| !is_word_char(*next));
        match Rank::from_letter(ch) {
            Some(rank) if isolated => output.push_str(&rank.value().to_string()),
            _ => output.push(ch),
        }
    }
    output
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

/// Rank substitution plus the `^` power spelling.
pub fn preprocess(input: &str) -> String {
    substitute_ranks(input).replace('^', "**")
}

/// A parsed formula. Built per call and dropped when the caller is done.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    root: Expr,
    limits: SandboxLimits,
}

impl Formula {
    pub fn parse(input: &str) -> Result<Self, SandboxError> {
        Self::parse_with_limits(input, SandboxLimits::default())
    }

    pub fn parse_with_limits(input: &str, limits: SandboxLimits) -> Result<Self, SandboxError> {
        if input.chars().count() > limits.max_input_len {
            return Err(SandboxError::unsafe_expr(format!(
                "expression longer than {} characters",
                limits.max_input_len
            )));
        }
        let text = preprocess(input);
        let mut parser = ExprParser::new(&text)?;
        let root = parser.parse()?;
        Ok(Self { root, limits })
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Every literal in source order, as card values.
    pub fn literals(&self) -> Result<Vec<i64>, SandboxError> {
        let mut out = Vec::new();
        collect_literals(&self.root, &mut out)?;
        Ok(out)
    }

    pub fn evaluate(&self) -> Result<f64, SandboxError> {
        let value = eval_expr(&self.root, &self.limits)?;
        if value.is_nan() {
            return Err(SandboxError::unsafe_expr("result is not a real number"));
        }
        if value.is_infinite() {
            return Err(SandboxError::unsafe_expr("result out of range"));
        }
        Ok(value)
    }
}

pub fn evaluate(input: &str) -> Result<f64, SandboxError> {
    Formula::parse(input)?.evaluate()
}

pub fn extract_literals(input: &str) -> Result<Vec<i64>, SandboxError> {
    Formula::parse(input)?.literals()
}

fn collect_literals(expr: &Expr, out: &mut Vec<i64>) -> Result<(), SandboxError> {
    match expr {
        Expr::Number(value) => {
            if value.fract() != 0.0 || !value.is_finite() {
                return Err(SandboxError::unsafe_expr("only integer card values allowed"));
            }
            out.push(*value as i64);
        }
        Expr::Unary { expr, .. } => collect_literals(expr, out)?,
        Expr::Binary { left, right, .. } => {
            collect_literals(left, out)?;
            collect_literals(right, out)?;
        }
    }
    Ok(())
}

fn eval_expr(expr: &Expr, limits: &SandboxLimits) -> Result<f64, SandboxError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Unary { op, expr } => {
            let inner = eval_expr(expr, limits)?;
            Ok(match op {
                UnaryOp::Plus => inner,
                UnaryOp::Neg => -inner,
            })
        }
        Expr::Binary { left, op, right } => {
            let lhs = eval_expr(left, limits)?;
            let rhs = eval_expr(right, limits)?;
            match op {
                BinaryOp::Add => Ok(lhs + rhs),
                BinaryOp::Sub => Ok(lhs - rhs),
                BinaryOp::Mul => Ok(lhs * rhs),
                BinaryOp::Div => {
                    if rhs == 0.0 {
                        return Err(SandboxError::DivisionByZero);
                    }
                    Ok(lhs / rhs)
                }
                BinaryOp::Pow => {
                    if !rhs.is_finite() || rhs.abs() > limits.max_exponent {
                        return Err(SandboxError::unsafe_expr("exponent too large"));
                    }
                    if lhs == 0.0 && rhs < 0.0 {
                        return Err(SandboxError::DivisionByZero);
                    }
                    Ok(lhs.powf(rhs))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ExprToken {
    Number(f64),
    Op(&'static str),
    LParen,
    RParen,
    /// Anything outside the grammar.
    Other(String),
}

struct ExprParser {
    tokens: Vec<ExprToken>,
    pos: usize,
}

impl ExprParser {
    fn new(input: &str) -> Result<Self, SandboxError> {
        let tokens = tokenize_expr(input)?;
        if tokens.iter().any(|token| matches!(token, ExprToken::Other(_))) {
            return Err(SandboxError::unsupported());
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn parse(&mut self) -> Result<Expr, SandboxError> {
        if self.tokens.is_empty() {
            return Err(SandboxError::unsafe_expr("empty expression"));
        }
        let expr = self.parse_add()?;
        match self.peek_token() {
            None => Ok(expr),
            Some(ExprToken::Number(_)) | Some(ExprToken::LParen) => {
                Err(SandboxError::unsafe_expr("invalid syntax: missing operator"))
            }
            Some(other) => Err(SandboxError::unsafe_expr(format!(
                "invalid syntax: unexpected {}",
                describe(other)
            ))),
        }
    }

    fn parse_add(&mut self) -> Result<Expr, SandboxError> {
        let mut node = self.parse_mul()?;
        loop {
            let op = if self.match_op("+") {
                BinaryOp::Add
            } else if self.match_op("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_mul()?;
            node = Expr::Binary {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    fn parse_mul(&mut self) -> Result<Expr, SandboxError> {
        let mut node = self.parse_unary()?;
        loop {
            let op = if self.match_op("*") {
                BinaryOp::Mul
            } else if self.match_op("/") {
                BinaryOp::Div
            } else {
                break;
            };
            let right = self.parse_unary()?;
            node = Expr::Binary {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    // Unary binds looser than `**` on its right: -2**2 == -(2**2).
    fn parse_unary(&mut self) -> Result<Expr, SandboxError> {
        let op = if self.match_op("-") {
            UnaryOp::Neg
        } else if self.match_op("+") {
            UnaryOp::Plus
        } else {
            return self.parse_power();
        };
        let expr = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    // Right associative: 2**3**2 == 2**(3**2).
    fn parse_power(&mut self) -> Result<Expr, SandboxError> {
        let base = self.parse_primary()?;
        if self.match_op("**") {
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary {
                left: Box::new(base),
                op: BinaryOp::Pow,
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, SandboxError> {
        match self.next_token() {
            Some(ExprToken::Number(value)) => Ok(Expr::Number(value)),
            Some(ExprToken::LParen) => {
                let expr = self.parse_add()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(other) => Err(SandboxError::unsafe_expr(format!(
                "invalid syntax: unexpected {}",
                describe(&other)
            ))),
            None => Err(SandboxError::unsafe_expr(
                "invalid syntax: unexpected end of expression",
            )),
        }
    }

    fn match_op(&mut self, op: &str) -> bool {
        if let Some(ExprToken::Op(value)) = self.peek_token() {
            if *value == op {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn expect_rparen(&mut self) -> Result<(), SandboxError> {
        match self.next_token() {
            Some(ExprToken::RParen) => Ok(()),
            None => Err(SandboxError::unsafe_expr("invalid syntax: '(' was never closed")),
            Some(other) => Err(SandboxError::unsafe_expr(format!(
                "invalid syntax: expected ')', found {}",
                describe(&other)
            ))),
        }
    }

    fn peek_token(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Option<ExprToken> {
        let tok = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(tok)
    }
}

fn describe(token: &ExprToken) -> String {
    match token {
        ExprToken::Number(value) => format!("number {value}"),
        ExprToken::Op(op) => format!("'{op}'"),
        ExprToken::LParen => "'('".to_string(),
        ExprToken::RParen => "')'".to_string(),
        ExprToken::Other(text) => format!("{text:?}"),
    }
}

fn tokenize_expr(input: &str) -> Result<Vec<ExprToken>, SandboxError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        if ch.is_ascii_digit() || ch == '.' {
            let mut value = String::new();
            while let Some(next) = chars.peek().copied() {
                if !next.is_ascii_digit() && next != '.' {
                    break;
                }
                value.push(next);
                chars.next();
            }
            // `2e3`, `0x1f`, `3j` and friends are not card values.
            if chars.peek().is_some_and(|next| next.is_alphanumeric()) {
                return Err(SandboxError::unsupported());
            }
            let number: f64 = value
                .parse()
                .map_err(|_| SandboxError::unsafe_expr(format!("invalid number literal {value:?}")))?;
            tokens.push(ExprToken::Number(number));
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let mut ident = String::new();
            while let Some(next) = chars.peek().copied() {
                if !next.is_alphanumeric() && next != '_' {
                    break;
                }
                ident.push(next);
                chars.next();
            }
            tokens.push(ExprToken::Other(ident));
            continue;
        }

        chars.next();
        let doubled = chars.peek() == Some(&ch);
        let token = match ch {
            '(' => ExprToken::LParen,
            ')' => ExprToken::RParen,
            '*' if doubled => {
                chars.next();
                ExprToken::Op("**")
            }
            // Floor division is outside the grammar.
            '/' if doubled => {
                chars.next();
                ExprToken::Other("//".to_string())
            }
            '+' => ExprToken::Op("+"),
            '-' => ExprToken::Op("-"),
            '*' => ExprToken::Op("*"),
            '/' => ExprToken::Op("/"),
            other => ExprToken::Other(other.to_string()),
        };
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_isolated_rank_letters() {
        assert_eq!(substitute_ranks("A+J*Q-10/K"), "1+11*12-10/13");
        assert_eq!(substitute_ranks("a*(j - q) + k"), "1*(11 - 12) + 13");
        assert_eq!(substitute_ranks("AB + 3"), "AB + 3");
        assert_eq!(substitute_ranks("A1 + 1A + _A + A. + .K"), "A1 + 1A + _A + A. + .K");
    }

    #[test]
    fn substitution_leaves_numbers_alone() {
        let text = "1+11*12-10/13";
        assert_eq!(substitute_ranks(text), text);
        assert_eq!(substitute_ranks(&substitute_ranks("A+K")), "1+13");
    }

    #[test]
    fn caret_is_power() {
        assert_eq!(evaluate("2^3").unwrap(), 8.0);
        assert_eq!(evaluate("2**3").unwrap(), 8.0);
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_negation() {
        assert_eq!(evaluate("2**3**2").unwrap(), 512.0);
        assert_eq!(evaluate("-2**2").unwrap(), -4.0);
        assert_eq!(evaluate("2**-1").unwrap(), 0.5);
        assert_eq!(evaluate("(-2)**2").unwrap(), 4.0);
    }

    #[test]
    fn tree_holds_only_grammar_nodes() {
        let formula = Formula::parse("-(3+K)/2").unwrap();
        assert_eq!(
            formula.root(),
            &Expr::Binary {
                left: Box::new(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(Expr::Binary {
                        left: Box::new(Expr::Number(3.0)),
                        op: BinaryOp::Add,
                        right: Box::new(Expr::Number(13.0)),
                    }),
                }),
                op: BinaryOp::Div,
                right: Box::new(Expr::Number(2.0)),
            }
        );
    }

    #[test]
    fn literals_come_out_in_source_order() {
        assert_eq!(extract_literals("(A+J)*(3-q)").unwrap(), vec![1, 11, 3, 12]);
        assert_eq!(extract_literals("6.0*4").unwrap(), vec![6, 4]);
    }

    #[test]
    fn fractional_literals_are_rejected() {
        let err = extract_literals("2.5*8+4").unwrap_err();
        assert_eq!(
            err,
            SandboxError::UnsafeExpression("only integer card values allowed".into())
        );
    }

    #[test]
    fn zero_to_negative_power_is_division_by_zero() {
        assert_eq!(evaluate("0**-1"), Err(SandboxError::DivisionByZero));
    }

    #[test]
    fn oversized_exponent_is_rejected_before_computing() {
        let err = evaluate("2**(10*200)").unwrap_err();
        assert_eq!(err, SandboxError::UnsafeExpression("exponent too large".into()));
        let err = evaluate("9**9**9").unwrap_err();
        assert_eq!(err, SandboxError::UnsafeExpression("exponent too large".into()));
    }

    #[test]
    fn overflow_is_reported_not_returned() {
        let err = evaluate("13**999*13**999").unwrap_err();
        assert!(matches!(err, SandboxError::UnsafeExpression(_)));
    }

    #[test]
    fn malformed_text_folds_into_unsafe_expression() {
        for text in ["", "   ", "3+", "(3+4", "3 4", "3+*4", ")", "1..2"] {
            let err = evaluate(text).unwrap_err();
            assert!(
                matches!(err, SandboxError::UnsafeExpression(_)),
                "{text:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn custom_limits_apply() {
        let limits = SandboxLimits {
            max_input_len: 5,
            max_exponent: 2.0,
        };
        assert!(Formula::parse_with_limits("1+2+3", limits).is_ok());
        assert!(Formula::parse_with_limits("1+2+34", limits).is_err());
        let cube = Formula::parse_with_limits("2**3", limits).unwrap();
        assert_eq!(
            cube.evaluate(),
            Err(SandboxError::UnsafeExpression("exponent too large".into()))
        );
    }
}
