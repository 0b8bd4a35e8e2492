use crate::{check_card_usage, Formula, GameConfig, MultisetMismatch, SandboxError, SandboxLimits};
use serde::Serialize;
use thiserror::Error;

/// Answers that claim the cards cannot make the target.
pub const NO_SOLUTION_TOKENS: [&str; 5] = ["no sol", "nosol", "no solution", "0", "-1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsafeExpression,
    DivisionByZero,
    MultisetMismatch,
    NoEligiblePuzzle,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::UnsafeExpression => "unsafe_expression",
            Self::DivisionByZero => "division_by_zero",
            Self::MultisetMismatch => "multiset_mismatch",
            Self::NoEligiblePuzzle => "no_eligible_puzzle",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error("invalid expression: {0}")]
    UnsafeExpression(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("you must use exactly the four card values once each: {0}")]
    MultisetMismatch(MultisetMismatch),
}

impl CheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsafeExpression(_) => ErrorKind::UnsafeExpression,
            Self::DivisionByZero => ErrorKind::DivisionByZero,
            Self::MultisetMismatch(_) => ErrorKind::MultisetMismatch,
        }
    }
}

impl From<SandboxError> for CheckError {
    fn from(value: SandboxError) -> Self {
        match value {
            SandboxError::UnsafeExpression(detail) => Self::UnsafeExpression(detail),
            SandboxError::DivisionByZero => Self::DivisionByZero,
        }
    }
}

/// Parses `text`, checks it uses `required` exactly, then evaluates it.
pub fn evaluate_and_validate(text: &str, required: &[i64]) -> Result<f64, CheckError> {
    evaluate_and_validate_with_limits(text, required, SandboxLimits::default())
}

pub fn evaluate_and_validate_with_limits(
    text: &str,
    required: &[i64],
    limits: SandboxLimits,
) -> Result<f64, CheckError> {
    let formula = Formula::parse_with_limits(text, limits)?;
    let literals = formula.literals()?;
    check_card_usage(required, &literals).map_err(CheckError::MultisetMismatch)?;
    Ok(formula.evaluate()?)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// A formula reaching the target with the right cards.
    Solved { value: f64 },
    /// A correct claim that the puzzle has no solution.
    NoSolution,
    /// Valid formula, wrong result.
    NotTarget { value: f64 },
    /// The player claimed no solution but one exists.
    SolutionExists,
    Rejected(CheckError),
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Solved { .. } | Self::NoSolution)
    }
}

pub fn is_no_solution_claim(answer: &str) -> bool {
    let normalized = answer.trim().to_lowercase();
    NO_SOLUTION_TOKENS.contains(&normalized.as_str())
}

/// Judges one answer against the cards `values` and the known `solutions`.
pub fn judge_answer(values: &[i64], solutions: &[String], answer: &str, config: &GameConfig) -> Verdict {
    if is_no_solution_claim(answer) {
        return if solutions.is_empty() {
            Verdict::NoSolution
        } else {
            Verdict::SolutionExists
        };
    }
    match evaluate_and_validate_with_limits(answer.trim(), values, config.limits) {
        Ok(value) if config.hits_target(value) => Verdict::Solved { value },
        Ok(value) => Verdict::NotTarget { value },
        Err(err) => Verdict::Rejected(err),
    }
}
