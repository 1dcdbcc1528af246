//! Evaluation error types
//!
//! Formula-level problems (`#DIV/0!`, `#NAME?`, a wrong argument count) are
//! values and travel as [`ScalarValue::Error`](sheetcalc_core::ScalarValue).
//! [`EvalError`] is reserved for conditions that stop an evaluation.

use sheetcalc_core::BookPoint;
use thiserror::Error;

/// Result type for evaluation
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Structural errors that abort an evaluation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The context was built without a workbook, worksheet or formula address
    /// and the evaluation needed it
    #[error("Evaluation context has no {0}")]
    MissingContext(&'static str),

    /// A referenced formula cell is dirty; it must be calculated first
    #[error("Value of {0} is not calculated yet")]
    DataNotReady(BookPoint),
}
