//! # sheetcalc
//!
//! A spreadsheet formula calculation core.
//!
//! Sheetcalc keeps cell values and formulas in sparse per-sheet slices and
//! recalculates dirty formulas without a precomputed dependency graph: a
//! formula that reads a dirty cell reports it, and the scheduler evaluates
//! that cell first.
//!
//! ## Features
//!
//! - Sparse value and formula storage, iterated in time proportional to the
//!   occupied cells
//! - Multi-area and 3D references
//! - Implicit intersection and array formulas
//! - Circular reference detection (`#REF!`)
//! - Cooperative cancellation of a recalculation pass
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Sheet1").unwrap();
//! let ws = workbook.worksheet_mut(sheet).unwrap();
//!
//! ws.set_value_a1("A1", 5.0).unwrap();
//! ws.set_formula_a1(
//!     "A2",
//!     FormulaExpr::add(FormulaExpr::reference("A1").unwrap(), FormulaExpr::number(1.0)),
//! )
//! .unwrap();
//!
//! let stats = workbook.calculate().unwrap();
//! assert_eq!(stats.cells_calculated, 1);
//! assert_eq!(
//!     workbook.worksheet(sheet).unwrap().get_value_a1("A2").unwrap(),
//!     ScalarValue::Number(6.0)
//! );
//! ```

pub mod calculation;
pub mod prelude;

use thiserror::Error;

// Re-export calculation types
pub use calculation::{CalculationOptions, CalculationStats, WorkbookCalculationExt};

// Re-export core types
pub use sheetcalc_core::{
    AnyValue, Area, Array, BinaryOperator, BookPoint, Cell, CellError, CellsCollection, Culture,
    FormulaEntry, FormulaExpr, FormulaSlice, Reference, ScalarValue, SheetId, SheetPoint,
    SheetRange, UnaryOperator, ValueSlice, Workbook, WorkbookSettings, Worksheet, MAX_COLS,
    MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export formula types
pub use sheetcalc_formula::{
    evaluate, evaluate_ad_hoc, EvalError, EvalResult, EvaluationContext, EvaluationSettings,
};

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a calculation pass
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the document model
    #[error(transparent)]
    Core(#[from] sheetcalc_core::Error),

    /// The pass reached a state that the scheduler cannot explain
    #[error("Internal calculation error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new internal error with a message
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}
