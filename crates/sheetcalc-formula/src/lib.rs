//! # sheetcalc-formula
//!
//! Formula evaluation for sheetcalc.
//!
//! This crate provides:
//! - [`EvaluationContext`] - what a formula sees of the workbook while it is
//!   evaluated, including the policy for reading dirty cells
//! - Formula evaluation (expression tree → [`AnyValue`](sheetcalc_core::AnyValue))
//! - A compact set of built-in functions
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{FormulaExpr, ScalarValue, SheetPoint, Workbook};
//! use sheetcalc_formula::evaluate_ad_hoc;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Sheet1").unwrap();
//! let ws = workbook.worksheet_mut(sheet).unwrap();
//! ws.set_value(SheetPoint::new(1, 1), 2.0);
//! ws.set_formula(
//!     SheetPoint::new(2, 1),
//!     FormulaExpr::add(FormulaExpr::cell(SheetPoint::new(1, 1)), FormulaExpr::number(1.0)),
//! );
//!
//! // A2 is dirty; ad-hoc evaluation recomputes it on the spot
//! let expr = FormulaExpr::function("SUM", vec![FormulaExpr::reference("A1:A2").unwrap()]);
//! let value = evaluate_ad_hoc(&workbook, sheet, &expr).unwrap();
//! assert_eq!(value, ScalarValue::Number(5.0));
//! ```

pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;

pub use context::{EvaluationContext, EvaluationSettings};
pub use error::{EvalError, EvalResult};
pub use evaluator::{evaluate, evaluate_ad_hoc};
pub use functions::{FunctionDef, FunctionRegistry};
