//! # sheetcalc-core
//!
//! Core data structures for the sheetcalc formula engine.
//!
//! This crate provides the fundamental types used throughout sheetcalc:
//! - [`ScalarValue`], [`Array`] and [`AnyValue`] - The value model
//! - [`SheetPoint`], [`BookPoint`], [`SheetRange`] - Cell addressing
//! - [`Area`] and [`Reference`] - Multi-area and 3D references
//! - [`ValueSlice`], [`FormulaSlice`], [`CellsCollection`] - Sparse cell storage
//! - [`Workbook`], [`Worksheet`] - The document structures
//! - [`FormulaExpr`] - The expression tree produced by a formula parser
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{FormulaExpr, ScalarValue, SheetPoint, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet_id = workbook.add_worksheet("Data").unwrap();
//! let sheet = workbook.worksheet_mut(sheet_id).unwrap();
//!
//! sheet.set_value(SheetPoint::new(1, 1), 5.0);
//! sheet.set_formula(SheetPoint::new(2, 1), FormulaExpr::cell(SheetPoint::new(1, 1)));
//!
//! assert_eq!(sheet.get_value(SheetPoint::new(1, 1)), ScalarValue::Number(5.0));
//! assert!(sheet.is_dirty(SheetPoint::new(2, 1)));
//! ```

pub mod cell;
pub mod culture;
pub mod error;
pub mod formula;
pub mod reference;
pub mod value;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{
    BookPoint, Cell, CellError, CellsCollection, FormulaEntry, FormulaSlice, ScalarValue,
    SharedString, SheetId, SheetPoint, SheetRange, Slice, ValueSlice,
};
pub use culture::Culture;
pub use error::{Error, Result};
pub use formula::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
pub use reference::{Area, Reference};
pub use value::{AnyValue, Array, Collection, MAX_ARRAY_CELLS};
pub use workbook::{Workbook, WorkbookSettings};
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
