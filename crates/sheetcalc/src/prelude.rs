//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Values
    AnyValue,
    // References
    Area,
    Array,
    BookPoint,
    // Calculation types
    CalculationOptions,
    CalculationStats,
    CellError,

    // Errors
    Error,
    // Formulas
    FormulaExpr,
    Reference,
    Result,
    ScalarValue,

    SheetId,
    SheetPoint,
    SheetRange,
    // Main types
    Workbook,
    // Extension traits
    WorkbookCalculationExt,
    Worksheet,
};
