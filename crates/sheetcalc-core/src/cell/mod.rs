//! Cell types and storage

mod address;
mod storage;
mod value;

pub use address::{BookPoint, SheetId, SheetPoint, SheetRange};
pub use storage::{Cell, CellsCollection, FormulaEntry, FormulaSlice, Slice, UnionPoints, ValueSlice};
pub use value::{CellError, ScalarValue, SharedString};
