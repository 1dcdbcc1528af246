//! Values produced by formula evaluation
//!
//! A formula evaluates to an [`AnyValue`]: a scalar, a 2-D array of scalars,
//! or a reference to cells. Callers pick the shape they can handle:
//!
//! ```rust
//! use sheetcalc_core::{AnyValue, Collection, ScalarValue};
//!
//! let value = AnyValue::from(ScalarValue::Number(1.0));
//! match value.try_pick_scalar() {
//!     Ok(scalar) => assert_eq!(scalar, ScalarValue::Number(1.0)),
//!     Err(Collection::Array(_)) => unreachable!(),
//!     Err(Collection::Reference(_)) => unreachable!(),
//! }
//! ```

use crate::cell::{CellError, ScalarValue};
use crate::reference::Reference;

/// Largest number of elements an evaluated array may hold. Two full columns
/// still fit; anything larger evaluates to a `#CALC!` array.
pub const MAX_ARRAY_CELLS: usize = 2 * crate::MAX_ROWS as usize;

/// Rectangular array of scalars, stored row-major.
///
/// Arrays always have at least one row and one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    rows: usize,
    cols: usize,
    data: Vec<ScalarValue>,
}

impl Array {
    /// Create an array from rows. Ragged or empty input is `#VALUE!`.
    pub fn from_rows(rows: Vec<Vec<ScalarValue>>) -> Result<Self, CellError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if cols == 0 || rows.iter().any(|row| row.len() != cols) {
            return Err(CellError::Value);
        }
        let row_count = rows.len();
        Ok(Self {
            rows: row_count,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Whether a `rows` x `cols` array stays within [`MAX_ARRAY_CELLS`]
    pub fn fits(rows: usize, cols: usize) -> bool {
        rows.checked_mul(cols)
            .map_or(false, |cells| cells <= MAX_ARRAY_CELLS)
    }

    /// 1x1 `#CALC!` array standing in for an array too large to evaluate
    pub fn too_large() -> Self {
        Self::filled(1, 1, ScalarValue::Error(CellError::Calc))
    }

    /// Create a `rows` x `cols` array with every element set to `value`
    pub fn filled(rows: usize, cols: usize, value: ScalarValue) -> Self {
        let (rows, cols) = (rows.max(1), cols.max(1));
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Create an array by computing each element from its (row, col) index
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> ScalarValue,
    {
        let (rows, cols) = (rows.max(1), cols.max(1));
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at a 0-based position
    pub fn get(&self, row: usize, col: usize) -> Option<&ScalarValue> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Replace the element at a 0-based position; false if out of bounds
    pub fn set(&mut self, row: usize, col: usize, value: ScalarValue) -> bool {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
            true
        } else {
            false
        }
    }

    /// Top-left element
    pub fn top_left(&self) -> &ScalarValue {
        &self.data[0]
    }

    /// Elements in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &ScalarValue> {
        self.data.iter()
    }

    /// Apply `f` to every element
    pub fn map<F>(&self, f: F) -> Array
    where
        F: FnMut(&ScalarValue) -> ScalarValue,
    {
        Array {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }
}

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    Scalar(ScalarValue),
    Array(Array),
    Reference(Reference),
}

/// The non-scalar shapes of an [`AnyValue`]
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    Array(Array),
    Reference(Reference),
}

impl AnyValue {
    /// Take the scalar, or hand back the collection
    pub fn try_pick_scalar(self) -> Result<ScalarValue, Collection> {
        match self {
            AnyValue::Scalar(value) => Ok(value),
            AnyValue::Array(array) => Err(Collection::Array(array)),
            AnyValue::Reference(reference) => Err(Collection::Reference(reference)),
        }
    }

    /// Borrow the scalar if this is one
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            AnyValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Check if the value is a reference
    pub fn is_reference(&self) -> bool {
        matches!(self, AnyValue::Reference(_))
    }

    /// Error scalar shortcut
    pub fn error(error: CellError) -> Self {
        AnyValue::Scalar(ScalarValue::Error(error))
    }
}

impl Collection {
    /// Take the array, or hand back the reference
    pub fn try_pick_array(self) -> Result<Array, Reference> {
        match self {
            Collection::Array(array) => Ok(array),
            Collection::Reference(reference) => Err(reference),
        }
    }
}

impl From<ScalarValue> for AnyValue {
    fn from(value: ScalarValue) -> Self {
        AnyValue::Scalar(value)
    }
}

impl From<Array> for AnyValue {
    fn from(array: Array) -> Self {
        AnyValue::Array(array)
    }
}

impl From<Reference> for AnyValue {
    fn from(reference: Reference) -> Self {
        AnyValue::Reference(reference)
    }
}

impl From<CellError> for AnyValue {
    fn from(error: CellError) -> Self {
        AnyValue::error(error)
    }
}

impl From<f64> for AnyValue {
    fn from(n: f64) -> Self {
        AnyValue::Scalar(ScalarValue::Number(n))
    }
}

impl From<bool> for AnyValue {
    fn from(b: bool) -> Self {
        AnyValue::Scalar(ScalarValue::Logical(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::SheetRange;
    use crate::reference::Area;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_from_rows() {
        let array = Array::from_rows(vec![
            vec![1.0.into(), 2.0.into()],
            vec![3.0.into(), ScalarValue::Blank],
        ])
        .unwrap();

        assert_eq!(array.rows(), 2);
        assert_eq!(array.cols(), 2);
        assert_eq!(array.get(1, 0), Some(&ScalarValue::Number(3.0)));
        assert_eq!(array.get(2, 0), None);
        assert_eq!(array.top_left(), &ScalarValue::Number(1.0));
    }

    #[test]
    fn test_ragged_array_is_value_error() {
        let ragged = Array::from_rows(vec![vec![1.0.into()], vec![]]);
        assert_eq!(ragged, Err(CellError::Value));
        assert_eq!(Array::from_rows(vec![]), Err(CellError::Value));
    }

    #[test]
    fn test_array_size_limit() {
        let max_rows = crate::MAX_ROWS as usize;
        assert!(Array::fits(max_rows, 2));
        assert!(!Array::fits(max_rows, 3));
        assert!(!Array::fits(max_rows, crate::MAX_COLS as usize));
        assert!(!Array::fits(usize::MAX, 2));
        assert_eq!(
            Array::too_large().top_left(),
            &ScalarValue::Error(CellError::Calc)
        );
    }

    #[test]
    fn test_pick_shapes() {
        let array = Array::filled(1, 2, 0.0.into());
        let picked = AnyValue::from(array.clone()).try_pick_scalar();
        assert_eq!(picked, Err(Collection::Array(array.clone())));
        assert_eq!(Collection::Array(array.clone()).try_pick_array(), Ok(array));

        let reference = Reference::from(Area::new(SheetRange::parse("A1:B2").unwrap()));
        let picked = AnyValue::from(reference.clone()).try_pick_scalar();
        assert_eq!(picked, Err(Collection::Reference(reference.clone())));
        assert_eq!(
            Collection::Reference(reference.clone()).try_pick_array(),
            Err(reference)
        );
    }
}
