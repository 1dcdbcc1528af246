//! Formula expression tree
//!
//! The tree a formula parser produces and the evaluator consumes. Sheet
//! qualifiers are already resolved to [`SheetId`]s, so an expression stays
//! valid when sheets are renamed.

use crate::cell::{CellError, SheetId, SheetPoint, SheetRange};
use crate::error::Result;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal
    Error(CellError),

    // === References ===
    /// Single cell reference
    CellRef(CellReference),
    /// Range reference, possibly spanning several sheets
    RangeRef(RangeReference),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function { name: String, args: Vec<FormulaExpr> },

    // === Array ===
    Array(Vec<Vec<FormulaExpr>>),
}

/// Cell reference with optional sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellReference {
    pub sheet: Option<SheetId>,
    pub point: SheetPoint,
}

/// Range reference with optional sheet.
///
/// When `end_sheet` is set the reference is 3D: it covers `range` on every
/// sheet positioned from `sheet` to `end_sheet` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeReference {
    pub sheet: Option<SheetId>,
    pub end_sheet: Option<SheetId>,
    pub range: SheetRange,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,

    // Reference
    Range,
    Union,
    Intersect,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

impl FormulaExpr {
    /// Numeric literal
    pub fn number(n: f64) -> Self {
        FormulaExpr::Number(n)
    }

    /// String literal
    pub fn text<S: Into<String>>(s: S) -> Self {
        FormulaExpr::String(s.into())
    }

    /// Reference to a cell on the formula's own sheet
    pub fn cell(point: SheetPoint) -> Self {
        FormulaExpr::CellRef(CellReference { sheet: None, point })
    }

    /// Reference to a cell on another sheet
    pub fn sheet_cell(sheet: SheetId, point: SheetPoint) -> Self {
        FormulaExpr::CellRef(CellReference {
            sheet: Some(sheet),
            point,
        })
    }

    /// Reference to a range on the formula's own sheet
    pub fn range(range: SheetRange) -> Self {
        FormulaExpr::RangeRef(RangeReference {
            sheet: None,
            end_sheet: None,
            range,
        })
    }

    /// Reference to a range on another sheet
    pub fn sheet_range(sheet: SheetId, range: SheetRange) -> Self {
        FormulaExpr::RangeRef(RangeReference {
            sheet: Some(sheet),
            end_sheet: None,
            range,
        })
    }

    /// 3D reference to `range` on every sheet from `first` to `last`
    pub fn sheets_range(first: SheetId, last: SheetId, range: SheetRange) -> Self {
        FormulaExpr::RangeRef(RangeReference {
            sheet: Some(first),
            end_sheet: Some(last),
            range,
        })
    }

    /// Parse an unqualified A1 reference (`B2`, `A1:C3`, `A:A`, `2:2`)
    pub fn reference(a1: &str) -> Result<Self> {
        if a1.contains(':') {
            Ok(Self::range(SheetRange::parse(a1)?))
        } else {
            Ok(Self::cell(SheetPoint::parse(a1)?))
        }
    }

    /// Binary operation
    pub fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> Self {
        FormulaExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left + right`
    pub fn add(left: FormulaExpr, right: FormulaExpr) -> Self {
        Self::binary(BinaryOperator::Add, left, right)
    }

    /// Unary operation
    pub fn unary(op: UnaryOperator, operand: FormulaExpr) -> Self {
        FormulaExpr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Function call
    pub fn function<S: Into<String>>(name: S, args: Vec<FormulaExpr>) -> Self {
        FormulaExpr::Function {
            name: name.into(),
            args,
        }
    }

    /// Check if the expression is a reference (evaluates to an area)
    pub fn is_reference(&self) -> bool {
        match self {
            FormulaExpr::CellRef(_) | FormulaExpr::RangeRef(_) => true,
            FormulaExpr::BinaryOp { op, .. } => matches!(
                op,
                BinaryOperator::Range | BinaryOperator::Union | BinaryOperator::Intersect
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reference_helper() {
        assert_eq!(
            FormulaExpr::reference("$B$2").unwrap(),
            FormulaExpr::cell(SheetPoint::new(2, 2))
        );
        assert_eq!(
            FormulaExpr::reference("A:A").unwrap(),
            FormulaExpr::range(SheetRange::columns(1, 1))
        );
        assert!(FormulaExpr::reference("not a ref").is_err());
    }

    #[test]
    fn test_is_reference() {
        let a1 = FormulaExpr::cell(SheetPoint::new(1, 1));
        assert!(a1.is_reference());
        assert!(FormulaExpr::binary(BinaryOperator::Union, a1.clone(), a1.clone()).is_reference());
        assert!(!FormulaExpr::add(a1, FormulaExpr::number(1.0)).is_reference());
    }
}
