//! Scalar cell values

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::culture::Culture;

/// A single spreadsheet value.
///
/// `Blank` is never stored: absence from the value slice *is* blank.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScalarValue {
    /// Empty cell (no value)
    #[default]
    Blank,

    /// Logical value (TRUE/FALSE)
    Logical(bool),

    /// Numeric value (all numbers stored as f64, including dates)
    Number(f64),

    /// Text value
    Text(SharedString),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),
}

impl ScalarValue {
    /// Create a new text value
    pub fn text<S: AsRef<str>>(s: S) -> Self {
        ScalarValue::Text(SharedString::new(s))
    }

    /// Check if the value is blank
    pub fn is_blank(&self) -> bool {
        matches!(self, ScalarValue::Blank)
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, ScalarValue::Error(_))
    }

    /// Get the error if this is one
    pub fn error(&self) -> Option<CellError> {
        match self {
            ScalarValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Get the number if this is exactly a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the text if this is exactly text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerce to a number the way arithmetic operators do.
    ///
    /// Blank is 0, logicals are 0/1, text must parse under `culture`,
    /// errors propagate.
    pub fn to_number(&self, culture: &Culture) -> Result<f64, CellError> {
        match self {
            ScalarValue::Blank => Ok(0.0),
            ScalarValue::Logical(b) => Ok(if *b { 1.0 } else { 0.0 }),
            ScalarValue::Number(n) => Ok(*n),
            ScalarValue::Text(s) => culture.parse_number(s.as_str()).ok_or(CellError::Value),
            ScalarValue::Error(e) => Err(*e),
        }
    }

    /// Coerce to a logical the way logical functions do
    pub fn to_logical(&self, culture: &Culture) -> Result<bool, CellError> {
        match self {
            ScalarValue::Blank => Ok(false),
            ScalarValue::Logical(b) => Ok(*b),
            ScalarValue::Number(n) => Ok(*n != 0.0),
            ScalarValue::Text(s) => {
                if culture.text_equals(s.as_str(), "TRUE") {
                    Ok(true)
                } else if culture.text_equals(s.as_str(), "FALSE") {
                    Ok(false)
                } else {
                    Err(CellError::Value)
                }
            }
            ScalarValue::Error(e) => Err(*e),
        }
    }

    /// Coerce to text the way the concatenation operator does
    pub fn to_text(&self) -> Result<String, CellError> {
        match self {
            ScalarValue::Error(e) => Err(*e),
            other => Ok(other.to_string()),
        }
    }

    /// Spreadsheet ordering of two values.
    ///
    /// Blank compares as the "zero" of the other operand's type. Across types,
    /// numbers sort before text and text before logicals. Text ordering follows
    /// `culture`. Errors order by their code and after every other value.
    pub fn compare(&self, other: &ScalarValue, culture: &Culture) -> Ordering {
        use ScalarValue::*;

        match (self, other) {
            (Blank, Blank) => Ordering::Equal,
            (Blank, Number(_)) => Number(0.0).compare(other, culture),
            (Number(_), Blank) => self.compare(&Number(0.0), culture),
            (Blank, Text(_)) => ScalarValue::text("").compare(other, culture),
            (Text(_), Blank) => self.compare(&ScalarValue::text(""), culture),
            (Blank, Logical(_)) => Logical(false).compare(other, culture),
            (Logical(_), Blank) => self.compare(&Logical(false), culture),

            (Number(l), Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
            (Text(l), Text(r)) => culture.compare_text(l.as_str(), r.as_str()),
            (Logical(l), Logical(r)) => l.cmp(r),
            (Error(l), Error(r)) => l.code().cmp(&r.code()),

            (Error(_), _) => Ordering::Greater,
            (_, Error(_)) => Ordering::Less,
            (l, r) => l.type_rank().cmp(&r.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            ScalarValue::Blank => 0,
            ScalarValue::Number(_) => 1,
            ScalarValue::Text(_) => 2,
            ScalarValue::Logical(_) => 3,
            ScalarValue::Error(_) => 4,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Blank => "blank",
            ScalarValue::Logical(_) => "logical",
            ScalarValue::Number(_) => "number",
            ScalarValue::Text(_) => "text",
            ScalarValue::Error(_) => "error",
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Blank => Ok(()),
            ScalarValue::Logical(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            ScalarValue::Number(n) => {
                // No trailing ".0" for integral values, like a spreadsheet shows them
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            ScalarValue::Text(s) => write!(f, "{}", s.as_str()),
            ScalarValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Logical(b)
    }
}

impl From<i32> for ScalarValue {
    fn from(n: i32) -> Self {
        ScalarValue::Number(n as f64)
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Number(n)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::text(s)
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::text(s)
    }
}

impl From<CellError> for ScalarValue {
    fn from(e: CellError) -> Self {
        ScalarValue::Error(e)
    }
}

/// Excel error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #CALC! - Calculation error
    Calc,
}

impl CellError {
    /// Error written into every cell of a circular reference
    pub const CIRCULAR: CellError = CellError::Ref;

    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
            CellError::Calc => "#CALC!",
        }
    }

    /// Parse an error string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            "#CALC!" => Some(CellError::Calc),
            _ => None,
        }
    }

    /// Get the numeric error code (BIFF numbering)
    pub fn code(&self) -> u8 {
        match self {
            CellError::Null => 0x00,
            CellError::Div0 => 0x07,
            CellError::Value => 0x0F,
            CellError::Ref => 0x17,
            CellError::Name => 0x1D,
            CellError::Num => 0x24,
            CellError::Na => 0x2A,
            CellError::Calc => 0x2D,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Interned string for memory efficiency
///
/// Using Arc<str> allows sharing the same string data across cells and
/// across values copied out of the slices during evaluation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SharedString(Arc<str>);

impl SharedString {
    /// Create a new shared string
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    /// Get the string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length of the string in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the string is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
    }
}
