//! Cell address and range types
//!
//! All coordinates are 1-based, matching the way a spreadsheet user sees them:
//! `A1` is row 1, column 1.

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a worksheet inside a workbook.
///
/// Ids are assigned when a sheet is added and never reused, so a [`BookPoint`]
/// stays meaningful even when sheets are reordered or renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetId(pub u32);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cell position within a single sheet.
///
/// Points order row-major: first by row, then by column. This is the key
/// order of the storage slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetPoint {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based, A=1)
    pub column: u16,
}

impl SheetPoint {
    /// Create a new point.
    ///
    /// Coordinates are expected to lie within the grid; use
    /// [`SheetPoint::try_new`] for unchecked input.
    pub const fn new(row: u32, column: u16) -> Self {
        Self { row, column }
    }

    /// Create a point, validating both coordinates against the grid extent
    pub fn try_new(row: u32, column: u32) -> Result<Self> {
        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }
        if column == 0 || column > MAX_COLS as u32 {
            return Err(Error::ColumnOutOfBounds(column, MAX_COLS));
        }
        Ok(Self::new(row, column as u16))
    }

    /// Parse a point from A1-style notation. `$` markers are accepted and ignored.
    ///
    /// # Examples
    /// ```
    /// use sheetcalc_core::SheetPoint;
    ///
    /// let point = SheetPoint::parse("B3").unwrap();
    /// assert_eq!(point, SheetPoint::new(3, 2));
    ///
    /// let point = SheetPoint::parse("$XFD$1048576").unwrap();
    /// assert_eq!(point, SheetPoint::new(1_048_576, 16_384));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let cleaned: String = s.chars().filter(|&c| c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidAddress(format!("no row number in '{}'", s)))?;

        let (letters, digits) = cleaned.split_at(split);
        if letters.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }

        let column = Self::letters_to_column(letters)?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        Self::try_new(row, column as u32)
    }

    /// Convert a 1-based column number to letters (1 = A, 26 = Z, 27 = AA)
    pub fn column_to_letters(column: u16) -> String {
        let mut result = String::new();
        let mut n = column as u32;

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to a 1-based column number (A = 1, AA = 27)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut column: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            column = column * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if column > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(column, MAX_COLS));
            }
        }

        Ok(column as u16)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.column), self.row)
    }
}

impl fmt::Display for SheetPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for SheetPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A cell position anywhere in a workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookPoint {
    pub sheet: SheetId,
    pub point: SheetPoint,
}

impl BookPoint {
    /// Create a new book point
    pub const fn new(sheet: SheetId, point: SheetPoint) -> Self {
        Self { sheet, point }
    }
}

impl fmt::Display for BookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.point)
    }
}

/// A rectangular span of cells on one sheet (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetRange {
    /// Top-left corner
    pub first: SheetPoint,
    /// Bottom-right corner
    pub last: SheetPoint,
}

impl SheetRange {
    /// Create a new range; corners are normalized so `first` is top-left
    pub fn new(a: SheetPoint, b: SheetPoint) -> Self {
        Self {
            first: SheetPoint::new(a.row.min(b.row), a.column.min(b.column)),
            last: SheetPoint::new(a.row.max(b.row), a.column.max(b.column)),
        }
    }

    /// Create a single-cell range
    pub fn single(point: SheetPoint) -> Self {
        Self {
            first: point,
            last: point,
        }
    }

    /// Create a range from 1-based row/column bounds
    pub fn from_bounds(first_row: u32, first_col: u16, last_row: u32, last_col: u16) -> Self {
        Self::new(
            SheetPoint::new(first_row, first_col),
            SheetPoint::new(last_row, last_col),
        )
    }

    /// Whole columns `first_col..=last_col`
    pub fn columns(first_col: u16, last_col: u16) -> Self {
        Self::from_bounds(1, first_col, MAX_ROWS, last_col)
    }

    /// Whole rows `first_row..=last_row`
    pub fn rows(first_row: u32, last_row: u32) -> Self {
        Self::from_bounds(first_row, 1, last_row, MAX_COLS)
    }

    /// Parse `A1:B10`, `C3`, whole columns `A:C` or whole rows `2:5`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let Some((left, right)) = s.split_once(':') else {
            return Ok(Self::single(SheetPoint::parse(s)?));
        };

        let left = left.trim_matches('$');
        let right = right.trim_matches('$');

        let is_letters = |text: &str| !text.is_empty() && text.chars().all(|c| c.is_ascii_alphabetic());
        let is_digits = |text: &str| !text.is_empty() && text.chars().all(|c| c.is_ascii_digit());

        if is_letters(left) && is_letters(right) {
            let first = SheetPoint::letters_to_column(left)?;
            let last = SheetPoint::letters_to_column(right)?;
            return Ok(Self::columns(first.min(last), first.max(last)));
        }

        if is_digits(left) && is_digits(right) {
            let parse_row = |text: &str| -> Result<u32> {
                let row: u32 = text
                    .parse()
                    .map_err(|_| Error::InvalidRange(format!("invalid row in '{}'", s)))?;
                SheetPoint::try_new(row, 1).map(|p| p.row)
            };
            let first = parse_row(left)?;
            let last = parse_row(right)?;
            return Ok(Self::rows(first.min(last), first.max(last)));
        }

        Ok(Self::new(SheetPoint::parse(left)?, SheetPoint::parse(right)?))
    }

    /// Check if a point is within this range
    pub fn contains(&self, point: SheetPoint) -> bool {
        point.row >= self.first.row
            && point.row <= self.last.row
            && point.column >= self.first.column
            && point.column <= self.last.column
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.last.row - self.first.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.last.column - self.first.column + 1
    }

    /// Total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &SheetRange) -> bool {
        self.first.row <= other.last.row
            && self.last.row >= other.first.row
            && self.first.column <= other.last.column
            && self.last.column >= other.first.column
    }

    /// Get the intersection of two ranges, if any
    pub fn intersect(&self, other: &SheetRange) -> Option<SheetRange> {
        if !self.overlaps(other) {
            return None;
        }

        Some(SheetRange::from_bounds(
            self.first.row.max(other.first.row),
            self.first.column.max(other.first.column),
            self.last.row.min(other.last.row),
            self.last.column.min(other.last.column),
        ))
    }

    /// Smallest range containing both ranges (the `:` range operator)
    pub fn bounding(&self, other: &SheetRange) -> SheetRange {
        SheetRange::from_bounds(
            self.first.row.min(other.first.row),
            self.first.column.min(other.first.column),
            self.last.row.max(other.last.row),
            self.last.column.max(other.last.column),
        )
    }

    /// Iterate over every point in the range, row by row.
    ///
    /// This walks the full rectangle. Use the slice iterators to visit only
    /// occupied cells.
    pub fn points(&self) -> impl Iterator<Item = SheetPoint> {
        let range = *self;
        (range.first.row..=range.last.row).flat_map(move |row| {
            (range.first.column..=range.last.column)
                .map(move |column| SheetPoint::new(row, column))
        })
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.first == self.last {
            self.first.to_a1_string()
        } else {
            format!("{}:{}", self.first.to_a1_string(), self.last.to_a1_string())
        }
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for SheetRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<SheetPoint> for SheetRange {
    fn from(point: SheetPoint) -> Self {
        SheetRange::single(point)
    }
}
