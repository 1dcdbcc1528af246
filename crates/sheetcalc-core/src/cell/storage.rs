//! Cell storage implementation
//!
//! This module provides sparse storage for spreadsheet cells. A worksheet keeps
//! two independent slices: the value slice holds the last entered or computed
//! scalar of each occupied cell, the formula slice holds the expression and
//! dirty flag of each formula cell. Only occupied cells are stored.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::sync::Arc;

use super::{BookPoint, ScalarValue, SheetId, SheetPoint, SheetRange};
use crate::formula::FormulaExpr;

/// Sparse row-based map from cell position to `T`
///
/// Design decisions:
/// - Uses BTreeMap on both levels so a rectangle is walked with two range seeks
/// - Row-major layout matches the iteration order callers expect
/// - Iterating an area costs the occupied rows and cells inside it, never the
///   size of the rectangle (a full column is as cheap as its populated cells)
///
/// Structure: `BTreeMap<row, BTreeMap<column, T>>`
#[derive(Debug, Clone)]
pub struct Slice<T> {
    rows: BTreeMap<u32, BTreeMap<u16, T>>,
    len: usize,
}

impl<T> Slice<T> {
    /// Create a new empty slice
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            len: 0,
        }
    }

    /// Get the entry at a point
    pub fn get(&self, point: SheetPoint) -> Option<&T> {
        self.rows.get(&point.row).and_then(|r| r.get(&point.column))
    }

    /// Get the entry at a point mutably
    pub fn get_mut(&mut self, point: SheetPoint) -> Option<&mut T> {
        self.rows
            .get_mut(&point.row)
            .and_then(|r| r.get_mut(&point.column))
    }

    /// Check if a point is occupied
    pub fn contains(&self, point: SheetPoint) -> bool {
        self.get(point).is_some()
    }

    /// Store an entry, returning the previous one
    pub fn set(&mut self, point: SheetPoint, item: T) -> Option<T> {
        let previous = self
            .rows
            .entry(point.row)
            .or_default()
            .insert(point.column, item);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Remove an entry
    pub fn remove(&mut self, point: SheetPoint) -> Option<T> {
        let row_map = self.rows.get_mut(&point.row)?;
        let removed = row_map.remove(&point.column);

        // Clean up empty rows
        if row_map.is_empty() {
            self.rows.remove(&point.row);
        }
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.rows.clear();
        self.len = 0;
    }

    /// Number of occupied points
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the slice is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over all entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (SheetPoint, &T)> {
        self.rows.iter().flat_map(|(&row, cols)| {
            cols.iter()
                .map(move |(&column, item)| (SheetPoint::new(row, column), item))
        })
    }

    /// Iterate mutably over all entries in row-major order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SheetPoint, &mut T)> {
        self.rows.iter_mut().flat_map(|(&row, cols)| {
            cols.iter_mut()
                .map(move |(&column, item)| (SheetPoint::new(row, column), item))
        })
    }

    /// Lazily iterate over the entries inside `range` in row-major order
    pub fn range(&self, range: SheetRange) -> impl Iterator<Item = (SheetPoint, &T)> + '_ {
        let columns = range.first.column..=range.last.column;
        self.rows
            .range(range.first.row..=range.last.row)
            .flat_map(move |(&row, cols)| {
                cols.range(columns.clone())
                    .map(move |(&column, item)| (SheetPoint::new(row, column), item))
            })
    }

    /// Lazily iterate over the occupied points inside `range`
    pub fn points(&self, range: SheetRange) -> impl Iterator<Item = SheetPoint> + '_ {
        self.range(range).map(|(point, _)| point)
    }

    /// Smallest range containing every entry, or None if empty
    pub fn used_range(&self) -> Option<SheetRange> {
        let first_row = *self.rows.keys().next()?;
        let last_row = *self.rows.keys().next_back()?;

        let mut first_col = u16::MAX;
        let mut last_col = 0u16;
        for cols in self.rows.values() {
            if let Some(&col) = cols.keys().next() {
                first_col = first_col.min(col);
            }
            if let Some(&col) = cols.keys().next_back() {
                last_col = last_col.max(col);
            }
        }

        Some(SheetRange::from_bounds(first_row, first_col, last_row, last_col))
    }
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Last entered or computed value of every non-blank cell
#[derive(Debug, Clone, Default)]
pub struct ValueSlice {
    slice: Slice<ScalarValue>,
}

impl ValueSlice {
    /// Create an empty value slice
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at a point; blank when the point is not stored
    pub fn get_cell_value(&self, point: SheetPoint) -> ScalarValue {
        self.slice.get(point).cloned().unwrap_or_default()
    }

    /// Borrow the stored value at a point
    pub fn get(&self, point: SheetPoint) -> Option<&ScalarValue> {
        self.slice.get(point)
    }

    /// Store a value. Storing blank removes the point.
    pub fn set_cell_value(&mut self, point: SheetPoint, value: ScalarValue) {
        if value.is_blank() {
            self.slice.remove(point);
        } else {
            self.slice.set(point, value);
        }
    }

    /// Remove the value at a point
    pub fn remove(&mut self, point: SheetPoint) -> Option<ScalarValue> {
        self.slice.remove(point)
    }

    /// Number of non-blank values
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    /// Check if no value is stored
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    /// Lazily iterate over the stored values inside `range`
    pub fn range(&self, range: SheetRange) -> impl Iterator<Item = (SheetPoint, &ScalarValue)> + '_ {
        self.slice.range(range)
    }

    /// Access the underlying sparse map
    pub fn as_slice(&self) -> &Slice<ScalarValue> {
        &self.slice
    }

    /// Remove every value
    pub fn clear(&mut self) {
        self.slice.clear();
    }
}

/// Formula stored in a cell together with its recalculation state
#[derive(Debug, Clone)]
pub struct FormulaEntry {
    expr: Arc<FormulaExpr>,
    is_dirty: bool,
    is_array: bool,
}

impl FormulaEntry {
    /// Create a dirty entry for a newly entered formula
    pub fn new(expr: impl Into<Arc<FormulaExpr>>) -> Self {
        Self {
            expr: expr.into(),
            is_dirty: true,
            is_array: false,
        }
    }

    /// Create a dirty entry for a legacy array (CSE) formula.
    ///
    /// Array formulas evaluate scalar functions once per element of a
    /// multi-valued argument instead of narrowing it by implicit intersection.
    pub fn array(expr: impl Into<Arc<FormulaExpr>>) -> Self {
        Self {
            is_array: true,
            ..Self::new(expr)
        }
    }

    /// The compiled expression
    pub fn expr(&self) -> &Arc<FormulaExpr> {
        &self.expr
    }

    /// Whether the stored value may not reflect the current inputs
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Whether the formula was entered as an array formula
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Flag the formula for recalculation
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Flag the formula as up to date
    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }
}

/// Formula of every formula cell
#[derive(Debug, Clone, Default)]
pub struct FormulaSlice {
    slice: Slice<FormulaEntry>,
}

impl FormulaSlice {
    /// Create an empty formula slice
    pub fn new() -> Self {
        Self::default()
    }

    /// Formula at a point
    pub fn get(&self, point: SheetPoint) -> Option<&FormulaEntry> {
        self.slice.get(point)
    }

    /// Formula at a point, mutably
    pub fn get_mut(&mut self, point: SheetPoint) -> Option<&mut FormulaEntry> {
        self.slice.get_mut(point)
    }

    /// Store a formula, returning the previous one
    pub fn set(&mut self, point: SheetPoint, entry: FormulaEntry) -> Option<FormulaEntry> {
        self.slice.set(point, entry)
    }

    /// Remove the formula at a point
    pub fn remove(&mut self, point: SheetPoint) -> Option<FormulaEntry> {
        self.slice.remove(point)
    }

    /// Number of formula cells
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    /// Check if the slice holds no formula
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    /// Iterate over all formulas in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (SheetPoint, &FormulaEntry)> {
        self.slice.iter()
    }

    /// Lazily iterate over the formulas inside `range`
    pub fn range(&self, range: SheetRange) -> impl Iterator<Item = (SheetPoint, &FormulaEntry)> + '_ {
        self.slice.range(range)
    }

    /// Points of all dirty formulas in row-major order
    pub fn dirty_points(&self) -> impl Iterator<Item = SheetPoint> + '_ {
        self.slice
            .iter()
            .filter(|(_, entry)| entry.is_dirty())
            .map(|(point, _)| point)
    }

    /// Flag every formula for recalculation
    pub fn mark_all_dirty(&mut self) {
        for (_, entry) in self.slice.iter_mut() {
            entry.mark_dirty();
        }
    }

    /// Access the underlying sparse map
    pub fn as_slice(&self) -> &Slice<FormulaEntry> {
        &self.slice
    }

    /// Remove every formula
    pub fn clear(&mut self) {
        self.slice.clear();
    }
}

/// Handle to an occupied cell, borrowed from its sheet's storage
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    sheet: SheetId,
    point: SheetPoint,
    value: Option<&'a ScalarValue>,
    formula: Option<&'a FormulaEntry>,
}

impl<'a> Cell<'a> {
    /// Sheet of the cell
    pub fn sheet(&self) -> SheetId {
        self.sheet
    }

    /// Position of the cell in its sheet
    pub fn point(&self) -> SheetPoint {
        self.point
    }

    /// Position of the cell in the workbook
    pub fn address(&self) -> BookPoint {
        BookPoint::new(self.sheet, self.point)
    }

    /// Row number (1-based)
    pub fn row(&self) -> u32 {
        self.point.row
    }

    /// Column number (1-based)
    pub fn column(&self) -> u16 {
        self.point.column
    }

    /// The stored value (possibly stale for a dirty formula)
    pub fn value(&self) -> ScalarValue {
        self.value.cloned().unwrap_or_default()
    }

    /// The formula of the cell, if it has one
    pub fn formula(&self) -> Option<&'a FormulaEntry> {
        self.formula
    }

    /// Check if the cell holds a formula
    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Check if the cell holds a formula that awaits recalculation
    pub fn is_dirty(&self) -> bool {
        self.formula.map(FormulaEntry::is_dirty).unwrap_or(false)
    }

    /// A cell is empty when it has neither a value nor a formula
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.formula.is_none()
    }
}

/// Row-major union of two sorted point sequences; a point present in both is
/// yielded once.
pub struct UnionPoints<A: Iterator<Item = SheetPoint>, B: Iterator<Item = SheetPoint>> {
    left: Peekable<A>,
    right: Peekable<B>,
}

impl<A, B> UnionPoints<A, B>
where
    A: Iterator<Item = SheetPoint>,
    B: Iterator<Item = SheetPoint>,
{
    fn new(left: A, right: B) -> Self {
        Self {
            left: left.peekable(),
            right: right.peekable(),
        }
    }
}

impl<A, B> Iterator for UnionPoints<A, B>
where
    A: Iterator<Item = SheetPoint>,
    B: Iterator<Item = SheetPoint>,
{
    type Item = SheetPoint;

    fn next(&mut self) -> Option<SheetPoint> {
        match (self.left.peek(), self.right.peek()) {
            (Some(l), Some(r)) => match l.cmp(r) {
                std::cmp::Ordering::Less => self.left.next(),
                std::cmp::Ordering::Greater => self.right.next(),
                std::cmp::Ordering::Equal => {
                    self.right.next();
                    self.left.next()
                }
            },
            (Some(_), None) => self.left.next(),
            (None, Some(_)) => self.right.next(),
            (None, None) => None,
        }
    }
}

/// The two slices of one worksheet
#[derive(Debug, Clone)]
pub struct CellsCollection {
    sheet: SheetId,
    values: ValueSlice,
    formulas: FormulaSlice,
}

impl CellsCollection {
    /// Create empty storage for a sheet
    pub fn new(sheet: SheetId) -> Self {
        Self {
            sheet,
            values: ValueSlice::new(),
            formulas: FormulaSlice::new(),
        }
    }

    /// Id of the sheet that owns this storage
    pub fn sheet_id(&self) -> SheetId {
        self.sheet
    }

    /// The value slice
    pub fn value_slice(&self) -> &ValueSlice {
        &self.values
    }

    /// The value slice, mutably
    pub fn value_slice_mut(&mut self) -> &mut ValueSlice {
        &mut self.values
    }

    /// The formula slice
    pub fn formula_slice(&self) -> &FormulaSlice {
        &self.formulas
    }

    /// The formula slice, mutably
    pub fn formula_slice_mut(&mut self) -> &mut FormulaSlice {
        &mut self.formulas
    }

    /// Stored value at a point (blank if absent)
    pub fn get_cell_value(&self, point: SheetPoint) -> ScalarValue {
        self.values.get_cell_value(point)
    }

    /// Store a value; blank removes the entry
    pub fn set_value(&mut self, point: SheetPoint, value: ScalarValue) {
        self.values.set_cell_value(point, value);
    }

    /// Formula at a point
    pub fn formula(&self, point: SheetPoint) -> Option<&FormulaEntry> {
        self.formulas.get(point)
    }

    /// Formula at a point, mutably
    pub fn formula_mut(&mut self, point: SheetPoint) -> Option<&mut FormulaEntry> {
        self.formulas.get_mut(point)
    }

    /// Store a formula, returning the previous one
    pub fn set_formula(&mut self, point: SheetPoint, entry: FormulaEntry) -> Option<FormulaEntry> {
        self.formulas.set(point, entry)
    }

    /// Remove the formula at a point. The last computed value stays.
    pub fn remove_formula(&mut self, point: SheetPoint) -> Option<FormulaEntry> {
        self.formulas.remove(point)
    }

    /// Every point inside `range` that has a value or a formula, row-major.
    ///
    /// A formula cell whose computed value is blank (or not computed yet)
    /// still exists and is yielded.
    pub fn for_values_and_formulas(
        &self,
        range: SheetRange,
    ) -> impl Iterator<Item = SheetPoint> + '_ {
        UnionPoints::new(
            self.values.as_slice().points(range),
            self.formulas.as_slice().points(range),
        )
    }

    /// Occupied cells inside `range` that satisfy `predicate`, row-major
    pub fn get_cells<'a, P>(
        &'a self,
        range: SheetRange,
        predicate: P,
    ) -> impl Iterator<Item = Cell<'a>> + 'a
    where
        P: Fn(&Cell<'a>) -> bool + 'a,
    {
        self.for_values_and_formulas(range)
            .map(move |point| self.cell(point))
            .filter(move |cell| predicate(cell))
    }

    /// Handle to the cell at a point (which may be empty)
    pub fn cell(&self, point: SheetPoint) -> Cell<'_> {
        Cell {
            sheet: self.sheet,
            point,
            value: self.values.get(point),
            formula: self.formulas.get(point),
        }
    }

    /// Number of occupied cells (value or formula)
    pub fn cell_count(&self) -> usize {
        match self.used_range() {
            Some(range) => self.for_values_and_formulas(range).count(),
            None => 0,
        }
    }

    /// Check if no cell is occupied
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.formulas.is_empty()
    }

    /// Smallest range containing every occupied cell
    pub fn used_range(&self) -> Option<SheetRange> {
        match (
            self.values.as_slice().used_range(),
            self.formulas.as_slice().used_range(),
        ) {
            (Some(a), Some(b)) => Some(a.bounding(&b)),
            (a, b) => a.or(b),
        }
    }

    /// Clear all cells
    pub fn clear(&mut self) {
        self.values.clear();
        self.formulas.clear();
    }
}
