//! Worksheet type

use std::sync::Arc;

use crate::cell::{
    Cell, CellsCollection, FormulaEntry, ScalarValue, SheetId, SheetPoint, SheetRange,
};
use crate::error::Result;
use crate::formula::FormulaExpr;

/// A worksheet (single sheet in a workbook)
#[derive(Debug, Clone)]
pub struct Worksheet {
    /// Stable id assigned by the workbook
    id: SheetId,
    /// Sheet name
    name: String,
    /// Value and formula slices
    cells: CellsCollection,
}

impl Worksheet {
    /// Create a new worksheet with the given id and name
    pub(crate) fn new<S: Into<String>>(id: SheetId, name: S) -> Self {
        Self {
            id,
            name: name.into(),
            cells: CellsCollection::new(id),
        }
    }

    /// Get the sheet id
    pub fn id(&self) -> SheetId {
        self.id
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// The sheet's cell storage
    pub fn cells(&self) -> &CellsCollection {
        &self.cells
    }

    /// The sheet's cell storage, mutably
    pub fn cells_mut(&mut self) -> &mut CellsCollection {
        &mut self.cells
    }

    // === Cell Access ===

    /// Get the stored value of a cell
    pub fn get_value(&self, point: SheetPoint) -> ScalarValue {
        self.cells.get_cell_value(point)
    }

    /// Get the stored value of a cell by address string (e.g., "A1")
    pub fn get_value_a1(&self, address: &str) -> Result<ScalarValue> {
        Ok(self.get_value(SheetPoint::parse(address)?))
    }

    /// Handle to a cell
    pub fn cell(&self, point: SheetPoint) -> Cell<'_> {
        self.cells.cell(point)
    }

    /// Get the formula of a cell
    pub fn formula(&self, point: SheetPoint) -> Option<&FormulaEntry> {
        self.cells.formula(point)
    }

    /// Check if a cell holds a formula awaiting recalculation
    pub fn is_dirty(&self, point: SheetPoint) -> bool {
        self.cells
            .formula(point)
            .map(FormulaEntry::is_dirty)
            .unwrap_or(false)
    }

    // === Cell Modification ===

    /// Set a constant value, replacing any formula in the cell
    pub fn set_value<V: Into<ScalarValue>>(&mut self, point: SheetPoint, value: V) {
        self.cells.remove_formula(point);
        self.cells.set_value(point, value.into());
    }

    /// Set a constant value by address string
    pub fn set_value_a1<V: Into<ScalarValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let point = SheetPoint::parse(address)?;
        self.set_value(point, value);
        Ok(())
    }

    /// Set a formula. The cell becomes dirty and keeps its previous value
    /// until it is recalculated.
    pub fn set_formula(&mut self, point: SheetPoint, expr: impl Into<Arc<FormulaExpr>>) {
        self.cells.set_formula(point, FormulaEntry::new(expr));
    }

    /// Set a formula by address string
    pub fn set_formula_a1(&mut self, address: &str, expr: FormulaExpr) -> Result<()> {
        let point = SheetPoint::parse(address)?;
        self.set_formula(point, expr);
        Ok(())
    }

    /// Set a legacy array formula
    pub fn set_array_formula(&mut self, point: SheetPoint, expr: impl Into<Arc<FormulaExpr>>) {
        self.cells.set_formula(point, FormulaEntry::array(expr));
    }

    /// Clear a cell's value and formula
    pub fn clear_cell(&mut self, point: SheetPoint) {
        self.cells.remove_formula(point);
        self.cells.value_slice_mut().remove(point);
    }

    /// Flag the formula at a point for recalculation.
    ///
    /// Returns false when the cell holds no formula.
    pub fn mark_dirty(&mut self, point: SheetPoint) -> bool {
        match self.cells.formula_mut(point) {
            Some(entry) => {
                entry.mark_dirty();
                true
            }
            None => false,
        }
    }

    /// Flag every formula of the sheet for recalculation
    pub fn mark_all_dirty(&mut self) {
        self.cells.formula_slice_mut().mark_all_dirty();
    }

    // === Range Operations ===

    /// Occupied points inside a range, row-major
    pub fn for_values_and_formulas(
        &self,
        range: SheetRange,
    ) -> impl Iterator<Item = SheetPoint> + '_ {
        self.cells.for_values_and_formulas(range)
    }

    /// Get the used range (bounds of all non-empty cells)
    pub fn used_range(&self) -> Option<SheetRange> {
        self.cells.used_range()
    }

    /// Number of formula cells
    pub fn formula_count(&self) -> usize {
        self.cells.formula_slice().len()
    }

    /// Number of formula cells awaiting recalculation
    pub fn dirty_count(&self) -> usize {
        self.cells.formula_slice().dirty_points().count()
    }
}
