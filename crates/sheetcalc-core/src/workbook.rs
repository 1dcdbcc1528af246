//! Workbook type - the main document structure

use crate::cell::{BookPoint, ScalarValue, SheetId};
use crate::culture::Culture;
use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook (spreadsheet document)
///
/// A workbook contains ordered worksheets and global settings. Sheets are
/// addressed by their stable [`SheetId`]; their position only matters for
/// 3D references and for the order of a recalculation pass.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Worksheets in the workbook, in tab order
    worksheets: Vec<Worksheet>,
    /// Workbook settings
    settings: WorkbookSettings,
    /// Next id to hand out; ids are never reused
    next_sheet_id: u32,
}

impl Workbook {
    /// Create an empty workbook with no worksheets
    pub fn new() -> Self {
        Self::with_settings(WorkbookSettings::default())
    }

    /// Create an empty workbook with the given settings
    pub fn with_settings(settings: WorkbookSettings) -> Self {
        Self {
            worksheets: Vec::new(),
            settings,
            next_sheet_id: 1,
        }
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Get a worksheet by id
    pub fn worksheet(&self, id: SheetId) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.id() == id)
    }

    /// Get a mutable worksheet by id
    pub fn worksheet_mut(&mut self, id: SheetId) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.id() == id)
    }

    /// Get a worksheet by position
    pub fn worksheet_at(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a worksheet by name (case-insensitive)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        let name = name.to_lowercase();
        self.worksheets
            .iter()
            .find(|ws| ws.name().to_lowercase() == name)
    }

    /// Get the id of a worksheet by name
    pub fn sheet_id(&self, name: &str) -> Option<SheetId> {
        self.worksheet_by_name(name).map(Worksheet::id)
    }

    /// Get the position of a worksheet
    pub fn sheet_index(&self, id: SheetId) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.id() == id)
    }

    /// Iterate over all worksheets in tab order
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Iterate over all worksheets mutably
    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Ids of the sheets positioned between `first` and `last` inclusive.
    ///
    /// The endpoints may be given in either order. Returns None if either
    /// sheet does not exist.
    pub fn sheets_between(&self, first: SheetId, last: SheetId) -> Option<Vec<SheetId>> {
        let a = self.sheet_index(first)?;
        let b = self.sheet_index(last)?;
        let (from, to) = (a.min(b), a.max(b));
        Some(self.worksheets[from..=to].iter().map(Worksheet::id).collect())
    }

    /// Add a new worksheet with a generated name
    pub fn add_default_worksheet(&mut self) -> Result<SheetId> {
        let name = self.generate_sheet_name();
        self.add_worksheet(&name)
    }

    /// Add a new worksheet with the specified name
    pub fn add_worksheet(&mut self, name: &str) -> Result<SheetId> {
        self.validate_sheet_name(name, None)?;

        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        self.worksheets.push(Worksheet::new(id, name));

        Ok(id)
    }

    /// Remove a worksheet. Its id is not handed out again.
    pub fn remove_worksheet(&mut self, id: SheetId) -> Result<Worksheet> {
        let index = self
            .sheet_index(id)
            .ok_or(Error::SheetIdNotFound(id.0))?;
        Ok(self.worksheets.remove(index))
    }

    /// Move a worksheet to a new position
    pub fn move_worksheet(&mut self, id: SheetId, to: usize) -> Result<()> {
        let from = self
            .sheet_index(id)
            .ok_or(Error::SheetIdNotFound(id.0))?;
        if to >= self.worksheets.len() {
            return Err(Error::other(format!(
                "Sheet position {} out of bounds ({} sheets)",
                to,
                self.worksheets.len()
            )));
        }

        let worksheet = self.worksheets.remove(from);
        self.worksheets.insert(to, worksheet);
        Ok(())
    }

    /// Rename a worksheet
    pub fn rename_worksheet(&mut self, id: SheetId, new_name: &str) -> Result<()> {
        let index = self
            .sheet_index(id)
            .ok_or(Error::SheetIdNotFound(id.0))?;

        // Validate the new name (excluding current sheet from duplicate check)
        self.validate_sheet_name(new_name, Some(index))?;

        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    /// Get workbook settings
    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    /// Get mutable workbook settings
    pub fn settings_mut(&mut self) -> &mut WorkbookSettings {
        &mut self.settings
    }

    // ==================== Recalculation state ====================

    /// Stored value of a cell anywhere in the workbook.
    ///
    /// A missing sheet reads as `#REF!`.
    pub fn get_value(&self, point: BookPoint) -> ScalarValue {
        match self.worksheet(point.sheet) {
            Some(ws) => ws.get_value(point.point),
            None => ScalarValue::Error(crate::cell::CellError::Ref),
        }
    }

    /// Flag the formula at a point for recalculation.
    ///
    /// Returns false when the sheet does not exist or the cell holds no formula.
    pub fn mark_dirty(&mut self, point: BookPoint) -> bool {
        self.worksheet_mut(point.sheet)
            .map(|ws| ws.mark_dirty(point.point))
            .unwrap_or(false)
    }

    /// Flag every formula of the workbook for recalculation
    pub fn mark_all_dirty(&mut self) {
        for ws in &mut self.worksheets {
            ws.mark_all_dirty();
        }
    }

    /// Total number of formula cells
    pub fn formula_count(&self) -> usize {
        self.worksheets.iter().map(Worksheet::formula_count).sum()
    }

    /// Dirty formulas in sheet order, row-major within each sheet.
    ///
    /// With `scope` set, only that sheet's formulas are returned.
    pub fn dirty_formulas(&self, scope: Option<SheetId>) -> Vec<BookPoint> {
        self.worksheets
            .iter()
            .filter(|ws| scope.map_or(true, |id| ws.id() == id))
            .flat_map(|ws| {
                let id = ws.id();
                ws.cells()
                    .formula_slice()
                    .dirty_points()
                    .map(move |point| BookPoint::new(id, point))
            })
            .collect()
    }

    /// Validate a sheet name, optionally excluding a sheet from duplicate check
    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        // Check length
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        // Check for invalid characters
        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        // Check for duplicate names (case-insensitive)
        let name_lower = name.to_lowercase();
        for (i, ws) in self.worksheets.iter().enumerate() {
            if Some(i) != exclude_index && ws.name().to_lowercase() == name_lower {
                return Err(Error::DuplicateSheetName(name.into()));
            }
        }

        Ok(())
    }

    /// Generate a unique sheet name
    fn generate_sheet_name(&self) -> String {
        let mut n = self.worksheets.len() + 1;
        loop {
            let name = format!("Sheet{}", n);
            if self.validate_sheet_name(&name, None).is_ok() {
                return name;
            }
            n += 1;
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Workbook-level settings
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkbookSettings {
    /// Culture for text comparison and text-to-number conversion
    pub culture: Culture,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::SheetPoint;
    use crate::formula::FormulaExpr;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 0);
        assert!(wb.is_empty());
    }

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new();

        let first = wb.add_default_worksheet().unwrap();
        assert_eq!(wb.worksheet(first).unwrap().name(), "Sheet1");

        let data = wb.add_worksheet("Data").unwrap();
        assert_eq!(wb.sheet_count(), 2);
        assert_eq!(wb.sheet_id("data"), Some(data));
        assert_eq!(wb.sheet_index(data), Some(1));
    }

    #[test]
    fn test_sheet_ids_never_reused() {
        let mut wb = Workbook::new();
        let a = wb.add_worksheet("A").unwrap();
        wb.remove_worksheet(a).unwrap();
        let b = wb.add_worksheet("A").unwrap();

        assert_ne!(a, b);
        assert!(wb.worksheet(a).is_none());
        assert!(matches!(wb.remove_worksheet(a), Err(Error::SheetIdNotFound(_))));
    }

    #[test]
    fn test_duplicate_name() {
        let mut wb = Workbook::new();
        wb.add_worksheet("Sheet1").unwrap();

        // Case-insensitive duplicate check
        assert!(wb.add_worksheet("SHEET1").is_err());
        assert!(wb.add_worksheet("sheet1").is_err());
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new();

        assert!(wb.add_worksheet("").is_err());
        assert!(wb.add_worksheet("Sheet/1").is_err());
        assert!(wb.add_worksheet("Sheet:1").is_err());
        assert!(wb.add_worksheet("Sheet[1]").is_err());

        // Too long
        let long_name = "A".repeat(MAX_SHEET_NAME_LEN + 1);
        assert!(wb.add_worksheet(&long_name).is_err());
    }

    #[test]
    fn test_sheets_between_follows_tab_order() {
        let mut wb = Workbook::new();
        let a = wb.add_worksheet("A").unwrap();
        let b = wb.add_worksheet("B").unwrap();
        let c = wb.add_worksheet("C").unwrap();

        assert_eq!(wb.sheets_between(a, c), Some(vec![a, b, c]));
        assert_eq!(wb.sheets_between(c, b), Some(vec![b, c]));

        wb.move_worksheet(c, 0).unwrap();
        assert_eq!(wb.sheets_between(c, a), Some(vec![c, a]));
        assert_eq!(wb.sheets_between(a, SheetId(99)), None);
    }

    #[test]
    fn test_dirty_formulas_in_sheet_order() {
        let mut wb = Workbook::new();
        let first = wb.add_worksheet("First").unwrap();
        let second = wb.add_worksheet("Second").unwrap();

        let b1 = SheetPoint::new(1, 2);
        let a2 = SheetPoint::new(2, 1);
        wb.worksheet_mut(second)
            .unwrap()
            .set_formula(a2, FormulaExpr::number(1.0));
        wb.worksheet_mut(first)
            .unwrap()
            .set_formula(a2, FormulaExpr::number(1.0));
        wb.worksheet_mut(first)
            .unwrap()
            .set_formula(b1, FormulaExpr::number(1.0));

        assert_eq!(
            wb.dirty_formulas(None),
            vec![
                BookPoint::new(first, b1),
                BookPoint::new(first, a2),
                BookPoint::new(second, a2),
            ]
        );
        assert_eq!(
            wb.dirty_formulas(Some(second)),
            vec![BookPoint::new(second, a2)]
        );
    }

    #[test]
    fn test_mark_dirty_unknown_sheet() {
        let mut wb = Workbook::new();
        assert!(!wb.mark_dirty(BookPoint::new(SheetId(5), SheetPoint::new(1, 1))));
        assert_eq!(
            wb.get_value(BookPoint::new(SheetId(5), SheetPoint::new(1, 1))),
            ScalarValue::Error(crate::cell::CellError::Ref)
        );
    }
}
