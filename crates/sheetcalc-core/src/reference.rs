//! Multi-area references

use std::fmt;

use crate::cell::{SheetId, SheetPoint, SheetRange};

/// A rectangular span of cells, optionally bound to a sheet.
///
/// An area without a sheet refers to the sheet of the formula being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Area {
    pub sheet: Option<SheetId>,
    pub range: SheetRange,
}

impl Area {
    /// Area on the current sheet
    pub fn new(range: SheetRange) -> Self {
        Self { sheet: None, range }
    }

    /// Area on a specific sheet
    pub fn on_sheet(sheet: SheetId, range: SheetRange) -> Self {
        Self {
            sheet: Some(sheet),
            range,
        }
    }

    /// Single-cell area on the current sheet
    pub fn cell(point: SheetPoint) -> Self {
        Self::new(SheetRange::single(point))
    }

    /// The sheet of the area, falling back to `current`
    pub fn sheet_or(&self, current: SheetId) -> SheetId {
        self.sheet.unwrap_or(current)
    }

    /// Check if the area is a single cell
    pub fn is_single_cell(&self) -> bool {
        self.range.first == self.range.last
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sheet {
            Some(sheet) => write!(f, "{}!{}", sheet, self.range),
            None => write!(f, "{}", self.range),
        }
    }
}

/// Ordered list of areas.
///
/// Multi-area references (`(A1:A3,C1:C3)`) and 3D references
/// (`Sheet1:Sheet3!A1`) are both a list of areas. Order is declaration order
/// and areas may overlap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reference {
    areas: Vec<Area>,
}

impl Reference {
    /// Create a reference from areas
    pub fn new(areas: Vec<Area>) -> Self {
        Self { areas }
    }

    /// The areas in declaration order
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// Number of areas
    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    /// The only area, if there is exactly one
    pub fn single_area(&self) -> Option<&Area> {
        match self.areas.as_slice() {
            [area] => Some(area),
            _ => None,
        }
    }

    /// Append an area
    pub fn push(&mut self, area: Area) {
        self.areas.push(area);
    }

    /// Union of two references (the `,` reference operator); order is kept
    pub fn union(mut self, other: Reference) -> Reference {
        self.areas.extend(other.areas);
        self
    }
}

impl From<Area> for Reference {
    fn from(area: Area) -> Self {
        Self { areas: vec![area] }
    }
}

impl FromIterator<Area> for Reference {
    fn from_iter<I: IntoIterator<Item = Area>>(iter: I) -> Self {
        Self {
            areas: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(area) = self.single_area() {
            return write!(f, "{}", area);
        }
        write!(f, "(")?;
        for (i, area) in self.areas.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", area)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_union_keeps_order() {
        let a = Area::new(SheetRange::parse("A1:A3").unwrap());
        let c = Area::on_sheet(SheetId(2), SheetRange::parse("C1:C3").unwrap());
        let reference = Reference::from(a).union(Reference::from(c));

        assert_eq!(reference.areas(), &[a, c]);
        assert_eq!(reference.single_area(), None);
        assert_eq!(reference.to_string(), "(A1:A3,#2!C1:C3)");
    }

    #[test]
    fn test_sheet_or() {
        let area = Area::cell(SheetPoint::new(1, 1));
        assert_eq!(area.sheet_or(SheetId(7)), SheetId(7));
        assert!(area.is_single_cell());
    }
}
