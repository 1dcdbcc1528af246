//! Evaluation context
//!
//! An [`EvaluationContext`] is built for one evaluation attempt. It binds the
//! workbook, the sheet and address of the formula being evaluated and the
//! [`EvaluationSettings`] in effect, and it is the only way the evaluator
//! reads cells.
//!
//! Reading a dirty formula cell follows a fixed policy:
//!
//! 1. a cell without a formula returns its stored value
//! 2. a clean formula returns its stored value
//! 3. a dirty formula on a sheet outside the recalculation scope returns its
//!    stored, possibly stale, value
//! 4. a recursive context recomputes the dirty formula on the spot
//! 5. anything else fails with [`EvalError::DataNotReady`] so the scheduler
//!    can calculate the dependency first

use std::cell::RefCell;
use std::iter;
use std::rc::Rc;

use ahash::AHashMap;
use log::trace;
use sheetcalc_core::{
    AnyValue, Area, Array, BookPoint, Cell, CellError, Culture, FormulaEntry, Reference,
    ScalarValue, SheetId, SheetPoint, Workbook, Worksheet,
};

use crate::error::{EvalError, EvalResult};
use crate::evaluator::evaluate;

/// Flags of one evaluation. Immutable once the context is built; derived
/// contexts get a modified copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationSettings {
    /// Culture for text comparison and text-to-number conversion
    pub culture: Culture,
    /// Scalar functions and operators apply element-wise to multi-cell
    /// arguments instead of narrowing them by implicit intersection
    pub is_array_calculation: bool,
    /// Only formulas of this sheet are being recalculated; dirty formulas
    /// elsewhere are read with their stored value
    pub recalculate_sheet: Option<SheetId>,
}

impl EvaluationSettings {
    /// Settings with the given culture and every flag off
    pub fn new(culture: Culture) -> Self {
        Self {
            culture,
            ..Self::default()
        }
    }

    /// Set the array calculation flag
    pub fn with_array_calculation(mut self, enabled: bool) -> Self {
        self.is_array_calculation = enabled;
        self
    }

    /// Set the recalculation scope
    pub fn with_recalculate_sheet(mut self, sheet: Option<SheetId>) -> Self {
        self.recalculate_sheet = sheet;
        self
    }
}

/// Bookkeeping of one recursive evaluation, shared with nested contexts
#[derive(Debug, Default)]
struct Recursion {
    /// Cells being recomputed, innermost last
    in_progress: Vec<BookPoint>,
    /// Fresh values of the cells recomputed so far. Never written to the workbook.
    computed: AHashMap<BookPoint, ScalarValue>,
}

/// Context for formula evaluation
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    workbook: Option<&'a Workbook>,
    worksheet: Option<SheetId>,
    formula_address: Option<SheetPoint>,
    settings: EvaluationSettings,
    recursive: bool,
    recursion: Rc<RefCell<Recursion>>,
}

impl<'a> EvaluationContext<'a> {
    /// Context for evaluating the formula stored at `address`.
    ///
    /// Array calculation is on when the formula was entered as an array
    /// formula; the culture comes from the workbook settings.
    pub fn for_cell(workbook: &'a Workbook, address: BookPoint) -> Self {
        let is_array = workbook
            .worksheet(address.sheet)
            .and_then(|ws| ws.formula(address.point))
            .map(FormulaEntry::is_array)
            .unwrap_or(false);
        let settings = EvaluationSettings::new(workbook.settings().culture.clone())
            .with_array_calculation(is_array);

        Self {
            workbook: Some(workbook),
            worksheet: Some(address.sheet),
            formula_address: Some(address.point),
            settings,
            recursive: false,
            recursion: Rc::default(),
        }
    }

    /// Recursive context for an expression evaluated outside the chain.
    ///
    /// Dirty cells it reads are recomputed on the spot. There is no formula
    /// address unless one is added with [`with_formula_address`](Self::with_formula_address).
    pub fn ad_hoc(workbook: &'a Workbook, sheet: SheetId) -> Self {
        Self {
            workbook: Some(workbook),
            worksheet: Some(sheet),
            formula_address: None,
            settings: EvaluationSettings::new(workbook.settings().culture.clone()),
            recursive: true,
            recursion: Rc::default(),
        }
    }

    /// Context without a workbook. Only expressions that read no cell can be
    /// evaluated with it.
    pub fn detached(settings: EvaluationSettings) -> Self {
        Self {
            workbook: None,
            worksheet: None,
            formula_address: None,
            settings,
            recursive: false,
            recursion: Rc::default(),
        }
    }

    /// Bind a formula address
    pub fn with_formula_address(mut self, point: SheetPoint) -> Self {
        self.formula_address = Some(point);
        self
    }

    /// Replace the settings
    pub fn with_settings(mut self, settings: EvaluationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Restrict recalculation to one sheet
    pub fn with_recalculate_sheet(mut self, sheet: Option<SheetId>) -> Self {
        self.settings.recalculate_sheet = sheet;
        self
    }

    /// Turn array calculation on or off
    pub fn with_array_calculation(mut self, enabled: bool) -> Self {
        self.settings.is_array_calculation = enabled;
        self
    }

    /// Turn recursive recomputation of dirty cells on or off
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    // === Bound objects ===

    /// The workbook
    pub fn workbook(&self) -> EvalResult<&'a Workbook> {
        self.workbook.ok_or(EvalError::MissingContext("workbook"))
    }

    /// Id of the sheet of the formula
    pub fn worksheet_id(&self) -> EvalResult<SheetId> {
        self.worksheet.ok_or(EvalError::MissingContext("worksheet"))
    }

    /// The sheet of the formula.
    ///
    /// `None` when the bound sheet has since been removed from the workbook;
    /// cell reads on it give `#REF!`.
    pub fn worksheet(&self) -> EvalResult<Option<&'a Worksheet>> {
        let id = self.worksheet_id()?;
        Ok(self.workbook()?.worksheet(id))
    }

    /// Address of the formula within its sheet
    pub fn formula_address(&self) -> EvalResult<SheetPoint> {
        self.formula_address
            .ok_or(EvalError::MissingContext("formula address"))
    }

    /// Address of the formula within the workbook
    pub fn formula_book_point(&self) -> EvalResult<BookPoint> {
        Ok(BookPoint::new(self.worksheet_id()?, self.formula_address()?))
    }

    // === Settings ===

    /// The settings in effect
    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    /// Culture for comparisons and conversions
    pub fn culture(&self) -> &Culture {
        &self.settings.culture
    }

    /// Ranges are narrowed to a single cell where a scalar is expected
    pub fn use_implicit_intersection(&self) -> bool {
        true
    }

    /// Whether scalar operations apply element-wise
    pub fn is_array_calculation(&self) -> bool {
        self.settings.is_array_calculation
    }

    /// The single sheet being recalculated, if restricted
    pub fn recalculate_sheet(&self) -> Option<SheetId> {
        self.settings.recalculate_sheet
    }

    /// Whether dirty cells are recomputed on the spot
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Number of dirty cells recomputed so far by this recursive evaluation
    pub fn recomputed_count(&self) -> usize {
        self.recursion.borrow().computed.len()
    }

    // === Cell access ===

    /// Value of a cell as the formula being evaluated must see it
    pub fn get_cell_value(&self, sheet: SheetId, point: SheetPoint) -> EvalResult<ScalarValue> {
        let workbook = self.workbook()?;
        let Some(worksheet) = workbook.worksheet(sheet) else {
            return Ok(ScalarValue::Error(CellError::Ref));
        };

        let entry = match worksheet.formula(point) {
            Some(entry) if entry.is_dirty() => entry,
            _ => return Ok(worksheet.get_value(point)),
        };

        if self
            .settings
            .recalculate_sheet
            .map_or(false, |scope| scope != sheet)
        {
            return Ok(worksheet.get_value(point));
        }

        let address = BookPoint::new(sheet, point);
        if self.recursive {
            return self.recompute(address, entry);
        }

        Err(EvalError::DataNotReady(address))
    }

    /// Evaluate a dirty formula in a nested context. The value is returned to
    /// the caller only; the cell stays dirty.
    ///
    /// Each cell is recomputed at most once per evaluation, later reads get
    /// the remembered value.
    fn recompute(&self, address: BookPoint, entry: &FormulaEntry) -> EvalResult<ScalarValue> {
        {
            let recursion = self.recursion.borrow();
            if let Some(value) = recursion.computed.get(&address) {
                return Ok(value.clone());
            }
            if recursion.in_progress.contains(&address) {
                trace!("{} depends on itself during recursive evaluation", address);
                return Ok(ScalarValue::Error(CellError::CIRCULAR));
            }
        }

        trace!("Recomputing dirty cell {} recursively", address);
        self.recursion.borrow_mut().in_progress.push(address);

        let nested = EvaluationContext {
            workbook: self.workbook,
            worksheet: Some(address.sheet),
            formula_address: Some(address.point),
            settings: self
                .settings
                .clone()
                .with_array_calculation(entry.is_array()),
            recursive: true,
            recursion: Rc::clone(&self.recursion),
        };
        let result = evaluate(entry.expr(), &nested).and_then(|value| nested.to_scalar(value));

        let mut recursion = self.recursion.borrow_mut();
        recursion.in_progress.pop();
        if let Ok(value) = &result {
            recursion.computed.insert(address, value.clone());
        }
        result
    }

    fn area_sheet(&self, area: &Area) -> EvalResult<SheetId> {
        match area.sheet {
            Some(id) => Ok(id),
            None => self.worksheet_id(),
        }
    }

    fn area_worksheet(&self, area: &Area) -> EvalResult<Option<&'a Worksheet>> {
        let workbook = self.workbook()?;
        Ok(workbook.worksheet(self.area_sheet(area)?))
    }

    /// Non-blank values of every area of a reference.
    ///
    /// Areas are visited in declaration order and cells row-major within an
    /// area; only occupied cells are touched. Overlapping areas yield shared
    /// cells once per area. An area on a sheet that no longer exists yields a
    /// single `#REF!`.
    pub fn get_non_blank_values<'r>(
        &'r self,
        reference: &'r Reference,
    ) -> impl Iterator<Item = EvalResult<ScalarValue>> + 'r {
        reference
            .areas()
            .iter()
            .flat_map(move |area| self.area_values(*area))
    }

    fn area_values<'r>(
        &'r self,
        area: Area,
    ) -> Box<dyn Iterator<Item = EvalResult<ScalarValue>> + 'r> {
        let worksheet = match self.area_worksheet(&area) {
            Ok(Some(worksheet)) => worksheet,
            Ok(None) => return Box::new(iter::once(Ok(ScalarValue::Error(CellError::Ref)))),
            Err(err) => return Box::new(iter::once(Err(err))),
        };

        let sheet = worksheet.id();
        Box::new(
            worksheet
                .for_values_and_formulas(area.range)
                .map(move |point| self.get_cell_value(sheet, point))
                .filter(|value| !matches!(value, Ok(ScalarValue::Blank))),
        )
    }

    /// Non-blank values of any evaluated value.
    ///
    /// A scalar yields itself unless blank, an array its non-blank elements
    /// row-major, a reference the same as [`get_non_blank_values`](Self::get_non_blank_values).
    pub fn get_non_blank_values_of<'r>(
        &'r self,
        value: &'r AnyValue,
    ) -> Box<dyn Iterator<Item = EvalResult<ScalarValue>> + 'r> {
        match value {
            AnyValue::Scalar(scalar) if scalar.is_blank() => Box::new(iter::empty()),
            AnyValue::Scalar(scalar) => Box::new(iter::once(Ok(scalar.clone()))),
            AnyValue::Array(array) => Box::new(
                array
                    .iter()
                    .filter(|element| !element.is_blank())
                    .cloned()
                    .map(Ok),
            ),
            AnyValue::Reference(reference) => Box::new(self.get_non_blank_values(reference)),
        }
    }

    /// Occupied cells of every area of a reference, each on its own sheet.
    ///
    /// No deduplication happens across areas. Areas on missing sheets yield
    /// nothing.
    pub fn get_non_blank_cells<'r>(
        &'r self,
        reference: &'r Reference,
    ) -> impl Iterator<Item = EvalResult<Cell<'a>>> + 'r {
        reference
            .areas()
            .iter()
            .flat_map(move |area| self.area_cells(*area))
    }

    fn area_cells<'r>(&'r self, area: Area) -> Box<dyn Iterator<Item = EvalResult<Cell<'a>>> + 'r> {
        match self.area_worksheet(&area) {
            Ok(Some(worksheet)) => Box::new(
                worksheet
                    .cells()
                    .get_cells(area.range, |_| true)
                    .map(Ok),
            ),
            Ok(None) => Box::new(iter::empty()),
            Err(err) => Box::new(iter::once(Err(err))),
        }
    }

    // === Shape conversion ===

    /// Narrow a reference to the single cell aligned with the formula.
    ///
    /// A single column picks the formula's row, a single row picks the
    /// formula's column, a 2-D range needs both. No alignment or several
    /// areas give `#VALUE!`.
    pub fn implicit_intersection(&self, reference: &Reference) -> EvalResult<ScalarValue> {
        let Some(area) = reference.single_area() else {
            return Ok(ScalarValue::Error(CellError::Value));
        };
        let sheet = self.area_sheet(area)?;
        let range = area.range;

        if area.is_single_cell() {
            return self.get_cell_value(sheet, range.first);
        }

        let address = self.formula_address()?;
        let row = if range.row_count() == 1 {
            range.first.row
        } else if (range.first.row..=range.last.row).contains(&address.row) {
            address.row
        } else {
            return Ok(ScalarValue::Error(CellError::Value));
        };
        let column = if range.col_count() == 1 {
            range.first.column
        } else if (range.first.column..=range.last.column).contains(&address.column) {
            address.column
        } else {
            return Ok(ScalarValue::Error(CellError::Value));
        };

        self.get_cell_value(sheet, SheetPoint::new(row, column))
    }

    /// Reduce any value to a scalar: arrays give their top-left element,
    /// references are narrowed by implicit intersection
    pub fn to_scalar(&self, value: AnyValue) -> EvalResult<ScalarValue> {
        match value.try_pick_scalar() {
            Ok(scalar) => Ok(scalar),
            Err(collection) => match collection.try_pick_array() {
                Ok(array) => Ok(array.top_left().clone()),
                Err(reference) => self.implicit_intersection(&reference),
            },
        }
    }

    /// Array view of a multi-valued argument; None for scalars
    pub fn to_array(&self, value: &AnyValue) -> EvalResult<Option<Array>> {
        match value {
            AnyValue::Scalar(_) => Ok(None),
            AnyValue::Array(array) => Ok(Some(array.clone())),
            AnyValue::Reference(reference) => self.reference_to_array(reference).map(Some),
        }
    }

    /// Materialize a single-area reference as an array of cell values.
    ///
    /// Several areas give a 1x1 `#VALUE!` array, a missing sheet `#REF!`. An
    /// area larger than [`MAX_ARRAY_CELLS`](sheetcalc_core::MAX_ARRAY_CELLS)
    /// gives a 1x1 `#CALC!` array and reads no cell.
    pub fn reference_to_array(&self, reference: &Reference) -> EvalResult<Array> {
        let Some(area) = reference.single_area() else {
            return Ok(Array::filled(1, 1, ScalarValue::Error(CellError::Value)));
        };
        let range = area.range;
        let rows = range.row_count() as usize;
        let cols = range.col_count() as usize;
        if !Array::fits(rows, cols) {
            return Ok(Array::too_large());
        }

        let Some(worksheet) = self.area_worksheet(area)? else {
            return Ok(Array::filled(rows, cols, ScalarValue::Error(CellError::Ref)));
        };

        let sheet = worksheet.id();
        let mut array = Array::filled(rows, cols, ScalarValue::Blank);
        for point in worksheet.for_values_and_formulas(range) {
            let value = self.get_cell_value(sheet, point)?;
            array.set(
                (point.row - range.first.row) as usize,
                (point.column - range.first.column) as usize,
                value,
            );
        }
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{FormulaExpr, SheetRange};

    fn p(a1: &str) -> SheetPoint {
        SheetPoint::parse(a1).unwrap()
    }

    fn area(a1: &str) -> Reference {
        Reference::from(Area::new(SheetRange::parse(a1).unwrap()))
    }

    /// Sheet "Data" with A1 = 5, A2 = =A1+1 (dirty), A3 = =A1*2 (clean, stale 7)
    fn workbook() -> (Workbook, SheetId) {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet("Data").unwrap();
        let ws = wb.worksheet_mut(sheet).unwrap();
        ws.set_value(p("A1"), 5.0);
        ws.set_formula(
            p("A2"),
            FormulaExpr::add(FormulaExpr::cell(p("A1")), FormulaExpr::number(1.0)),
        );
        ws.set_formula(
            p("A3"),
            FormulaExpr::binary(
                sheetcalc_core::BinaryOperator::Multiply,
                FormulaExpr::cell(p("A1")),
                FormulaExpr::number(2.0),
            ),
        );
        ws.cells_mut().set_value(p("A3"), 7.0.into());
        if let Some(entry) = ws.cells_mut().formula_mut(p("A3")) {
            entry.mark_clean();
        }
        (wb, sheet)
    }

    #[test]
    fn test_missing_context() {
        let ctx = EvaluationContext::detached(EvaluationSettings::default());
        assert_eq!(ctx.workbook().unwrap_err(), EvalError::MissingContext("workbook"));
        assert_eq!(
            ctx.formula_address().unwrap_err(),
            EvalError::MissingContext("formula address")
        );
        assert_eq!(
            ctx.get_cell_value(SheetId(1), p("A1")).unwrap_err(),
            EvalError::MissingContext("workbook")
        );

        let (wb, sheet) = workbook();
        let ctx = EvaluationContext::ad_hoc(&wb, sheet);
        assert!(matches!(ctx.worksheet(), Ok(Some(_))));
        assert_eq!(
            ctx.formula_address().unwrap_err(),
            EvalError::MissingContext("formula address")
        );
    }

    #[test]
    fn test_removed_worksheet_is_not_missing_context() {
        let (mut wb, data) = workbook();
        let other = wb.add_worksheet("Other").unwrap();
        wb.remove_worksheet(other).unwrap();

        let ctx = EvaluationContext::ad_hoc(&wb, other);
        assert!(matches!(ctx.worksheet(), Ok(None)));
        assert_eq!(
            ctx.get_non_blank_values(&area("A1:A3")).collect::<Vec<_>>(),
            vec![Ok(ScalarValue::Error(CellError::Ref))]
        );
        assert_eq!(
            ctx.get_cell_value(other, p("A1")),
            Ok(ScalarValue::Error(CellError::Ref))
        );
        assert!(matches!(
            EvaluationContext::ad_hoc(&wb, data).worksheet(),
            Ok(Some(_))
        ));
    }

    #[test]
    fn test_get_cell_value_policy() {
        let (wb, sheet) = workbook();
        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(sheet, p("B1")));

        // Plain value
        assert_eq!(ctx.get_cell_value(sheet, p("A1")), Ok(ScalarValue::Number(5.0)));
        // Empty cell
        assert_eq!(ctx.get_cell_value(sheet, p("Z9")), Ok(ScalarValue::Blank));
        // Clean formula
        assert_eq!(ctx.get_cell_value(sheet, p("A3")), Ok(ScalarValue::Number(7.0)));
        // Dirty formula
        assert_eq!(
            ctx.get_cell_value(sheet, p("A2")),
            Err(EvalError::DataNotReady(BookPoint::new(sheet, p("A2"))))
        );
        // Missing sheet
        assert_eq!(
            ctx.get_cell_value(SheetId(99), p("A1")),
            Ok(ScalarValue::Error(CellError::Ref))
        );
    }

    #[test]
    fn test_dirty_cell_outside_scope_reads_stale() {
        let (mut wb, data) = workbook();
        let other = wb.add_worksheet("Other").unwrap();

        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(other, p("A1")))
            .with_recalculate_sheet(Some(other));
        assert_eq!(ctx.get_cell_value(data, p("A2")), Ok(ScalarValue::Blank));

        let ctx = ctx.with_recalculate_sheet(Some(data));
        assert!(matches!(
            ctx.get_cell_value(data, p("A2")),
            Err(EvalError::DataNotReady(_))
        ));
    }

    #[test]
    fn test_recursive_context_recomputes() {
        let (wb, sheet) = workbook();
        let ctx = EvaluationContext::ad_hoc(&wb, sheet);

        assert_eq!(ctx.get_cell_value(sheet, p("A2")), Ok(ScalarValue::Number(6.0)));
        // Nothing is written back
        assert!(wb.worksheet(sheet).unwrap().is_dirty(p("A2")));
    }

    #[test]
    fn test_recursive_context_recomputes_each_cell_once() {
        // A1 = 1, An = SUM(A1:An-1): every cell reads all cells above it
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet("Data").unwrap();
        let ws = wb.worksheet_mut(sheet).unwrap();
        ws.set_value(p("A1"), 1.0);
        for row in 2..=40u32 {
            let above = SheetRange::new(SheetPoint::new(1, 1), SheetPoint::new(row - 1, 1));
            ws.set_formula(
                SheetPoint::new(row, 1),
                FormulaExpr::function("SUM", vec![FormulaExpr::range(above)]),
            );
        }

        let ctx = EvaluationContext::ad_hoc(&wb, sheet);
        assert_eq!(
            ctx.get_cell_value(sheet, p("A40")),
            Ok(ScalarValue::Number(2f64.powi(38)))
        );
        assert_eq!(ctx.recomputed_count(), 39);

        // A second read is served from the remembered values
        assert_eq!(
            ctx.get_cell_value(sheet, p("A20")),
            Ok(ScalarValue::Number(2f64.powi(18)))
        );
        assert_eq!(ctx.recomputed_count(), 39);
        assert!(wb.worksheet(sheet).unwrap().is_dirty(p("A40")));
    }

    #[test]
    fn test_recursive_cycle_is_circular_error() {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet("Data").unwrap();
        let ws = wb.worksheet_mut(sheet).unwrap();
        ws.set_formula(p("A1"), FormulaExpr::cell(p("B1")));
        ws.set_formula(p("B1"), FormulaExpr::cell(p("A1")));

        let ctx = EvaluationContext::ad_hoc(&wb, sheet);
        assert_eq!(
            ctx.get_cell_value(sheet, p("A1")),
            Ok(ScalarValue::Error(CellError::CIRCULAR))
        );
    }

    #[test]
    fn test_non_blank_values_skip_empty_cells() {
        let (wb, sheet) = workbook();
        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(sheet, p("B1")));

        let values: Vec<_> = ctx.get_non_blank_values(&area("A1:A1")).collect();
        assert_eq!(values, vec![Ok(ScalarValue::Number(5.0))]);

        // A2 is dirty: iteration reports it
        let values: Vec<_> = ctx.get_non_blank_values(&area("A:A")).collect();
        assert_eq!(values[0], Ok(ScalarValue::Number(5.0)));
        assert_eq!(
            values[1],
            Err(EvalError::DataNotReady(BookPoint::new(sheet, p("A2"))))
        );
    }

    #[test]
    fn test_non_blank_values_overlapping_areas_double_count() {
        let (wb, sheet) = workbook();
        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(sheet, p("B1")));

        let reference = area("A1").union(area("A1:B1"));
        let values: Vec<_> = ctx.get_non_blank_values(&reference).collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_non_blank_values_of_missing_sheet() {
        let (wb, sheet) = workbook();
        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(sheet, p("B1")));

        let reference = Reference::from(Area::on_sheet(SheetId(42), SheetRange::parse("A1").unwrap()));
        let values: Vec<_> = ctx.get_non_blank_values(&reference).collect();
        assert_eq!(values, vec![Ok(ScalarValue::Error(CellError::Ref))]);
    }

    #[test]
    fn test_non_blank_values_of_array() {
        let ctx = EvaluationContext::detached(EvaluationSettings::default());
        let array = Array::from_rows(vec![vec![1.0.into(), ScalarValue::Blank, "x".into()]]).unwrap();
        let value = AnyValue::Array(array);

        let values: Vec<_> = ctx.get_non_blank_values_of(&value).collect();
        assert_eq!(
            values,
            vec![Ok(ScalarValue::Number(1.0)), Ok(ScalarValue::text("x"))]
        );
        assert_eq!(
            ctx.get_non_blank_values_of(&AnyValue::Scalar(ScalarValue::Blank)).count(),
            0
        );
    }

    #[test]
    fn test_non_blank_cells_use_each_area_sheet() {
        let (mut wb, data) = workbook();
        let other = wb.add_worksheet("Other").unwrap();
        wb.worksheet_mut(other).unwrap().set_value(p("A1"), 1.0);

        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(data, p("B1")));
        let reference = area("A1:A3").union(Reference::from(Area::on_sheet(
            other,
            SheetRange::parse("A1:A3").unwrap(),
        )));
        let cells: Vec<_> = ctx
            .get_non_blank_cells(&reference)
            .map(|cell| cell.unwrap().address())
            .collect();

        assert_eq!(
            cells,
            vec![
                BookPoint::new(data, p("A1")),
                BookPoint::new(data, p("A2")),
                BookPoint::new(data, p("A3")),
                BookPoint::new(other, p("A1")),
            ]
        );
    }

    #[test]
    fn test_implicit_intersection() {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet("Data").unwrap();
        let ws = wb.worksheet_mut(sheet).unwrap();
        ws.set_value(p("A3"), 30.0);
        ws.set_value(p("C1"), 3.0);
        ws.set_value(p("C3"), 33.0);

        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(sheet, p("C3")));

        // Single column picks the formula row
        assert_eq!(ctx.implicit_intersection(&area("A:A")), Ok(ScalarValue::Number(30.0)));
        // Single row picks the formula column
        assert_eq!(ctx.implicit_intersection(&area("A1:D1")), Ok(ScalarValue::Number(3.0)));
        // 2-D picks both
        assert_eq!(ctx.implicit_intersection(&area("A1:D5")), Ok(ScalarValue::Number(33.0)));
        // No alignment
        assert_eq!(
            ctx.implicit_intersection(&area("A10:A20")),
            Ok(ScalarValue::Error(CellError::Value))
        );
        // Several areas
        assert_eq!(
            ctx.implicit_intersection(&area("A1").union(area("C1"))),
            Ok(ScalarValue::Error(CellError::Value))
        );
    }

    #[test]
    fn test_to_scalar() {
        let ctx = EvaluationContext::detached(EvaluationSettings::default());
        let array = Array::from_rows(vec![vec![1.0.into(), 2.0.into()]]).unwrap();
        assert_eq!(ctx.to_scalar(AnyValue::Array(array)), Ok(ScalarValue::Number(1.0)));
        assert_eq!(ctx.to_scalar(true.into()), Ok(ScalarValue::Logical(true)));
    }

    #[test]
    fn test_reference_to_array() {
        let (wb, sheet) = workbook();
        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(sheet, p("B1")));

        let array = ctx.reference_to_array(&area("A1:B1")).unwrap();
        assert_eq!(array.rows(), 1);
        assert_eq!(array.cols(), 2);
        assert_eq!(array.get(0, 0), Some(&ScalarValue::Number(5.0)));
        assert_eq!(array.get(0, 1), Some(&ScalarValue::Blank));

        assert!(matches!(
            ctx.reference_to_array(&area("A1:A2")),
            Err(EvalError::DataNotReady(_))
        ));
    }

    #[test]
    fn test_reference_to_array_of_whole_sheet_is_too_large() {
        let (wb, sheet) = workbook();
        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(sheet, p("B1")));

        // A2 is dirty, but nothing is read once the size check fails
        let array = ctx.reference_to_array(&area("A:XFD")).unwrap();
        assert_eq!(array, Array::too_large());

        let removed = Reference::from(Area::on_sheet(SheetId(77), SheetRange::parse("A:XFD").unwrap()));
        assert_eq!(ctx.reference_to_array(&removed), Ok(Array::too_large()));

        let full_column = ctx.reference_to_array(&area("C:C")).unwrap();
        assert_eq!(full_column.rows(), sheetcalc_core::MAX_ROWS as usize);
    }
}
