//! Workbook calculation engine
//!
//! Recalculates dirty formulas without a precomputed dependency graph. Each
//! pending formula is evaluated with a context that refuses to read dirty
//! cells; when it reports one, that cell is moved to the front of the queue
//! and the reporting formula waits behind it. A formula that ends up waiting
//! on a cell already waiting (directly or through others) closes a circular
//! reference, and every cell of that chain gets `#REF!`.
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Sheet1").unwrap();
//! let ws = workbook.worksheet_mut(sheet).unwrap();
//! ws.set_value_a1("A1", 10.0).unwrap();
//! ws.set_value_a1("A2", 20.0).unwrap();
//! ws.set_formula_a1("A3", FormulaExpr::function("SUM", vec![
//!     FormulaExpr::reference("A1:A2").unwrap(),
//! ]))
//! .unwrap();
//!
//! // Calculate all formulas
//! let stats = workbook.calculate().unwrap();
//! assert_eq!(stats.cells_calculated, 1);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::{AHashMap, AHashSet};
use log::{debug, trace, warn};
use sheetcalc_core::{BookPoint, CellError, ScalarValue, SheetId, Workbook};
use sheetcalc_formula::{evaluate, EvalError, EvaluationContext};

use crate::{Error, Result};

/// Options for workbook calculation
#[derive(Debug, Clone, Default)]
pub struct CalculationOptions {
    /// Recalculate only the formulas of this sheet. Dirty formulas elsewhere
    /// are read with their stored value.
    pub recalculate_sheet: Option<SheetId>,
    /// Upper bound on how often a single formula may be deferred behind a
    /// dependency. A formula exceeding it is treated as circular.
    pub max_retries_per_cell: Option<usize>,
    /// Mark every formula in scope dirty before the pass
    pub force_full_calculation: bool,
}

impl CalculationOptions {
    /// Options restricted to a single sheet
    pub fn for_sheet(sheet: SheetId) -> Self {
        Self {
            recalculate_sheet: Some(sheet),
            ..Self::default()
        }
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells in the workbook
    pub formula_count: usize,
    /// Number of formulas evaluated to a result
    pub cells_calculated: usize,
    /// Number of times a formula was deferred behind a dirty dependency
    pub retries: usize,
    /// Number of cells set to `#REF!` as part of a circular reference
    pub circular_references: usize,
    /// Number of calculated cells whose result is an error value
    pub errors: usize,
    /// Whether the pass stopped on the cancel flag
    pub cancelled: bool,
    /// Whether every formula in scope ended up clean
    pub converged: bool,
}

/// Extension trait for Workbook to add calculation methods
pub trait WorkbookCalculationExt {
    /// Calculate all dirty formulas in the workbook with default options
    fn calculate(&mut self) -> Result<CalculationStats>;

    /// Calculate dirty formulas with custom options
    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats>;

    /// Calculate dirty formulas, stopping before the next formula once
    /// `cancel_flag` is set.
    ///
    /// Formulas calculated before the stop stay clean, the rest stay dirty.
    fn calculate_cancellable(
        &mut self,
        options: &CalculationOptions,
        cancel_flag: &AtomicBool,
    ) -> Result<CalculationStats>;

    /// Calculate the dirty formulas of one sheet
    fn calculate_sheet(&mut self, sheet: SheetId) -> Result<CalculationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn calculate(&mut self) -> Result<CalculationStats> {
        self.calculate_with_options(&CalculationOptions::default())
    }

    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats> {
        self.calculate_cancellable(options, &AtomicBool::new(false))
    }

    fn calculate_cancellable(
        &mut self,
        options: &CalculationOptions,
        cancel_flag: &AtomicBool,
    ) -> Result<CalculationStats> {
        if let Some(sheet) = options.recalculate_sheet {
            if self.worksheet(sheet).is_none() {
                return Err(sheetcalc_core::Error::SheetIdNotFound(sheet.0).into());
            }
        }

        let mut engine = CalculationEngine::new(options.clone());
        engine.calculate_all(self, cancel_flag)
    }

    fn calculate_sheet(&mut self, sheet: SheetId) -> Result<CalculationStats> {
        self.calculate_with_options(&CalculationOptions::for_sheet(sheet))
    }
}

/// What evaluating one pending formula produced
enum Outcome {
    Value(ScalarValue),
    NotReady(BookPoint),
}

/// State of one recalculation pass
struct CalculationEngine {
    options: CalculationOptions,
    /// Formulas still to calculate; the front is evaluated next
    pending: VecDeque<BookPoint>,
    /// Members of `pending`
    queued: AHashSet<BookPoint>,
    /// Formulas deferred behind a dependency. Each entry waits on the next
    /// one, the last entry waits on the front of `pending`.
    waiting: Vec<BookPoint>,
    /// Formulas finished in this pass
    done: AHashSet<BookPoint>,
    /// How often each formula was deferred
    retries: AHashMap<BookPoint, usize>,
}

impl CalculationEngine {
    fn new(options: CalculationOptions) -> Self {
        Self {
            options,
            pending: VecDeque::new(),
            queued: AHashSet::new(),
            waiting: Vec::new(),
            done: AHashSet::new(),
            retries: AHashMap::new(),
        }
    }

    /// Calculate every dirty formula in scope
    fn calculate_all(
        &mut self,
        workbook: &mut Workbook,
        cancel_flag: &AtomicBool,
    ) -> Result<CalculationStats> {
        let mut stats = self.start(workbook);
        self.run(workbook, cancel_flag, &mut stats)?;
        Ok(stats)
    }

    /// Queue the dirty formulas in scope, after marking them all dirty on a
    /// forced pass
    fn start(&mut self, workbook: &mut Workbook) -> CalculationStats {
        let scope = self.options.recalculate_sheet;

        if self.options.force_full_calculation {
            match scope.and_then(|id| workbook.worksheet_mut(id)) {
                Some(worksheet) => worksheet.mark_all_dirty(),
                None => workbook.mark_all_dirty(),
            }
        }

        let stats = CalculationStats {
            formula_count: workbook.formula_count(),
            ..Default::default()
        };

        self.pending = workbook.dirty_formulas(scope).into();
        self.queued = self.pending.iter().copied().collect();
        self.waiting.clear();
        self.done.clear();
        self.retries.clear();
        debug!(
            "Recalculating {} dirty formulas of {}",
            self.pending.len(),
            stats.formula_count
        );
        stats
    }

    /// Step until the queue is empty or `cancel_flag` is set
    fn run(
        &mut self,
        workbook: &mut Workbook,
        cancel_flag: &AtomicBool,
        stats: &mut CalculationStats,
    ) -> Result<()> {
        while !self.pending.is_empty() {
            if cancel_flag.load(Ordering::Relaxed) {
                debug!(
                    "Recalculation cancelled with {} formulas pending",
                    self.pending.len()
                );
                stats.cancelled = true;
                return Ok(());
            }
            self.step(workbook, stats)?;
        }

        stats.converged = true;
        debug!(
            "Recalculation complete: {} calculated, {} circular, {} retries",
            stats.cells_calculated, stats.circular_references, stats.retries
        );
        Ok(())
    }

    /// Evaluate the front of the queue once: store its value, or defer it
    /// behind the dependency that is not ready
    fn step(&mut self, workbook: &mut Workbook, stats: &mut CalculationStats) -> Result<()> {
        let Some(&current) = self.pending.front() else {
            return Ok(());
        };

        match self.evaluate_cell(workbook, current)? {
            Outcome::Value(value) => {
                if value.is_error() {
                    stats.errors += 1;
                }
                self.complete(workbook, current, value);
                stats.cells_calculated += 1;
                // The formula waiting on this one is at the front again
                self.waiting.pop();
                Ok(())
            }
            Outcome::NotReady(dependency) => self.defer(workbook, current, dependency, stats),
        }
    }

    /// Evaluate the formula at `point`, reduced to the scalar stored in the cell
    fn evaluate_cell(&self, workbook: &Workbook, point: BookPoint) -> Result<Outcome> {
        let Some(entry) = workbook
            .worksheet(point.sheet)
            .and_then(|ws| ws.formula(point.point))
        else {
            return Err(Error::internal(format!(
                "no formula at scheduled cell {}",
                point
            )));
        };

        let ctx = EvaluationContext::for_cell(workbook, point)
            .with_recalculate_sheet(self.options.recalculate_sheet);

        match evaluate(entry.expr(), &ctx).and_then(|value| ctx.to_scalar(value)) {
            Ok(value) => Ok(Outcome::Value(value)),
            Err(EvalError::DataNotReady(dependency)) => Ok(Outcome::NotReady(dependency)),
            Err(EvalError::MissingContext(what)) => Err(Error::internal(format!(
                "missing {} while evaluating {}",
                what, point
            ))),
        }
    }

    /// Put `dependency` in front of `current`, or resolve the circular
    /// reference it closes.
    fn defer(
        &mut self,
        workbook: &mut Workbook,
        current: BookPoint,
        dependency: BookPoint,
        stats: &mut CalculationStats,
    ) -> Result<()> {
        if self.done.contains(&dependency) {
            return Err(Error::internal(format!(
                "{} reported {} as not ready after it was calculated",
                current, dependency
            )));
        }

        if dependency == current || self.waiting.contains(&dependency) {
            let start = self
                .waiting
                .iter()
                .position(|point| *point == dependency)
                .unwrap_or(self.waiting.len());
            let mut cycle = self.waiting.split_off(start);
            cycle.push(current);
            self.break_cycle(workbook, cycle, stats);
            return Ok(());
        }

        if !self.queued.contains(&dependency) {
            return Err(Error::internal(format!(
                "{} depends on {}, which is dirty but not scheduled",
                current, dependency
            )));
        }

        stats.retries += 1;
        let retries = self.retries.entry(current).or_insert(0);
        *retries += 1;
        if let Some(max) = self.options.max_retries_per_cell {
            if *retries > max {
                warn!("{} deferred more than {} times, giving up", current, max);
                self.break_cycle(workbook, vec![current], stats);
                return Ok(());
            }
        }

        trace!("{} waits on {}", current, dependency);
        if let Some(index) = self.pending.iter().position(|point| *point == dependency) {
            self.pending.remove(index);
        }
        self.pending.push_front(dependency);
        self.waiting.push(current);
        Ok(())
    }

    /// Set every cell of a circular chain to `#REF!`
    fn break_cycle(
        &mut self,
        workbook: &mut Workbook,
        cycle: Vec<BookPoint>,
        stats: &mut CalculationStats,
    ) {
        let chain: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        warn!("Circular reference: {}", chain.join(" -> "));

        for point in cycle {
            self.complete(workbook, point, ScalarValue::Error(CellError::CIRCULAR));
            stats.circular_references += 1;
        }

        // The formula waiting on the chain is at the front again
        self.waiting.pop();
    }

    /// Store a result, clean the formula and take it off the queue
    fn complete(&mut self, workbook: &mut Workbook, point: BookPoint, value: ScalarValue) {
        if let Some(worksheet) = workbook.worksheet_mut(point.sheet) {
            let cells = worksheet.cells_mut();
            cells.set_value(point.point, value);
            if let Some(entry) = cells.formula_mut(point.point) {
                entry.mark_clean();
            }
        }

        if let Some(index) = self.pending.iter().position(|p| *p == point) {
            self.pending.remove(index);
        }
        self.queued.remove(&point);
        self.done.insert(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{FormulaExpr, SheetPoint};

    fn r(a1: &str) -> FormulaExpr {
        FormulaExpr::reference(a1).unwrap()
    }

    fn p(a1: &str) -> SheetPoint {
        SheetPoint::parse(a1).unwrap()
    }

    fn plus_one(a1: &str) -> FormulaExpr {
        FormulaExpr::add(r(a1), FormulaExpr::number(1.0))
    }

    #[test]
    fn test_simple_calculation() {
        let mut workbook = Workbook::new();
        let id = workbook.add_worksheet("Sheet1").unwrap();
        let sheet = workbook.worksheet_mut(id).unwrap();

        sheet.set_value(p("A1"), 10.0);
        sheet.set_value(p("A2"), 20.0);
        sheet.set_formula(p("A3"), FormulaExpr::add(r("A1"), r("A2")));

        let stats = workbook.calculate().unwrap();

        assert_eq!(stats.formula_count, 1);
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.errors, 0);
        assert!(stats.converged);

        let sheet = workbook.worksheet(id).unwrap();
        assert_eq!(sheet.get_value(p("A3")), ScalarValue::Number(30.0));
        assert!(!sheet.is_dirty(p("A3")));
    }

    #[test]
    fn test_cancel_mid_pass_keeps_finished_cells_clean() {
        // A2 = A3+1, A3 = A1+1: A2 is queued first and waits on A3
        let mut workbook = Workbook::new();
        let id = workbook.add_worksheet("Sheet1").unwrap();
        let sheet = workbook.worksheet_mut(id).unwrap();
        sheet.set_value(p("A1"), 1.0);
        sheet.set_formula(p("A2"), plus_one("A3"));
        sheet.set_formula(p("A3"), plus_one("A1"));
        sheet.set_formula(p("A4"), plus_one("A1"));

        let mut engine = CalculationEngine::new(CalculationOptions::default());
        let mut stats = engine.start(&mut workbook);
        engine.step(&mut workbook, &mut stats).unwrap();
        assert_eq!(stats.retries, 1);
        engine.step(&mut workbook, &mut stats).unwrap();
        assert_eq!(stats.cells_calculated, 1);

        engine
            .run(&mut workbook, &AtomicBool::new(true), &mut stats)
            .unwrap();

        assert!(stats.cancelled);
        assert!(!stats.converged);
        assert_eq!(stats.cells_calculated, 1);
        let sheet = workbook.worksheet(id).unwrap();
        assert_eq!(sheet.get_value(p("A3")), ScalarValue::Number(2.0));
        assert!(!sheet.is_dirty(p("A3")));
        assert!(sheet.is_dirty(p("A2")));
        assert!(sheet.is_dirty(p("A4")));

        // The next pass only calculates what is still dirty
        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.cells_calculated, 2);
        let sheet = workbook.worksheet(id).unwrap();
        assert_eq!(sheet.get_value(p("A2")), ScalarValue::Number(3.0));
        assert_eq!(sheet.get_value(p("A4")), ScalarValue::Number(2.0));
    }

    #[test]
    fn test_reverse_chain_reorders() {
        // A1 depends on A2 which depends on A3, all queued top to bottom
        let mut workbook = Workbook::new();
        let id = workbook.add_worksheet("Sheet1").unwrap();
        let sheet = workbook.worksheet_mut(id).unwrap();

        sheet.set_formula(p("A1"), plus_one("A2"));
        sheet.set_formula(p("A2"), plus_one("A3"));
        sheet.set_formula(p("A3"), plus_one("A4"));
        sheet.set_value(p("A4"), 1.0);

        let stats = workbook.calculate().unwrap();

        assert_eq!(stats.cells_calculated, 3);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.circular_references, 0);

        let sheet = workbook.worksheet(id).unwrap();
        assert_eq!(sheet.get_value(p("A1")), ScalarValue::Number(4.0));
        assert_eq!(sheet.get_value(p("A2")), ScalarValue::Number(3.0));
        assert_eq!(sheet.get_value(p("A3")), ScalarValue::Number(2.0));
    }

    #[test]
    fn test_self_reference_is_circular() {
        let mut workbook = Workbook::new();
        let id = workbook.add_worksheet("Sheet1").unwrap();
        workbook
            .worksheet_mut(id)
            .unwrap()
            .set_formula(p("A1"), plus_one("A1"));

        let stats = workbook.calculate().unwrap();

        assert_eq!(stats.circular_references, 1);
        assert_eq!(stats.cells_calculated, 0);
        assert!(stats.converged);
        let sheet = workbook.worksheet(id).unwrap();
        assert_eq!(sheet.get_value(p("A1")), ScalarValue::Error(CellError::Ref));
        assert!(!sheet.is_dirty(p("A1")));
    }

    #[test]
    fn test_dependent_of_cycle_sees_ref_error() {
        // C1 waits on A1, which is in a cycle with B1
        let mut workbook = Workbook::new();
        let id = workbook.add_worksheet("Sheet1").unwrap();
        let sheet = workbook.worksheet_mut(id).unwrap();

        sheet.set_formula(p("A1"), plus_one("B1"));
        sheet.set_formula(p("B1"), plus_one("A1"));
        sheet.set_formula(p("A2"), plus_one("A1"));

        let stats = workbook.calculate().unwrap();

        assert_eq!(stats.circular_references, 2);
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.errors, 1);

        let sheet = workbook.worksheet(id).unwrap();
        assert_eq!(sheet.get_value(p("A2")), ScalarValue::Error(CellError::Ref));
    }

    #[test]
    fn test_max_retries_marks_cell_circular() {
        let mut workbook = Workbook::new();
        let id = workbook.add_worksheet("Sheet1").unwrap();
        let sheet = workbook.worksheet_mut(id).unwrap();

        sheet.set_formula(p("A1"), plus_one("A2"));
        sheet.set_formula(p("A2"), FormulaExpr::number(1.0));

        let options = CalculationOptions {
            max_retries_per_cell: Some(0),
            ..Default::default()
        };
        let stats = workbook.calculate_with_options(&options).unwrap();

        assert_eq!(stats.circular_references, 1);
        let sheet = workbook.worksheet(id).unwrap();
        assert_eq!(sheet.get_value(p("A1")), ScalarValue::Error(CellError::Ref));
        assert_eq!(sheet.get_value(p("A2")), ScalarValue::Number(1.0));
    }

    #[test]
    fn test_force_full_calculation() {
        let mut workbook = Workbook::new();
        let id = workbook.add_worksheet("Sheet1").unwrap();
        let sheet = workbook.worksheet_mut(id).unwrap();
        sheet.set_value(p("A1"), 1.0);
        sheet.set_formula(p("A2"), plus_one("A1"));

        workbook.calculate().unwrap();
        // Editing a value does not dirty dependents on its own
        workbook
            .worksheet_mut(id)
            .unwrap()
            .set_value(p("A1"), 5.0);

        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.cells_calculated, 0);

        let options = CalculationOptions {
            force_full_calculation: true,
            ..Default::default()
        };
        let stats = workbook.calculate_with_options(&options).unwrap();
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(
            workbook.worksheet(id).unwrap().get_value(p("A2")),
            ScalarValue::Number(6.0)
        );
    }

    #[test]
    fn test_unknown_sheet_scope() {
        let mut workbook = Workbook::new();
        workbook.add_worksheet("Sheet1").unwrap();

        let result = workbook.calculate_sheet(SheetId(99));
        assert!(matches!(
            result,
            Err(Error::Core(sheetcalc_core::Error::SheetIdNotFound(99)))
        ));
    }
}
