//! Formula evaluator
//!
//! Evaluates formula expression trees against an [`EvaluationContext`].
//! References stay references until an operator or function needs a scalar,
//! so aggregates can walk large ranges through the sparse storage.

use std::sync::OnceLock;

use sheetcalc_core::{
    AnyValue, Area, Array, BinaryOperator, CellError, Culture, FormulaExpr, RangeReference,
    Reference, ScalarValue, SheetId, SheetRange, UnaryOperator, Workbook,
};

use crate::context::EvaluationContext;
use crate::error::EvalResult;
use crate::functions::FunctionRegistry;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

pub(crate) fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(AnyValue::from(*n)),
        FormulaExpr::String(s) => Ok(ScalarValue::text(s).into()),
        FormulaExpr::Boolean(b) => Ok(AnyValue::from(*b)),
        FormulaExpr::Error(e) => Ok(AnyValue::error(*e)),

        // === References ===
        FormulaExpr::CellRef(cell_ref) => {
            let range = SheetRange::single(cell_ref.point);
            Ok(Reference::from(Area {
                sheet: cell_ref.sheet,
                range,
            })
            .into())
        }

        FormulaExpr::RangeRef(range_ref) => evaluate_range_ref(range_ref, ctx),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),

        // === Arrays ===
        FormulaExpr::Array(rows) => {
            let mut result_rows = Vec::with_capacity(rows.len());
            for row in rows {
                let mut result_row = Vec::with_capacity(row.len());
                for expr in row {
                    let value = evaluate(expr, ctx)?;
                    result_row.push(ctx.to_scalar(value)?);
                }
                result_rows.push(result_row);
            }
            match Array::from_rows(result_rows) {
                Ok(array) => Ok(array.into()),
                Err(e) => Ok(AnyValue::error(e)),
            }
        }
    }
}

/// Evaluate an expression outside the recalculation chain.
///
/// Dirty cells the expression reads are recomputed on the spot; nothing is
/// written back. The result is reduced to a scalar.
pub fn evaluate_ad_hoc(
    workbook: &Workbook,
    sheet: SheetId,
    expr: &FormulaExpr,
) -> EvalResult<ScalarValue> {
    let ctx = EvaluationContext::ad_hoc(workbook, sheet);
    let value = evaluate(expr, &ctx)?;
    ctx.to_scalar(value)
}

/// Expand a (possibly 3D) range reference into areas
fn evaluate_range_ref(range_ref: &RangeReference, ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    let (Some(first), Some(last)) = (range_ref.sheet, range_ref.end_sheet) else {
        return Ok(Reference::from(Area {
            sheet: range_ref.sheet,
            range: range_ref.range,
        })
        .into());
    };

    match ctx.workbook()?.sheets_between(first, last) {
        Some(sheets) => Ok(sheets
            .into_iter()
            .map(|sheet| Area::on_sheet(sheet, range_ref.range))
            .collect::<Reference>()
            .into()),
        None => Ok(AnyValue::error(CellError::Ref)),
    }
}

/// Narrow an operand for a scalar operator.
///
/// In array calculation references become arrays, otherwise they are reduced
/// by implicit intersection. Arrays stay arrays either way.
fn operand(value: AnyValue, ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    match value {
        AnyValue::Reference(reference) if ctx.is_array_calculation() => {
            Ok(ctx.reference_to_array(&reference)?.into())
        }
        AnyValue::Reference(reference) => Ok(ctx.implicit_intersection(&reference)?.into()),
        other => Ok(other),
    }
}

/// Element of an array for a broadcast position; a single row or column
/// repeats along the other dimension
fn broadcast_get(array: &Array, row: usize, col: usize) -> Option<&ScalarValue> {
    let row = if array.rows() == 1 { 0 } else { row };
    let col = if array.cols() == 1 { 0 } else { col };
    array.get(row, col)
}

/// Apply a scalar operation to two narrowed operands, element-wise when
/// either is an array. Positions outside a smaller array are `#N/A`.
pub(crate) fn broadcast2<F>(left: AnyValue, right: AnyValue, f: F) -> AnyValue
where
    F: Fn(&ScalarValue, &ScalarValue) -> ScalarValue,
{
    match (left, right) {
        (AnyValue::Scalar(l), AnyValue::Scalar(r)) => f(&l, &r).into(),
        (AnyValue::Array(l), AnyValue::Scalar(r)) => l.map(|x| f(x, &r)).into(),
        (AnyValue::Scalar(l), AnyValue::Array(r)) => r.map(|x| f(&l, x)).into(),
        (AnyValue::Array(l), AnyValue::Array(r)) => {
            let rows = l.rows().max(r.rows());
            let cols = l.cols().max(r.cols());
            if !Array::fits(rows, cols) {
                return Array::too_large().into();
            }
            Array::from_fn(rows, cols, |row, col| {
                match (broadcast_get(&l, row, col), broadcast_get(&r, row, col)) {
                    (Some(x), Some(y)) => f(x, y),
                    _ => ScalarValue::Error(CellError::Na),
                }
            })
            .into()
        }
        // Operands are narrowed before reaching here
        _ => AnyValue::error(CellError::Value),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> EvalResult<AnyValue> {
    // Evaluate operands first
    let left_val = evaluate(left, ctx)?;
    let right_val = evaluate(right, ctx)?;

    if matches!(
        op,
        BinaryOperator::Range | BinaryOperator::Union | BinaryOperator::Intersect
    ) {
        return evaluate_reference_op(op, left_val, right_val, ctx);
    }

    let left_val = operand(left_val, ctx)?;
    let right_val = operand(right_val, ctx)?;
    let culture = ctx.culture();

    Ok(broadcast2(left_val, right_val, |l, r| {
        binary_scalar(op, l, r, culture)
    }))
}

/// Apply a value operator to two scalars
fn binary_scalar(
    op: BinaryOperator,
    left: &ScalarValue,
    right: &ScalarValue,
    culture: &Culture,
) -> ScalarValue {
    // Propagate errors
    if let Some(e) = left.error() {
        return ScalarValue::Error(e);
    }
    if let Some(e) = right.error() {
        return ScalarValue::Error(e);
    }

    match op {
        // Arithmetic operators
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let (l, r) = match (left.to_number(culture), right.to_number(culture)) {
                (Ok(l), Ok(r)) => (l, r),
                (Err(e), _) | (_, Err(e)) => return ScalarValue::Error(e),
            };
            let result = match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide if r == 0.0 => return ScalarValue::Error(CellError::Div0),
                BinaryOperator::Divide => l / r,
                _ => l.powf(r),
            };
            if result.is_finite() {
                ScalarValue::Number(result)
            } else {
                ScalarValue::Error(CellError::Num)
            }
        }

        // Comparison operators
        BinaryOperator::Equal => left.compare(right, culture).is_eq().into(),
        BinaryOperator::NotEqual => left.compare(right, culture).is_ne().into(),
        BinaryOperator::LessThan => left.compare(right, culture).is_lt().into(),
        BinaryOperator::LessEqual => left.compare(right, culture).is_le().into(),
        BinaryOperator::GreaterThan => left.compare(right, culture).is_gt().into(),
        BinaryOperator::GreaterEqual => left.compare(right, culture).is_ge().into(),

        // Concatenation
        BinaryOperator::Concat => match (left.to_text(), right.to_text()) {
            (Ok(l), Ok(r)) => ScalarValue::text(l + &r),
            (Err(e), _) | (_, Err(e)) => ScalarValue::Error(e),
        },

        // Reference operators are handled before operands are narrowed
        BinaryOperator::Range | BinaryOperator::Union | BinaryOperator::Intersect => {
            ScalarValue::Error(CellError::Value)
        }
    }
}

/// Evaluate `:`, `,` and the space intersection operator over references
fn evaluate_reference_op(
    op: BinaryOperator,
    left: AnyValue,
    right: AnyValue,
    ctx: &EvaluationContext,
) -> EvalResult<AnyValue> {
    let (left, right) = match (left, right) {
        (AnyValue::Reference(l), AnyValue::Reference(r)) => (l, r),
        (AnyValue::Scalar(ScalarValue::Error(e)), _)
        | (_, AnyValue::Scalar(ScalarValue::Error(e))) => return Ok(AnyValue::error(e)),
        _ => return Ok(AnyValue::error(CellError::Value)),
    };

    if op == BinaryOperator::Union {
        return Ok(left.union(right).into());
    }

    let (Some(l), Some(r)) = (left.single_area(), right.single_area()) else {
        return Ok(AnyValue::error(CellError::Value));
    };

    // Both sides must resolve to the same sheet
    let current = ctx.worksheet_id().ok();
    let l_sheet = l.sheet.or(current);
    let r_sheet = r.sheet.or(current);
    if l_sheet != r_sheet {
        return Ok(AnyValue::error(CellError::Value));
    }

    let range = match op {
        BinaryOperator::Range => l.range.bounding(&r.range),
        _ => match l.range.intersect(&r.range) {
            Some(range) => range,
            None => return Ok(AnyValue::error(CellError::Null)),
        },
    };

    Ok(Reference::from(Area { sheet: l.sheet, range }).into())
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand_expr: &FormulaExpr,
    ctx: &EvaluationContext,
) -> EvalResult<AnyValue> {
    let val = operand(evaluate(operand_expr, ctx)?, ctx)?;
    let culture = ctx.culture();

    let apply = |value: &ScalarValue| -> ScalarValue {
        let n = match value.to_number(culture) {
            Ok(n) => n,
            Err(e) => return ScalarValue::Error(e),
        };
        match op {
            UnaryOperator::Negate => ScalarValue::Number(-n),
            UnaryOperator::Percent => ScalarValue::Number(n / 100.0),
        }
    };

    Ok(match val {
        AnyValue::Array(array) => array.map(apply).into(),
        AnyValue::Scalar(scalar) => apply(&scalar).into(),
        AnyValue::Reference(_) => AnyValue::error(CellError::Value),
    })
}

/// Evaluate a function call.
///
/// Unknown functions give `#NAME?` and a wrong argument count `#VALUE!`;
/// both are values, not evaluation failures.
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> EvalResult<AnyValue> {
    let registry = get_function_registry();

    let Some(func) = registry.get(name) else {
        return Ok(AnyValue::error(CellError::Name));
    };

    // Check argument count
    if args.len() < func.min_args || func.max_args.map_or(false, |max| args.len() > max) {
        return Ok(AnyValue::error(CellError::Value));
    }

    // Evaluate arguments
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(evaluate(arg, ctx)?);
    }

    // Call the function
    (func.implementation)(&evaluated_args, ctx)
}
