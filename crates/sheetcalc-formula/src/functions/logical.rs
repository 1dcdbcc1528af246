//! Logical functions

use sheetcalc_core::{AnyValue, CellError, ScalarValue};

use super::map_scalar;
use crate::context::EvaluationContext;
use crate::error::EvalResult;

/// IF function
///
/// The chosen branch is returned unchanged, so `IF(x, A1:A3, B1:B3)` still
/// yields a reference.
pub fn fn_if(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    let condition = ctx.to_scalar(args[0].clone())?;
    match condition.to_logical(ctx.culture()) {
        Ok(true) => Ok(args[1].clone()),
        Ok(false) => Ok(args.get(2).cloned().unwrap_or(AnyValue::from(false))),
        Err(e) => Ok(e.into()),
    }
}

/// NOT function
pub fn fn_not(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    let culture = ctx.culture();
    map_scalar(&args[0], ctx, |value| match value.to_logical(culture) {
        Ok(b) => ScalarValue::Logical(!b),
        Err(e) => ScalarValue::Error(e),
    })
}

/// Logical values of AND/OR arguments, or the first error.
///
/// Text inside references and arrays is skipped; direct text must read as
/// TRUE or FALSE.
fn collect_logicals(
    args: &[AnyValue],
    ctx: &EvaluationContext,
) -> EvalResult<Result<Vec<bool>, CellError>> {
    let mut logicals = Vec::new();

    for arg in args {
        match arg {
            AnyValue::Scalar(ScalarValue::Blank) => {}
            AnyValue::Scalar(scalar) => match scalar.to_logical(ctx.culture()) {
                Ok(b) => logicals.push(b),
                Err(e) => return Ok(Err(e)),
            },
            collection => {
                for value in ctx.get_non_blank_values_of(collection) {
                    match value? {
                        ScalarValue::Logical(b) => logicals.push(b),
                        ScalarValue::Number(n) => logicals.push(n != 0.0),
                        ScalarValue::Error(e) => return Ok(Err(e)),
                        _ => {}
                    }
                }
            }
        }
    }

    Ok(Ok(logicals))
}

/// AND function
pub fn fn_and(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    Ok(match collect_logicals(args, ctx)? {
        Ok(values) if values.is_empty() => CellError::Value.into(),
        Ok(values) => values.iter().all(|b| *b).into(),
        Err(e) => e.into(),
    })
}

/// OR function
pub fn fn_or(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    Ok(match collect_logicals(args, ctx)? {
        Ok(values) if values.is_empty() => CellError::Value.into(),
        Ok(values) => values.iter().any(|b| *b).into(),
        Err(e) => e.into(),
    })
}
