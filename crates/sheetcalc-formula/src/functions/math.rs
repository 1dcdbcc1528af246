//! Math and aggregate functions

use sheetcalc_core::{AnyValue, CellError, ScalarValue};

use super::map_scalar;
use crate::context::EvaluationContext;
use crate::error::EvalResult;

/// Numbers an aggregate sees, or the first error it met
type Numbers = Result<Vec<f64>, CellError>;

/// Collect the numbers of aggregate arguments.
///
/// Direct scalar arguments are coerced (text must parse, logicals count as
/// 0/1). Inside references and arrays only numbers count; text and logicals
/// are skipped. Errors propagate either way.
fn collect_numbers(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<Numbers> {
    let mut numbers = Vec::new();

    for arg in args {
        match arg {
            AnyValue::Scalar(ScalarValue::Blank) => {}
            AnyValue::Scalar(scalar) => match scalar.to_number(ctx.culture()) {
                Ok(n) => numbers.push(n),
                Err(e) => return Ok(Err(e)),
            },
            collection => {
                for value in ctx.get_non_blank_values_of(collection) {
                    match value? {
                        ScalarValue::Number(n) => numbers.push(n),
                        ScalarValue::Error(e) => return Ok(Err(e)),
                        _ => {} // Ignore non-numeric
                    }
                }
            }
        }
    }

    Ok(Ok(numbers))
}

/// SUM function
pub fn fn_sum(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    Ok(match collect_numbers(args, ctx)? {
        Ok(numbers) => numbers.iter().sum::<f64>().into(),
        Err(e) => e.into(),
    })
}

/// AVERAGE function
pub fn fn_average(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    Ok(match collect_numbers(args, ctx)? {
        Ok(numbers) if numbers.is_empty() => CellError::Div0.into(),
        Ok(numbers) => (numbers.iter().sum::<f64>() / numbers.len() as f64).into(),
        Err(e) => e.into(),
    })
}

/// MIN function
pub fn fn_min(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    Ok(match collect_numbers(args, ctx)? {
        Ok(numbers) => numbers.into_iter().reduce(f64::min).unwrap_or(0.0).into(),
        Err(e) => e.into(),
    })
}

/// MAX function
pub fn fn_max(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    Ok(match collect_numbers(args, ctx)? {
        Ok(numbers) => numbers.into_iter().reduce(f64::max).unwrap_or(0.0).into(),
        Err(e) => e.into(),
    })
}

/// COUNT function - counts numbers, never fails on errors
pub fn fn_count(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    let mut count = 0usize;

    for arg in args {
        match arg {
            AnyValue::Scalar(ScalarValue::Blank | ScalarValue::Error(_)) => {}
            AnyValue::Scalar(scalar) => {
                if scalar.to_number(ctx.culture()).is_ok() {
                    count += 1;
                }
            }
            collection => {
                for value in ctx.get_non_blank_values_of(collection) {
                    if let ScalarValue::Number(_) = value? {
                        count += 1;
                    }
                }
            }
        }
    }

    Ok((count as f64).into())
}

/// COUNTA function - counts non-blank values, errors included
pub fn fn_counta(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    let mut count = 0usize;

    for arg in args {
        for value in ctx.get_non_blank_values_of(arg) {
            value?;
            count += 1;
        }
    }

    Ok((count as f64).into())
}

/// ABS function
pub fn fn_abs(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    let culture = ctx.culture();
    map_scalar(&args[0], ctx, |value| match value.to_number(culture) {
        Ok(n) => ScalarValue::Number(n.abs()),
        Err(e) => ScalarValue::Error(e),
    })
}
