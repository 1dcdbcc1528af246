//! Text functions

use sheetcalc_core::{AnyValue, ScalarValue};

use super::map_scalar;
use crate::context::EvaluationContext;
use crate::error::EvalResult;

fn map_text<F>(arg: &AnyValue, ctx: &EvaluationContext, f: F) -> EvalResult<AnyValue>
where
    F: Fn(String) -> ScalarValue,
{
    map_scalar(arg, ctx, |value| match value.to_text() {
        Ok(text) => f(text),
        Err(e) => ScalarValue::Error(e),
    })
}

/// LEN function
pub fn fn_len(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    map_text(&args[0], ctx, |text| {
        ScalarValue::Number(text.chars().count() as f64)
    })
}

/// UPPER function
pub fn fn_upper(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    map_text(&args[0], ctx, |text| ScalarValue::text(text.to_uppercase()))
}

/// LOWER function
pub fn fn_lower(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    map_text(&args[0], ctx, |text| ScalarValue::text(text.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationSettings;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{Array, CellError};

    #[test]
    fn test_len() {
        let ctx = EvaluationContext::detached(EvaluationSettings::default());
        assert_eq!(
            fn_len(&[ScalarValue::text("héllo").into()], &ctx),
            Ok(AnyValue::from(5.0))
        );
        assert_eq!(fn_len(&[12.5.into()], &ctx), Ok(AnyValue::from(4.0)));
        assert_eq!(
            fn_len(&[CellError::Na.into()], &ctx),
            Ok(AnyValue::error(CellError::Na))
        );
    }

    #[test]
    fn test_case_functions_map_arrays() {
        let ctx = EvaluationContext::detached(EvaluationSettings::default());
        let array = Array::from_rows(vec![vec!["ab".into(), "Cd".into()]]).unwrap();

        let upper = fn_upper(&[array.into()], &ctx).unwrap();
        let expected = Array::from_rows(vec![vec!["AB".into(), "CD".into()]]).unwrap();
        assert_eq!(upper, AnyValue::Array(expected));

        assert_eq!(
            fn_lower(&[ScalarValue::text("MiXeD").into()], &ctx),
            Ok(AnyValue::from(ScalarValue::text("mixed")))
        );
    }
}
