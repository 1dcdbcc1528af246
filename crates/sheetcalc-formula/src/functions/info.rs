//! Information functions

use sheetcalc_core::{AnyValue, CellError, ScalarValue};

use super::map_scalar;
use crate::context::EvaluationContext;
use crate::error::EvalResult;

/// ISBLANK function
pub fn fn_isblank(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    map_scalar(&args[0], ctx, |value| value.is_blank().into())
}

/// ISERROR function
pub fn fn_iserror(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    map_scalar(&args[0], ctx, |value| value.is_error().into())
}

/// ISNUMBER function
pub fn fn_isnumber(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    map_scalar(&args[0], ctx, |value| {
        matches!(value, ScalarValue::Number(_)).into()
    })
}

/// ROW function - row of the reference, or of the formula itself
pub fn fn_row(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    match args.first() {
        None => Ok((ctx.formula_address()?.row as f64).into()),
        Some(AnyValue::Reference(reference)) => Ok(match reference.areas().first() {
            Some(area) => (area.range.first.row as f64).into(),
            None => CellError::Value.into(),
        }),
        Some(_) => Ok(CellError::Value.into()),
    }
}

/// COLUMN function - column of the reference, or of the formula itself
pub fn fn_column(args: &[AnyValue], ctx: &EvaluationContext) -> EvalResult<AnyValue> {
    match args.first() {
        None => Ok((ctx.formula_address()?.column as f64).into()),
        Some(AnyValue::Reference(reference)) => Ok(match reference.areas().first() {
            Some(area) => (area.range.first.column as f64).into(),
            None => CellError::Value.into(),
        }),
        Some(_) => Ok(CellError::Value.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationSettings;
    use crate::error::EvalError;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{Area, BookPoint, Reference, SheetPoint, SheetRange, Workbook};

    #[test]
    fn test_row_and_column_of_formula() {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet("Sheet1").unwrap();
        let ctx = EvaluationContext::for_cell(&wb, BookPoint::new(sheet, SheetPoint::new(7, 3)));

        assert_eq!(fn_row(&[], &ctx), Ok(AnyValue::from(7.0)));
        assert_eq!(fn_column(&[], &ctx), Ok(AnyValue::from(3.0)));

        let reference: AnyValue =
            Reference::from(Area::new(SheetRange::parse("B4:D9").unwrap())).into();
        assert_eq!(fn_row(&[reference.clone()], &ctx), Ok(AnyValue::from(4.0)));
        assert_eq!(fn_column(&[reference], &ctx), Ok(AnyValue::from(2.0)));
    }

    #[test]
    fn test_row_without_address_is_missing_context() {
        let ctx = EvaluationContext::detached(EvaluationSettings::default());
        assert_eq!(
            fn_row(&[], &ctx),
            Err(EvalError::MissingContext("formula address"))
        );
    }

    #[test]
    fn test_is_functions() {
        let ctx = EvaluationContext::detached(EvaluationSettings::default());
        assert_eq!(
            fn_isblank(&[ScalarValue::Blank.into()], &ctx),
            Ok(AnyValue::from(true))
        );
        assert_eq!(
            fn_iserror(&[CellError::Div0.into()], &ctx),
            Ok(AnyValue::from(true))
        );
        assert_eq!(
            fn_isnumber(&[ScalarValue::text("1").into()], &ctx),
            Ok(AnyValue::from(false))
        );
    }
}
