//! Built-in functions
//!
//! A compact set of functions, enough to drive the evaluation context end to
//! end: aggregates that walk references sparsely, scalar functions that lift
//! over arrays in array calculation, and functions that read the formula's
//! own position.

pub mod info;
pub mod logical;
pub mod math;
pub mod text;

use ahash::AHashMap;
use sheetcalc_core::{AnyValue, ScalarValue};

use crate::context::EvaluationContext;
use crate::error::EvalResult;

/// Function implementation signature
///
/// Arguments arrive evaluated but not narrowed: a range argument is still a
/// reference, so a function decides whether it aggregates or intersects.
pub type FunctionImpl = fn(&[AnyValue], &EvaluationContext) -> EvalResult<AnyValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_info_functions();
        registry.register_text_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if no function is registered
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn add(&mut self, name: &'static str, min_args: usize, max_args: Option<usize>, f: FunctionImpl) {
        self.register(FunctionDef {
            name,
            min_args,
            max_args,
            implementation: f,
        });
    }

    fn register_math_functions(&mut self) {
        self.add("SUM", 1, None, math::fn_sum);
        self.add("AVERAGE", 1, None, math::fn_average);
        self.add("MIN", 1, None, math::fn_min);
        self.add("MAX", 1, None, math::fn_max);
        self.add("COUNT", 1, None, math::fn_count);
        self.add("COUNTA", 1, None, math::fn_counta);
        self.add("ABS", 1, Some(1), math::fn_abs);
    }

    fn register_logical_functions(&mut self) {
        self.add("IF", 2, Some(3), logical::fn_if);
        self.add("NOT", 1, Some(1), logical::fn_not);
        self.add("AND", 1, None, logical::fn_and);
        self.add("OR", 1, None, logical::fn_or);
    }

    fn register_info_functions(&mut self) {
        self.add("ISBLANK", 1, Some(1), info::fn_isblank);
        self.add("ISERROR", 1, Some(1), info::fn_iserror);
        self.add("ISNUMBER", 1, Some(1), info::fn_isnumber);
        self.add("ROW", 0, Some(1), info::fn_row);
        self.add("COLUMN", 0, Some(1), info::fn_column);
    }

    fn register_text_functions(&mut self) {
        self.add("LEN", 1, Some(1), text::fn_len);
        self.add("UPPER", 1, Some(1), text::fn_upper);
        self.add("LOWER", 1, Some(1), text::fn_lower);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a scalar function to one argument.
///
/// Arrays are mapped element by element. In array calculation references are
/// mapped too; otherwise they are narrowed by implicit intersection.
pub(crate) fn map_scalar<F>(arg: &AnyValue, ctx: &EvaluationContext, f: F) -> EvalResult<AnyValue>
where
    F: Fn(&ScalarValue) -> ScalarValue,
{
    match arg {
        AnyValue::Array(array) => Ok(array.map(f).into()),
        AnyValue::Reference(reference) if ctx.is_array_calculation() => {
            Ok(ctx.reference_to_array(reference)?.map(f).into())
        }
        other => {
            let scalar = ctx.to_scalar(other.clone())?;
            Ok(f(&scalar).into())
        }
    }
}
