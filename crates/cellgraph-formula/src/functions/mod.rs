//! Built-in Excel functions

pub mod logical;
pub mod math;
pub mod text;

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use ahash::AHashMap;
use cellgraph_core::CellError;

/// Function implementation signature
///
/// Functions can consult the evaluation context (current sheet/cell, date
/// system) to match Excel semantics.
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

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

impl FunctionDef {
    fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            implementation,
        }
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    /// Register a function, replacing any previous definition
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_ascii_uppercase(), def);
    }

    fn register_math_functions(&mut self) {
        for def in [
            FunctionDef::new("SUM", 1, None, math::fn_sum),
            FunctionDef::new("AVERAGE", 1, None, math::fn_average),
            FunctionDef::new("MIN", 1, None, math::fn_min),
            FunctionDef::new("MAX", 1, None, math::fn_max),
            FunctionDef::new("COUNT", 1, None, math::fn_count),
            FunctionDef::new("COUNTA", 1, None, math::fn_counta),
            FunctionDef::new("ABS", 1, Some(1), math::fn_abs),
            FunctionDef::new("ROUND", 1, Some(2), math::fn_round),
            FunctionDef::new("MOD", 2, Some(2), math::fn_mod),
            FunctionDef::new("INT", 1, Some(1), math::fn_int),
            FunctionDef::new("SQRT", 1, Some(1), math::fn_sqrt),
            FunctionDef::new("POWER", 2, Some(2), math::fn_power),
        ] {
            self.register(def);
        }
    }

    fn register_logical_functions(&mut self) {
        for def in [
            FunctionDef::new("IF", 2, Some(3), logical::fn_if),
            FunctionDef::new("AND", 1, None, logical::fn_and),
            FunctionDef::new("OR", 1, None, logical::fn_or),
            FunctionDef::new("NOT", 1, Some(1), logical::fn_not),
            FunctionDef::new("IFERROR", 2, Some(2), logical::fn_iferror),
            FunctionDef::new("IFNA", 2, Some(2), logical::fn_ifna),
            FunctionDef::new("TRUE", 0, Some(0), logical::fn_true),
            FunctionDef::new("FALSE", 0, Some(0), logical::fn_false),
        ] {
            self.register(def);
        }
    }

    fn register_text_functions(&mut self) {
        for def in [
            FunctionDef::new("LEN", 1, Some(1), text::fn_len),
            FunctionDef::new("LOWER", 1, Some(1), text::fn_lower),
            FunctionDef::new("UPPER", 1, Some(1), text::fn_upper),
            FunctionDef::new("TRIM", 1, Some(1), text::fn_trim),
            FunctionDef::new("LEFT", 1, Some(2), text::fn_left),
            FunctionDef::new("RIGHT", 1, Some(2), text::fn_right),
            FunctionDef::new("CONCAT", 1, None, text::fn_concat),
            FunctionDef::new("CONCATENATE", 1, None, text::fn_concat),
        ] {
            self.register(def);
        }
    }
}

/// Every element of an array argument, or the value itself
pub(crate) fn flatten(value: &FormulaValue) -> Vec<&FormulaValue> {
    match value {
        FormulaValue::Array(rows) => rows.iter().flatten().collect(),
        v => vec![v],
    }
}

static VALUE_ERROR: FormulaValue = FormulaValue::Error(CellError::Value);

/// The scalar at `index`; a one-cell array stands for its element
fn scalar_arg(args: &[FormulaValue], index: usize) -> Option<&FormulaValue> {
    match args.get(index)? {
        FormulaValue::Array(rows) => match rows.as_slice() {
            [row] if row.len() == 1 => row.first(),
            _ => Some(&VALUE_ERROR),
        },
        v => Some(v),
    }
}

/// Numeric argument at `index`, falling back to `default` when omitted
pub(crate) fn number_arg(
    args: &[FormulaValue],
    index: usize,
    default: Option<f64>,
) -> Result<f64, CellError> {
    match scalar_arg(args, index) {
        None => default.ok_or(CellError::Value),
        Some(FormulaValue::Error(e)) => Err(*e),
        Some(v) => v.as_number().ok_or(CellError::Value),
    }
}

/// Text argument at `index`
pub(crate) fn text_arg(args: &[FormulaValue], index: usize) -> Result<String, CellError> {
    match scalar_arg(args, index) {
        None => Err(CellError::Value),
        Some(FormulaValue::Error(e)) => Err(*e),
        Some(v) => Ok(v.as_string()),
    }
}
