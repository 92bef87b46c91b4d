//! Formula evaluator
//!
//! Evaluates formula ASTs to produce values. Cell, range and name operands are
//! resolved through a [`ReferenceResolver`] supplied by the document model.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use crate::parser::parse_formula;
use cellgraph_core::{date_to_serial, CellError, CellValue, Reference};
use once_cell::sync::Lazy;
use std::cmp::Ordering;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// Names may refer to expressions that mention other names; this bounds the chain.
const MAX_NAME_DEPTH: u8 = 16;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    /// Convert to number, if possible
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(1.0),
            FormulaValue::Boolean(false) => Some(0.0),
            FormulaValue::String(s) => s.trim().parse().ok(),
            FormulaValue::Empty => Some(0.0),
            _ => None,
        }
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::String(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => {
                // Format like Excel: no trailing zeros, but reasonable precision
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.as_str().to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.as_str().to_string(),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Convert a stored cell value into an operand.
    ///
    /// Dates become serial numbers in the given date system and rich text
    /// becomes its plain text.
    pub fn from_cell(value: &CellValue, date_1904: bool) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(*n),
            CellValue::String(s) => FormulaValue::String(s.as_str().to_string()),
            CellValue::Boolean(b) => FormulaValue::Boolean(*b),
            CellValue::Error(e) => FormulaValue::Error(*e),
            CellValue::Date(dt) => FormulaValue::Number(date_to_serial(*dt, date_1904)),
            CellValue::RichText(rt) => FormulaValue::String(rt.plain_text()),
        }
    }
}

impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::String(s.into()),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(_) => CellValue::Error(CellError::Value),
        }
    }
}

/// What a defined name stands for
#[derive(Debug, Clone, PartialEq)]
pub enum NameTarget {
    /// A sheet-qualified cell, range or band
    Reference(Reference),
    /// A constant or formula, evaluated in the caller's context
    Expression(String),
}

/// Resolves formula operands against a document
///
/// References handed to the resolver are always sheet-qualified.
pub trait ReferenceResolver {
    /// Current value of a single cell
    fn cell_value(&self, reference: &Reference) -> FormulaValue;

    /// Values of a range as an [`FormulaValue::Array`]. Bands only cover the
    /// populated extent of the sheet.
    fn range_values(&self, reference: &Reference) -> FormulaValue;

    /// Look up a defined name, sheet scope first
    fn resolve_name(&self, name: &str, sheet: &str) -> Option<NameTarget>;
}

/// Context for formula evaluation
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Operand lookups; `None` evaluates every reference as empty
    pub resolver: Option<&'a dyn ReferenceResolver>,
    /// Sheet of the formula cell, used for unqualified references
    pub sheet: &'a str,
    /// Row of the formula cell (1-based)
    pub row: u32,
    /// Column of the formula cell (1-based)
    pub col: u16,
    /// Whether dates use the 1904 serial system
    pub date_1904: bool,
    depth: u8,
}

impl std::fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("sheet", &self.sheet)
            .field("row", &self.row)
            .field("col", &self.col)
            .field("date_1904", &self.date_1904)
            .finish()
    }
}

impl<'a> EvaluationContext<'a> {
    /// Create a context for the formula at `sheet!(row, col)`
    pub fn new(resolver: &'a dyn ReferenceResolver, sheet: &'a str, row: u32, col: u16) -> Self {
        Self {
            resolver: Some(resolver),
            sheet,
            row,
            col,
            date_1904: false,
            depth: 0,
        }
    }

    /// A context with no document behind it
    pub fn simple() -> Self {
        Self {
            resolver: None,
            sheet: "Sheet1",
            row: 1,
            col: 1,
            date_1904: false,
            depth: 0,
        }
    }

    pub fn with_date_1904(mut self, date_1904: bool) -> Self {
        self.date_1904 = date_1904;
        self
    }

    /// Qualify a reference written in the formula with the formula's sheet
    pub fn qualify(&self, reference: &Reference) -> Reference {
        reference.clone().qualified_or(self.sheet)
    }

    /// Get a cell value
    pub fn get_cell_value(&self, reference: &Reference) -> FormulaValue {
        match self.resolver {
            Some(resolver) => resolver.cell_value(&self.qualify(reference)),
            None => FormulaValue::Empty,
        }
    }

    /// Get the values of a range as an array
    pub fn get_range_values(&self, reference: &Reference) -> FormulaValue {
        match self.resolver {
            Some(resolver) => resolver.range_values(&self.qualify(reference)),
            None => FormulaValue::Array(Vec::new()),
        }
    }

    /// Resolve a named range to its value
    pub fn resolve_named_range(&self, name: &str) -> FormulaResult<FormulaValue> {
        let target = self
            .resolver
            .and_then(|resolver| resolver.resolve_name(name, self.sheet));

        match target {
            Some(NameTarget::Reference(reference)) if reference.is_cell() => {
                Ok(self.get_cell_value(&reference))
            }
            Some(NameTarget::Reference(reference)) => Ok(self.get_range_values(&reference)),
            Some(NameTarget::Expression(text)) => {
                if self.depth >= MAX_NAME_DEPTH {
                    return Ok(FormulaValue::Error(CellError::Name));
                }
                let expr = parse_formula(&text)?;
                let nested = Self {
                    depth: self.depth + 1,
                    ..*self
                };
                evaluate(&expr, &nested)
            }
            None => Ok(FormulaValue::Error(CellError::Name)),
        }
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(FormulaValue::Error(*e)),

        // === References ===
        FormulaExpr::CellRef(reference) => Ok(ctx.get_cell_value(reference)),
        FormulaExpr::RangeRef(reference) => Ok(ctx.get_range_values(reference)),
        FormulaExpr::NameRef(name) => ctx.resolve_named_range(name),

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
                    result_row.push(evaluate(expr, ctx)?);
                }
                result_rows.push(result_row);
            }
            Ok(FormulaValue::Array(result_rows))
        }
    }
}

/// A one-cell array acts as its only element in scalar position
fn scalar(value: FormulaValue) -> FormulaValue {
    match value {
        FormulaValue::Array(mut rows) if rows.len() == 1 && rows[0].len() == 1 => {
            rows[0].pop().unwrap_or(FormulaValue::Empty)
        }
        FormulaValue::Array(_) => FormulaValue::Error(CellError::Value),
        other => other,
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    if op == BinaryOperator::Range {
        return Err(FormulaError::Evaluation(
            "Range operator needs cell references on both sides".into(),
        ));
    }

    let left_val = scalar(evaluate(left, ctx)?);
    let right_val = scalar(evaluate(right, ctx)?);

    // Propagate errors
    if let Some(e) = left_val.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    if let Some(e) = right_val.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let numbers = || match (left_val.as_number(), right_val.as_number()) {
        (Some(l), Some(r)) => Some((l, r)),
        _ => None,
    };

    let result = match op {
        BinaryOperator::Add => numbers().map(|(l, r)| FormulaValue::Number(l + r)),
        BinaryOperator::Subtract => numbers().map(|(l, r)| FormulaValue::Number(l - r)),
        BinaryOperator::Multiply => numbers().map(|(l, r)| FormulaValue::Number(l * r)),
        BinaryOperator::Divide => numbers().map(|(l, r)| {
            if r == 0.0 {
                FormulaValue::Error(CellError::Div0)
            } else {
                FormulaValue::Number(l / r)
            }
        }),
        BinaryOperator::Power => numbers().map(|(l, r)| {
            let result = l.powf(r);
            if result.is_finite() {
                FormulaValue::Number(result)
            } else {
                FormulaValue::Error(CellError::Num)
            }
        }),

        BinaryOperator::Equal => Some(compare_values(&left_val, &right_val).is_eq().into()),
        BinaryOperator::NotEqual => Some(compare_values(&left_val, &right_val).is_ne().into()),
        BinaryOperator::LessThan => Some(compare_values(&left_val, &right_val).is_lt().into()),
        BinaryOperator::LessEqual => Some(compare_values(&left_val, &right_val).is_le().into()),
        BinaryOperator::GreaterThan => {
            Some(compare_values(&left_val, &right_val).is_gt().into())
        }
        BinaryOperator::GreaterEqual => {
            Some(compare_values(&left_val, &right_val).is_ge().into())
        }

        BinaryOperator::Concat => Some(FormulaValue::String(
            left_val.as_string() + &right_val.as_string(),
        )),

        BinaryOperator::Range => None,
    };

    Ok(result.unwrap_or(FormulaValue::Error(CellError::Value)))
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

/// Compare two values for ordering (Excel-style comparison)
pub(crate) fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    use FormulaValue::*;

    // Empty compares as the zero value of the other side's type
    let left = match (left, right) {
        (Empty, String(_)) => &String(std::string::String::new()),
        (Empty, Boolean(_)) => &Boolean(false),
        (Empty, _) => &Number(0.0),
        (v, _) => v,
    };
    let right = match (right, left) {
        (Empty, String(_)) => &String(std::string::String::new()),
        (Empty, Boolean(_)) => &Boolean(false),
        (Empty, _) => &Number(0.0),
        (v, _) => v,
    };

    // Mixed types: number < string < boolean
    let rank = |v: &FormulaValue| match v {
        Number(_) | Empty => 0,
        String(_) => 1,
        Boolean(_) => 2,
        Error(_) | Array(_) => 3,
    };

    match (left, right) {
        (Number(l), Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
        // Strings compare case-insensitively
        (String(l), String(r)) => l.to_lowercase().cmp(&r.to_lowercase()),
        (Boolean(l), Boolean(r)) => l.cmp(r),
        (Error(l), Error(r)) => l.as_str().cmp(r.as_str()),
        (l, r) => rank(l).cmp(&rank(r)),
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let val = scalar(evaluate(operand, ctx)?);

    // Propagate errors
    if let Some(e) = val.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let Some(n) = val.as_number() else {
        return Ok(FormulaValue::Error(CellError::Value));
    };

    Ok(match op {
        UnaryOperator::Negate => FormulaValue::Number(-n),
        UnaryOperator::Percent => FormulaValue::Number(n / 100.0),
    })
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let func = FUNCTION_REGISTRY
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    // Check argument count
    if args.len() < func.min_args {
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected: format!("at least {}", func.min_args),
            actual: args.len(),
        });
    }

    if let Some(max) = func.max_args {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    // Evaluate arguments
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(evaluate(arg, ctx)?);
    }

    // Call the function
    (func.implementation)(&evaluated_args, ctx)
}

/// Whether `name` is a registered function
pub fn is_known_function(name: &str) -> bool {
    FUNCTION_REGISTRY.get(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use cellgraph_core::{sheet_names_equal, CellRef, RichText};

    fn eval(formula: &str) -> FormulaResult<FormulaValue> {
        let ast = parse_formula(formula)?;
        let ctx = EvaluationContext::simple();
        evaluate(&ast, &ctx)
    }

    /// A grid of values plus a handful of names
    #[derive(Default)]
    struct Grid {
        cells: AHashMap<CellRef, CellValue>,
        names: Vec<(&'static str, NameTarget)>,
    }

    impl Grid {
        fn set(&mut self, address: &str, value: CellValue) {
            let cell = CellRef::parse(address, Some("Sheet1")).unwrap();
            self.cells.insert(cell, value);
        }

        fn value_at(&self, sheet: &str, row: u32, col: u16) -> FormulaValue {
            self.cells
                .iter()
                .find(|(c, _)| sheet_names_equal(&c.sheet, sheet) && c.row == row && c.col == col)
                .map(|(_, v)| FormulaValue::from_cell(v, false))
                .unwrap_or(FormulaValue::Empty)
        }
    }

    impl ReferenceResolver for Grid {
        fn cell_value(&self, reference: &Reference) -> FormulaValue {
            let sheet = reference.sheet.as_deref().unwrap_or_default();
            self.value_at(sheet, reference.start.row, reference.start.col)
        }

        fn range_values(&self, reference: &Reference) -> FormulaValue {
            let sheet = reference.sheet.as_deref().unwrap_or_default();
            let rows = (reference.start.row..=reference.end.row)
                .map(|row| {
                    (reference.start.col..=reference.end.col)
                        .map(|col| self.value_at(sheet, row, col))
                        .collect()
                })
                .collect();
            FormulaValue::Array(rows)
        }

        fn resolve_name(&self, name: &str, _sheet: &str) -> Option<NameTarget> {
            self.names
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, t)| t.clone())
        }
    }

    fn eval_in(grid: &Grid, formula: &str) -> FormulaResult<FormulaValue> {
        let ast = parse_formula(formula)?;
        evaluate(&ast, &EvaluationContext::new(grid, "Sheet1", 10, 10))
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("=42").unwrap(), FormulaValue::Number(42.0));
        assert_eq!(
            eval("=\"Hello\"").unwrap(),
            FormulaValue::String("Hello".into())
        );
        assert_eq!(eval("=TRUE").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=#N/A").unwrap(), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("=1+2").unwrap(), FormulaValue::Number(3.0));
        assert_eq!(eval("=10-3").unwrap(), FormulaValue::Number(7.0));
        assert_eq!(eval("=4*5").unwrap(), FormulaValue::Number(20.0));
        assert_eq!(eval("=20/4").unwrap(), FormulaValue::Number(5.0));
        assert_eq!(eval("=2^10").unwrap(), FormulaValue::Number(1024.0));
        assert_eq!(eval("=1+2*3").unwrap(), FormulaValue::Number(7.0));
        assert_eq!(eval("=(1+2)*3").unwrap(), FormulaValue::Number(9.0));
        assert_eq!(eval("=-5+2").unwrap(), FormulaValue::Number(-3.0));
        assert_eq!(eval("=50%").unwrap(), FormulaValue::Number(0.5));
    }

    #[test]
    fn test_evaluate_type_mismatch_is_value_error() {
        assert_eq!(
            eval("=\"abc\"+1").unwrap(),
            FormulaValue::Error(CellError::Value)
        );
        assert_eq!(eval("=\"2\"*3").unwrap(), FormulaValue::Number(6.0));
        assert_eq!(eval("=-\"x\"").unwrap(), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_evaluate_comparison() {
        assert_eq!(eval("=5>3").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=5<3").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("=5=5").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=5<>5").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(
            eval("=\"abc\"=\"ABC\"").unwrap(),
            FormulaValue::Boolean(true)
        );
        assert_eq!(eval("=1<\"a\"").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("=\"z\"<TRUE").unwrap(), FormulaValue::Boolean(true));
    }

    #[test]
    fn test_evaluate_concatenation() {
        assert_eq!(
            eval("=\"Hello \"&\"World\"").unwrap(),
            FormulaValue::String("Hello World".into())
        );
        assert_eq!(
            eval("=\"Value: \"&42").unwrap(),
            FormulaValue::String("Value: 42".into())
        );
    }

    #[test]
    fn test_evaluate_errors_propagate() {
        assert_eq!(eval("=1/0").unwrap(), FormulaValue::Error(CellError::Div0));
        assert_eq!(
            eval("=#REF!+1").unwrap(),
            FormulaValue::Error(CellError::Ref)
        );
        assert!(matches!(
            eval("=NOSUCHFN(1)"),
            Err(FormulaError::UnknownFunction(_))
        ));
        assert!(matches!(
            eval("=ABS(1,2)"),
            Err(FormulaError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn test_evaluate_array() {
        let result = eval("={1,2;3,4}").unwrap();
        assert_eq!(
            result,
            FormulaValue::Array(vec![
                vec![FormulaValue::Number(1.0), FormulaValue::Number(2.0)],
                vec![FormulaValue::Number(3.0), FormulaValue::Number(4.0)],
            ])
        );
    }

    #[test]
    fn test_references_resolve_through_the_resolver() {
        let mut grid = Grid::default();
        grid.set("A1", CellValue::Number(1.0));
        grid.set("A2", CellValue::Number(2.0));
        grid.set("Other!B1", CellValue::Number(40.0));

        assert_eq!(eval_in(&grid, "=A1+A2").unwrap(), FormulaValue::Number(3.0));
        assert_eq!(
            eval_in(&grid, "=SUM(A1:A3)").unwrap(),
            FormulaValue::Number(3.0)
        );
        assert_eq!(
            eval_in(&grid, "=other!B1+A2").unwrap(),
            FormulaValue::Number(42.0)
        );
        // Empty cells read as zero
        assert_eq!(eval_in(&grid, "=C7*2").unwrap(), FormulaValue::Number(0.0));
    }

    #[test]
    fn test_dates_and_rich_text_are_coerced() {
        let mut grid = Grid::default();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        grid.set("A1", CellValue::Date(date));
        grid.set(
            "A2",
            CellValue::RichText(RichText::new().push("Hello ", Some(3)).push("there", None)),
        );

        assert_eq!(eval_in(&grid, "=A1").unwrap(), FormulaValue::Number(45292.0));
        assert_eq!(
            eval_in(&grid, "=LEN(A2)").unwrap(),
            FormulaValue::Number(11.0)
        );
    }

    #[test]
    fn test_named_ranges() {
        let mut grid = Grid::default();
        grid.set("A1", CellValue::Number(10.0));
        grid.set("A2", CellValue::Number(20.0));
        grid.names = vec![
            ("First", NameTarget::Reference(Reference::cell("Sheet1", 1, 1))),
            (
                "Both",
                NameTarget::Reference(Reference::range("Sheet1", 1, 1, 2, 1)),
            ),
            ("Rate", NameTarget::Expression("0.5".into())),
            ("Scaled", NameTarget::Expression("Both_Sum*Rate".into())),
            ("Both_Sum", NameTarget::Expression("SUM(Both)".into())),
            ("Loop", NameTarget::Expression("Loop+1".into())),
        ];

        assert_eq!(eval_in(&grid, "=First*2").unwrap(), FormulaValue::Number(20.0));
        assert_eq!(
            eval_in(&grid, "=SUM(Both)").unwrap(),
            FormulaValue::Number(30.0)
        );
        assert_eq!(eval_in(&grid, "=Scaled").unwrap(), FormulaValue::Number(15.0));
        assert_eq!(
            eval_in(&grid, "=Missing+1").unwrap(),
            FormulaValue::Error(CellError::Name)
        );
        assert_eq!(
            eval_in(&grid, "=Loop").unwrap(),
            FormulaValue::Error(CellError::Name)
        );
    }

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(
            CellValue::from(FormulaValue::Number(1.5)),
            CellValue::Number(1.5)
        );
        assert_eq!(
            CellValue::from(FormulaValue::Array(vec![vec![FormulaValue::Empty]])),
            CellValue::Error(CellError::Value)
        );
        assert_eq!(
            FormulaValue::from_cell(&CellValue::Error(CellError::Circular), false),
            FormulaValue::Error(CellError::Circular)
        );
    }
}
