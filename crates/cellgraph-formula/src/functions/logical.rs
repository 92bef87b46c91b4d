//! Logical functions

use super::flatten;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellgraph_core::CellError;

fn condition(value: &FormulaValue) -> Result<bool, CellError> {
    match value {
        FormulaValue::Error(e) => Err(*e),
        v => v.as_bool().ok_or(CellError::Value),
    }
}

/// IF(condition, value_if_true, [value_if_false])
pub fn fn_if(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let chosen = match args.first().map(condition) {
        Some(Ok(true)) => args.get(1),
        Some(Ok(false)) => args.get(2),
        Some(Err(e)) => return Ok(FormulaValue::Error(e)),
        None => return Ok(FormulaValue::Error(CellError::Value)),
    };
    Ok(chosen.cloned().unwrap_or(FormulaValue::Boolean(false)))
}

/// Logical values among the arguments; text and empties in ranges are skipped.
fn logicals(args: &[FormulaValue]) -> Result<Vec<bool>, CellError> {
    let mut out = Vec::new();
    for v in args.iter().flat_map(flatten) {
        match v {
            FormulaValue::Boolean(b) => out.push(*b),
            FormulaValue::Number(n) => out.push(*n != 0.0),
            FormulaValue::Error(e) => return Err(*e),
            _ => {}
        }
    }
    if out.is_empty() {
        return Err(CellError::Value);
    }
    Ok(out)
}

/// AND(logical1, ...)
pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match logicals(args) {
        Ok(values) => FormulaValue::Boolean(values.iter().all(|b| *b)),
        Err(e) => FormulaValue::Error(e),
    })
}

/// OR(logical1, ...)
pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match logicals(args) {
        Ok(values) => FormulaValue::Boolean(values.iter().any(|b| *b)),
        Err(e) => FormulaValue::Error(e),
    })
}

/// NOT(logical)
pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match args.first().map(condition) {
        Some(Ok(b)) => FormulaValue::Boolean(!b),
        Some(Err(e)) => FormulaValue::Error(e),
        None => FormulaValue::Error(CellError::Value),
    })
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match (args.first(), args.get(1)) {
        (Some(FormulaValue::Error(_)), Some(fallback)) => Ok(fallback.clone()),
        (Some(value), _) => Ok(value.clone()),
        (None, _) => Ok(FormulaValue::Error(CellError::Value)),
    }
}

/// IFNA(value, value_if_na) - only catches #N/A
pub fn fn_ifna(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match (args.first(), args.get(1)) {
        (Some(FormulaValue::Error(CellError::Na)), Some(fallback)) => Ok(fallback.clone()),
        (Some(value), _) => Ok(value.clone()),
        (None, _) => Ok(FormulaValue::Error(CellError::Value)),
    }
}

/// TRUE()
pub fn fn_true(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE()
pub fn fn_false(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::{evaluate, EvaluationContext, FormulaValue};
    use crate::parser::parse_formula;
    use cellgraph_core::CellError;

    fn eval(formula: &str) -> FormulaValue {
        let ast = parse_formula(formula).unwrap();
        evaluate(&ast, &EvaluationContext::simple()).unwrap()
    }

    #[test]
    fn test_if() {
        assert_eq!(eval("=IF(TRUE,1,2)"), FormulaValue::Number(1.0));
        assert_eq!(eval("=IF(0,1,2)"), FormulaValue::Number(2.0));
        assert_eq!(eval("=IF(FALSE,1)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=IF(\"maybe\",1,2)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=IF(1/0,1,2)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(eval("=AND(TRUE,1,{TRUE,\"x\"})"), FormulaValue::Boolean(true));
        assert_eq!(eval("=AND(TRUE,0)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=OR(FALSE,0,1)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=OR({\"x\"})"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=NOT(TRUE)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=TRUE()"), FormulaValue::Boolean(true));
        assert_eq!(eval("=FALSE()"), FormulaValue::Boolean(false));
    }

    #[test]
    fn test_error_traps() {
        assert_eq!(eval("=IFERROR(1/0,\"bad\")"), FormulaValue::String("bad".into()));
        assert_eq!(eval("=IFERROR(5,\"bad\")"), FormulaValue::Number(5.0));
        assert_eq!(eval("=IFNA(#N/A,0)"), FormulaValue::Number(0.0));
        assert_eq!(eval("=IFNA(#REF!,0)"), FormulaValue::Error(CellError::Ref));
    }
}
