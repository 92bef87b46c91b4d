//! Text functions

use super::{flatten, number_arg, text_arg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellgraph_core::CellError;

fn text_result(
    args: &[FormulaValue],
    f: impl FnOnce(String) -> FormulaValue,
) -> FormulaResult<FormulaValue> {
    Ok(match text_arg(args, 0) {
        Ok(s) => f(s),
        Err(e) => FormulaValue::Error(e),
    })
}

/// Character count for LEFT/RIGHT; defaults to 1 and rejects negatives
fn char_count(args: &[FormulaValue]) -> Result<usize, CellError> {
    let n = number_arg(args, 1, Some(1.0))?.trunc();
    if n < 0.0 {
        return Err(CellError::Value);
    }
    Ok(n as usize)
}

/// LEN(text)
pub fn fn_len(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    text_result(args, |s| FormulaValue::Number(s.chars().count() as f64))
}

/// LOWER(text)
pub fn fn_lower(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    text_result(args, |s| FormulaValue::String(s.to_lowercase()))
}

/// UPPER(text)
pub fn fn_upper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    text_result(args, |s| FormulaValue::String(s.to_uppercase()))
}

/// TRIM(text) - also collapses inner runs of spaces
pub fn fn_trim(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    text_result(args, |s| {
        FormulaValue::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
    })
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = match char_count(args) {
        Ok(n) => n,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    text_result(args, |s| FormulaValue::String(s.chars().take(n).collect()))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = match char_count(args) {
        Ok(n) => n,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    text_result(args, |s| {
        let skip = s.chars().count().saturating_sub(n);
        FormulaValue::String(s.chars().skip(skip).collect())
    })
}

/// CONCAT(text1, ...) - also registered as CONCATENATE
pub fn fn_concat(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut out = String::new();
    for v in args.iter().flat_map(flatten) {
        if let FormulaValue::Error(e) = v {
            return Ok(FormulaValue::Error(*e));
        }
        out.push_str(&v.as_string());
    }
    Ok(FormulaValue::String(out))
}
