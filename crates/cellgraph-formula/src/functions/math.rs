//! Math and aggregate functions

use super::{flatten, number_arg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellgraph_core::CellError;

/// Numbers among the arguments; the first error wins.
///
/// Direct scalar arguments are coerced (`SUM(TRUE, "2")` is 3) while values
/// read from ranges only count when they are numbers.
fn numbers(args: &[FormulaValue]) -> Result<Vec<f64>, CellError> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Error(e) => return Err(*e),
            FormulaValue::Array(_) => {
                for v in flatten(arg) {
                    match v {
                        FormulaValue::Number(n) => out.push(*n),
                        FormulaValue::Error(e) => return Err(*e),
                        _ => {}
                    }
                }
            }
            FormulaValue::Empty => {}
            v => match v.as_number() {
                Some(n) => out.push(n),
                None => return Err(CellError::Value),
            },
        }
    }
    Ok(out)
}

fn aggregate(
    args: &[FormulaValue],
    f: impl FnOnce(&[f64]) -> FormulaValue,
) -> FormulaResult<FormulaValue> {
    Ok(match numbers(args) {
        Ok(values) => f(&values),
        Err(e) => FormulaValue::Error(e),
    })
}

/// SUM(number1, ...)
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    aggregate(args, |v| FormulaValue::Number(v.iter().sum()))
}

/// AVERAGE(number1, ...) - #DIV/0! when nothing is numeric
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    aggregate(args, |v| {
        if v.is_empty() {
            FormulaValue::Error(CellError::Div0)
        } else {
            FormulaValue::Number(v.iter().sum::<f64>() / v.len() as f64)
        }
    })
}

/// MIN(number1, ...) - 0 when nothing is numeric
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    aggregate(args, |v| {
        FormulaValue::Number(v.iter().copied().reduce(f64::min).unwrap_or(0.0))
    })
}

/// MAX(number1, ...) - 0 when nothing is numeric
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    aggregate(args, |v| {
        FormulaValue::Number(v.iter().copied().reduce(f64::max).unwrap_or(0.0))
    })
}

/// COUNT(value1, ...) - counts numbers, never fails
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .flat_map(flatten)
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTA(value1, ...) - counts anything that is not empty
pub fn fn_counta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .flat_map(flatten)
        .filter(|v| !matches!(v, FormulaValue::Empty))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// ABS(number)
pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match number_arg(args, 0, None) {
        Ok(n) => FormulaValue::Number(n.abs()),
        Err(e) => FormulaValue::Error(e),
    })
}

/// ROUND(number, [num_digits]) - half away from zero
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (number, digits) = match (number_arg(args, 0, None), number_arg(args, 1, Some(0.0))) {
        (Ok(n), Ok(d)) => (n, d.trunc() as i32),
        (Err(e), _) | (_, Err(e)) => return Ok(FormulaValue::Error(e)),
    };

    let multiplier = 10_f64.powi(digits);
    let result = if number >= 0.0 {
        (number * multiplier + 0.5).floor() / multiplier
    } else {
        (number * multiplier - 0.5).ceil() / multiplier
    };
    Ok(FormulaValue::Number(result))
}

/// MOD(number, divisor) - the result takes the divisor's sign
pub fn fn_mod(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (number, divisor) = match (number_arg(args, 0, None), number_arg(args, 1, None)) {
        (Ok(n), Ok(d)) => (n, d),
        (Err(e), _) | (_, Err(e)) => return Ok(FormulaValue::Error(e)),
    };

    if divisor == 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number(
        number - divisor * (number / divisor).floor(),
    ))
}

/// INT(number) - rounds toward negative infinity
pub fn fn_int(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match number_arg(args, 0, None) {
        Ok(n) => FormulaValue::Number(n.floor()),
        Err(e) => FormulaValue::Error(e),
    })
}

/// SQRT(number) - #NUM! for negatives
pub fn fn_sqrt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match number_arg(args, 0, None) {
        Ok(n) if n < 0.0 => FormulaValue::Error(CellError::Num),
        Ok(n) => FormulaValue::Number(n.sqrt()),
        Err(e) => FormulaValue::Error(e),
    })
}

/// POWER(number, power)
pub fn fn_power(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (number, power) = match (number_arg(args, 0, None), number_arg(args, 1, None)) {
        (Ok(n), Ok(p)) => (n, p),
        (Err(e), _) | (_, Err(e)) => return Ok(FormulaValue::Error(e)),
    };

    if number == 0.0 && power < 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    let result = number.powf(power);
    if result.is_finite() {
        Ok(FormulaValue::Number(result))
    } else {
        Ok(FormulaValue::Error(CellError::Num))
    }
}
