//! Math functions: `abs`, `ceiling`, `floor`, `round(precision?)`, `sqrt`,
//! `truncate`, `exp`, `ln`, `log(base)`, `power(exponent)`.

use super::{check_arity, eval_args};
use crate::ast::ExpressionNode;
use crate::error::{FhirPathError, Result};
use crate::evaluator::{singleton_operand, Context, Evaluator};
use crate::model::{Collection, FhirPathValue, Quantity};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

fn as_decimal(collection: &Collection, label: &str) -> Result<Option<Decimal>> {
    match singleton_operand(collection, label)? {
        None => Ok(None),
        Some(FhirPathValue::Integer(i)) => Ok(Some(Decimal::from(*i))),
        Some(FhirPathValue::Long(i)) => Ok(Some(Decimal::from(*i))),
        Some(FhirPathValue::Decimal(d)) => Ok(Some(*d)),
        Some(other) => Err(FhirPathError::type_error(format!("{label} requires a numeric value, got {other:?}"))),
    }
}

pub(crate) fn abs(invocant: &Collection) -> Result<Collection> {
    match singleton_operand(invocant, "abs()")? {
        None => Ok(Collection::empty()),
        Some(FhirPathValue::Integer(i)) => Ok(Collection::singleton(FhirPathValue::Integer(i.abs()))),
        Some(FhirPathValue::Long(i)) => Ok(Collection::singleton(FhirPathValue::Long(i.abs()))),
        Some(FhirPathValue::Decimal(d)) => Ok(Collection::singleton(FhirPathValue::Decimal(d.abs()))),
        Some(FhirPathValue::Quantity(q)) => Ok(Collection::singleton(FhirPathValue::Quantity(Quantity::new(q.value.abs(), q.unit.clone())))),
        Some(other) => Err(FhirPathError::type_error(format!("abs() requires a numeric value, got {other:?}"))),
    }
}

pub(crate) fn ceiling(invocant: &Collection) -> Result<Collection> {
    let Some(d) = as_decimal(invocant, "ceiling()")? else {
        return Ok(Collection::empty());
    };
    decimal_to_integer(d.ceil())
}

pub(crate) fn floor(invocant: &Collection) -> Result<Collection> {
    let Some(d) = as_decimal(invocant, "floor()")? else {
        return Ok(Collection::empty());
    };
    decimal_to_integer(d.floor())
}

pub(crate) fn truncate(invocant: &Collection) -> Result<Collection> {
    let Some(d) = as_decimal(invocant, "truncate()")? else {
        return Ok(Collection::empty());
    };
    decimal_to_integer(d.trunc())
}

fn decimal_to_integer(d: Decimal) -> Result<Collection> {
    let i = i64::try_from(d).map_err(|_| FhirPathError::type_error(format!("{d} is out of Integer range")))?;
    Ok(Collection::singleton(FhirPathValue::Integer(i)))
}

pub(crate) fn round(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("round", args, 0, Some(1))?;
    let Some(d) = as_decimal(invocant, "round()")? else {
        return Ok(Collection::empty());
    };
    let precision = match args.first() {
        Some(arg) => {
            let evaluated = ev.eval(arg, ctx, depth)?;
            match singleton_operand(&evaluated, "round() precision")? {
                None => return Ok(Collection::empty()),
                Some(FhirPathValue::Integer(p)) => (*p).max(0) as u32,
                Some(other) => return Err(FhirPathError::type_error(format!("round() precision must be an Integer, got {other:?}"))),
            }
        }
        None => 0,
    };
    let rounded = d.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    Ok(Collection::singleton(FhirPathValue::Decimal(rounded)))
}

pub(crate) fn sqrt(invocant: &Collection) -> Result<Collection> {
    let Some(d) = as_decimal(invocant, "sqrt()")? else {
        return Ok(Collection::empty());
    };
    match d.sqrt() {
        Some(root) => Ok(Collection::singleton(FhirPathValue::Decimal(root))),
        None => Ok(Collection::empty()),
    }
}

pub(crate) fn exp(invocant: &Collection) -> Result<Collection> {
    let Some(d) = as_decimal(invocant, "exp()")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(FhirPathValue::Decimal(d.exp())))
}

pub(crate) fn ln(invocant: &Collection) -> Result<Collection> {
    let Some(d) = as_decimal(invocant, "ln()")? else {
        return Ok(Collection::empty());
    };
    if d <= Decimal::ZERO {
        return Ok(Collection::empty());
    }
    Ok(Collection::singleton(FhirPathValue::Decimal(d.ln())))
}

pub(crate) fn log(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("log", args, 1, Some(1))?;
    let Some(d) = as_decimal(invocant, "log()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(base) = as_decimal(&evaluated[0], "log() base")? else {
        return Ok(Collection::empty());
    };
    if d <= Decimal::ZERO || base <= Decimal::ZERO || base == Decimal::ONE {
        return Ok(Collection::empty());
    }
    Ok(Collection::singleton(FhirPathValue::Decimal(d.ln() / base.ln())))
}

pub(crate) fn power(ev: &Evaluator, invocant: &Collection, args: &[ExpressionNode], ctx: &Context, depth: usize) -> Result<Collection> {
    check_arity("power", args, 1, Some(1))?;
    let Some(base) = as_decimal(invocant, "power()")? else {
        return Ok(Collection::empty());
    };
    let evaluated = eval_args(ev, args, ctx, depth)?;
    let Some(exponent) = as_decimal(&evaluated[0], "power() exponent")? else {
        return Ok(Collection::empty());
    };
    if let Ok(exp_i64) = i64::try_from(exponent) {
        if exponent.fract().is_zero() {
            match base.checked_powi(exp_i64) {
                Some(result) => return Ok(Collection::singleton(FhirPathValue::Decimal(result))),
                None => return Ok(Collection::empty()),
            }
        }
    }
    if base < Decimal::ZERO {
        // A negative base with a fractional exponent has no real result.
        return Ok(Collection::empty());
    }
    match base.checked_powd(exponent) {
        Some(result) => Ok(Collection::singleton(FhirPathValue::Decimal(result))),
        None => Ok(Collection::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_and_floor_on_decimal() {
        let c = Collection::singleton(FhirPathValue::Decimal(Decimal::new(15, 1)));
        assert_eq!(ceiling(&c).unwrap().as_singleton(), Some(&FhirPathValue::Integer(2)));
        assert_eq!(floor(&c).unwrap().as_singleton(), Some(&FhirPathValue::Integer(1)));
    }

    #[test]
    fn sqrt_of_negative_is_empty() {
        let c = Collection::singleton(FhirPathValue::Integer(-4));
        assert!(sqrt(&c).unwrap().is_empty());
    }

    #[test]
    fn abs_preserves_value_kind() {
        assert_eq!(abs(&Collection::singleton(FhirPathValue::Integer(-3))).unwrap().as_singleton(), Some(&FhirPathValue::Integer(3)));
    }
}
