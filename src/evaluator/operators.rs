//! Binary/unary operator semantics over singleton [`FhirPathValue`]s.
//!
//! Every function here assumes its caller has already extracted singleton
//! operands from their collections and mapped a genuinely empty operand to
//! `None` before calling (Testable Properties §8: `empty ⊗ x = empty`) —
//! this module only encodes what happens once both operands are present.
//! A `Result<Option<_>>` return distinguishes a type error (`Err`) from a
//! spec-sanctioned empty result (`Ok(None)`, e.g. division by zero).

use crate::error::{FhirPathError, Result};
use crate::model::{FhirPathValue, Quantity};
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;

/// Round a decimal arithmetic result to `significant_digits` significant
/// figures, half-away-from-zero (spec §9: "precision of 15 significant
/// digits" — `EvaluationConfig::decimal_precision` makes it configurable).
pub fn round_significant(value: Decimal, significant_digits: u32) -> Decimal {
    if value.is_zero() || significant_digits == 0 {
        return value;
    }
    let magnitude = value.abs().to_f64().unwrap_or(1.0).log10().floor() as i32;
    let decimal_places = (significant_digits as i32 - 1 - magnitude).clamp(0, 28) as u32;
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Copy)]
enum Num {
    Integer(i64),
    Long(i64),
    Decimal(Decimal),
}

fn as_num(v: &FhirPathValue) -> Option<Num> {
    match v {
        FhirPathValue::Integer(i) => Some(Num::Integer(*i)),
        FhirPathValue::Long(i) => Some(Num::Long(*i)),
        FhirPathValue::Decimal(d) => Some(Num::Decimal(*d)),
        _ => None,
    }
}

fn num_to_decimal(n: Num) -> Decimal {
    match n {
        Num::Integer(i) | Num::Long(i) => Decimal::from(i),
        Num::Decimal(d) => d,
    }
}

enum Widened {
    Integer(i64, i64),
    Long(i64, i64),
    Decimal(Decimal, Decimal),
}

fn widen(a: Num, b: Num) -> Widened {
    match (a, b) {
        (Num::Decimal(_), _) | (_, Num::Decimal(_)) => Widened::Decimal(num_to_decimal(a), num_to_decimal(b)),
        (Num::Long(x), Num::Long(y)) => Widened::Long(x, y),
        (Num::Long(x), Num::Integer(y)) | (Num::Integer(x), Num::Long(y)) => Widened::Long(x, y),
        (Num::Integer(x), Num::Integer(y)) => Widened::Integer(x, y),
    }
}

/// `a + b`.
pub fn add(a: &FhirPathValue, b: &FhirPathValue, precision: u32) -> Result<FhirPathValue> {
    if let (FhirPathValue::String(x), FhirPathValue::String(y)) = (a, b) {
        return Ok(FhirPathValue::String(format!("{x}{y}")));
    }
    if let (FhirPathValue::Quantity(x), FhirPathValue::Quantity(y)) = (a, b) {
        return x
            .add(y)
            .map(FhirPathValue::Quantity)
            .ok_or_else(|| FhirPathError::type_error(format!("cannot add incompatible quantities '{x}' and '{y}'")));
    }
    match (as_num(a), as_num(b)) {
        (Some(x), Some(y)) => Ok(arithmetic_result(widen(x, y), precision, |l, r| l + r, |l, r| l + r)),
        _ => Err(type_error("+", a, b)),
    }
}

/// `a - b`.
pub fn subtract(a: &FhirPathValue, b: &FhirPathValue, precision: u32) -> Result<FhirPathValue> {
    if let (FhirPathValue::Quantity(x), FhirPathValue::Quantity(y)) = (a, b) {
        return x
            .subtract(y)
            .map(FhirPathValue::Quantity)
            .ok_or_else(|| FhirPathError::type_error(format!("cannot subtract incompatible quantities '{x}' and '{y}'")));
    }
    match (as_num(a), as_num(b)) {
        (Some(x), Some(y)) => Ok(arithmetic_result(widen(x, y), precision, |l, r| l - r, |l, r| l - r)),
        _ => Err(type_error("-", a, b)),
    }
}

/// `a * b`.
pub fn multiply(a: &FhirPathValue, b: &FhirPathValue, precision: u32) -> Result<FhirPathValue> {
    match (a, b) {
        (FhirPathValue::Quantity(x), FhirPathValue::Quantity(y)) => Ok(FhirPathValue::Quantity(x.multiply(y))),
        (FhirPathValue::Quantity(q), other) | (other, FhirPathValue::Quantity(q)) => match as_num(other) {
            Some(n) => Ok(FhirPathValue::Quantity(Quantity::new(
                round_significant(q.value * num_to_decimal(n), precision),
                q.unit.clone(),
            ))),
            None => Err(type_error("*", a, b)),
        },
        _ => match (as_num(a), as_num(b)) {
            (Some(x), Some(y)) => Ok(arithmetic_result(widen(x, y), precision, |l, r| l * r, |l, r| l * r)),
            _ => Err(type_error("*", a, b)),
        },
    }
}

/// `a / b`. Always yields `Decimal`; division by zero is empty, not an error.
pub fn divide(a: &FhirPathValue, b: &FhirPathValue, precision: u32) -> Result<Option<FhirPathValue>> {
    match (a, b) {
        (FhirPathValue::Quantity(x), FhirPathValue::Quantity(y)) => Ok(x.divide(y).map(FhirPathValue::Quantity)),
        (FhirPathValue::Quantity(q), other) => match as_num(other) {
            Some(n) => {
                let divisor = num_to_decimal(n);
                if divisor.is_zero() {
                    return Ok(None);
                }
                Ok(Some(FhirPathValue::Quantity(Quantity::new(
                    round_significant(q.value / divisor, precision),
                    q.unit.clone(),
                ))))
            }
            None => Err(type_error("/", a, b)),
        },
        _ => match (as_num(a), as_num(b)) {
            (Some(x), Some(y)) => {
                let (l, r) = (num_to_decimal(x), num_to_decimal(y));
                if r.is_zero() {
                    return Ok(None);
                }
                Ok(Some(FhirPathValue::Decimal(round_significant(l / r, precision))))
            }
            _ => Err(type_error("/", a, b)),
        },
    }
}

/// `a div b`: integral quotient. Division by zero is empty.
pub fn integer_divide(a: &FhirPathValue, b: &FhirPathValue) -> Result<Option<FhirPathValue>> {
    match (as_num(a), as_num(b)) {
        (Some(x), Some(y)) => {
            let (l, r) = (num_to_decimal(x), num_to_decimal(y));
            if r.is_zero() {
                return Ok(None);
            }
            let quotient = (l / r).trunc();
            Ok(Some(FhirPathValue::Integer(i64::try_from(quotient).unwrap_or_default())))
        }
        _ => Err(type_error("div", a, b)),
    }
}

/// `a mod b`: remainder, sign of the dividend. Division by zero is empty.
pub fn modulo(a: &FhirPathValue, b: &FhirPathValue, precision: u32) -> Result<Option<FhirPathValue>> {
    match (as_num(a), as_num(b)) {
        (Some(x), Some(y)) => {
            let widened = widen(x, y);
            match widened {
                Widened::Integer(l, r) => {
                    if r == 0 {
                        return Ok(None);
                    }
                    Ok(Some(FhirPathValue::Integer(l % r)))
                }
                Widened::Long(l, r) => {
                    if r == 0 {
                        return Ok(None);
                    }
                    Ok(Some(FhirPathValue::Long(l % r)))
                }
                Widened::Decimal(l, r) => {
                    if r.is_zero() {
                        return Ok(None);
                    }
                    Ok(Some(FhirPathValue::Decimal(round_significant(l % r, precision))))
                }
            }
        }
        _ => Err(type_error("mod", a, b)),
    }
}

/// `a & b`: string concatenation, coercing either side via its `Display`.
pub fn concatenate(a: &FhirPathValue, b: &FhirPathValue) -> FhirPathValue {
    FhirPathValue::String(format!("{a}{b}"))
}

fn arithmetic_result(
    w: Widened,
    precision: u32,
    int_op: impl Fn(i64, i64) -> i64,
    dec_op: impl Fn(Decimal, Decimal) -> Decimal,
) -> FhirPathValue {
    match w {
        Widened::Integer(l, r) => FhirPathValue::Integer(int_op(l, r)),
        Widened::Long(l, r) => FhirPathValue::Long(int_op(l, r)),
        Widened::Decimal(l, r) => FhirPathValue::Decimal(round_significant(dec_op(l, r), precision)),
    }
}

fn type_error(op: &str, a: &FhirPathValue, b: &FhirPathValue) -> FhirPathError {
    FhirPathError::type_error(format!("operator '{op}' is not defined for {a:?} and {b:?}"))
}

/// Three-valued ordering: `None` signals an indeterminate/incomparable
/// comparison (propagates to empty), never an error.
pub fn compare(a: &FhirPathValue, b: &FhirPathValue) -> Result<Option<Ordering>> {
    use crate::model::PartialOrdering as PO;
    Ok(match (a, b) {
        (FhirPathValue::String(x), FhirPathValue::String(y)) => Some(x.as_str().cmp(y.as_str())),
        (FhirPathValue::Date(x), FhirPathValue::Date(y)) => match x.partial_cmp_precise(y) {
            PO::Ordered(o) => Some(o),
            PO::Indeterminate => None,
        },
        (FhirPathValue::Time(x), FhirPathValue::Time(y)) => match x.partial_cmp_precise(y) {
            PO::Ordered(o) => Some(o),
            PO::Indeterminate => None,
        },
        (FhirPathValue::DateTime(x), FhirPathValue::DateTime(y)) => match x.partial_cmp_precise(y) {
            PO::Ordered(o) => Some(o),
            PO::Indeterminate => None,
        },
        (FhirPathValue::Quantity(x), FhirPathValue::Quantity(y)) => x.partial_cmp(y),
        (FhirPathValue::Boolean(x), FhirPathValue::Boolean(y)) => Some(x.cmp(y)),
        _ => match (as_num(a), as_num(b)) {
            (Some(x), Some(y)) => Some(num_to_decimal(x).cmp(&num_to_decimal(y))),
            _ => return Err(type_error("comparison", a, b)),
        },
    })
}

/// `=` strict equality. `None` is an indeterminate comparison (propagates to
/// empty), distinct from `Some(false)`.
pub fn equal(a: &FhirPathValue, b: &FhirPathValue) -> Option<bool> {
    match (a, b) {
        (FhirPathValue::Date(x), FhirPathValue::Date(y)) => x.strict_eq(y),
        (FhirPathValue::Time(x), FhirPathValue::Time(y)) => x.strict_eq(y),
        (FhirPathValue::DateTime(x), FhirPathValue::DateTime(y)) => x.strict_eq(y),
        (FhirPathValue::Quantity(x), FhirPathValue::Quantity(y)) => x.equals(y),
        (FhirPathValue::String(x), FhirPathValue::String(y)) => Some(x == y),
        _ => match (as_num(a), as_num(b)) {
            (Some(x), Some(y)) => Some(num_to_decimal(x) == num_to_decimal(y)),
            _ => Some(a == b),
        },
    }
}

/// `~` equivalence: whitespace-normalised, case-insensitive string
/// comparison; calendar-duration quantities may map to definite units.
/// Never indeterminate.
pub fn equivalent(a: &FhirPathValue, b: &FhirPathValue) -> bool {
    match (a, b) {
        (FhirPathValue::String(x), FhirPathValue::String(y)) => normalize_for_equivalence(x) == normalize_for_equivalence(y),
        (FhirPathValue::Quantity(x), FhirPathValue::Quantity(y)) => x.equivalent(y),
        (FhirPathValue::Date(x), FhirPathValue::Date(y)) => matches!(x.partial_cmp_precise(y), crate::model::PartialOrdering::Ordered(Ordering::Equal)),
        (FhirPathValue::Time(x), FhirPathValue::Time(y)) => matches!(x.partial_cmp_precise(y), crate::model::PartialOrdering::Ordered(Ordering::Equal)),
        (FhirPathValue::DateTime(x), FhirPathValue::DateTime(y)) => {
            matches!(x.partial_cmp_precise(y), crate::model::PartialOrdering::Ordered(Ordering::Equal))
        }
        _ => match (as_num(a), as_num(b)) {
            (Some(x), Some(y)) => num_to_decimal(x) == num_to_decimal(y),
            _ => a == b,
        },
    }
}

fn normalize_for_equivalence(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Kleene (three-valued) logic: `None` is the "empty"/unknown truth value.
pub mod kleene {
    pub fn and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
        match (a, b) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }
    }

    pub fn or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
        match (a, b) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        }
    }

    pub fn xor(a: Option<bool>, b: Option<bool>) -> Option<bool> {
        match (a, b) {
            (Some(x), Some(y)) => Some(x != y),
            _ => None,
        }
    }

    pub fn implies(a: Option<bool>, b: Option<bool>) -> Option<bool> {
        match (a, b) {
            (Some(false), _) => Some(true),
            (Some(true), Some(b)) => Some(b),
            (_, Some(true)) => Some(true),
            _ => None,
        }
    }

    pub fn not(a: Option<bool>) -> Option<bool> {
        a.map(|b| !b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn integer_plus_long_widens_to_long() {
        let result = add(&FhirPathValue::Integer(2), &FhirPathValue::Long(3), 15).unwrap();
        assert_eq!(result, FhirPathValue::Long(5));
    }

    #[test]
    fn divide_by_zero_is_empty_not_error() {
        assert_eq!(divide(&FhirPathValue::Integer(4), &FhirPathValue::Integer(0), 15).unwrap(), None);
    }

    #[test]
    fn integer_divide_and_modulo_by_zero_are_empty() {
        assert_eq!(integer_divide(&FhirPathValue::Integer(4), &FhirPathValue::Integer(0)).unwrap(), None);
        assert_eq!(modulo(&FhirPathValue::Integer(4), &FhirPathValue::Integer(0), 15).unwrap(), None);
    }

    #[test]
    fn modulo_keeps_sign_of_dividend() {
        let result = modulo(&FhirPathValue::Integer(-7), &FhirPathValue::Integer(3), 15).unwrap().unwrap();
        assert_eq!(result, FhirPathValue::Integer(-1));
    }

    #[test]
    fn concatenate_coerces_non_strings() {
        let result = concatenate(&FhirPathValue::String("n=".to_string()), &FhirPathValue::Integer(5));
        assert_eq!(result, FhirPathValue::String("n=5".to_string()));
    }

    #[test]
    fn kleene_truth_tables() {
        assert_eq!(kleene::and(Some(true), None), None);
        assert_eq!(kleene::and(Some(false), None), Some(false));
        assert_eq!(kleene::or(Some(true), None), Some(true));
        assert_eq!(kleene::or(Some(false), None), None);
        assert_eq!(kleene::not(kleene::not(Some(true))), Some(true));
        assert_eq!(kleene::not(None), None);
    }

    #[test]
    fn string_equivalence_ignores_case_and_collapses_whitespace() {
        assert!(equivalent(
            &FhirPathValue::String("Hello   World".to_string()),
            &FhirPathValue::String("hello world".to_string())
        ));
    }

    #[test]
    fn decimal_rounds_to_significant_digits() {
        let result = divide(
            &FhirPathValue::Decimal(Decimal::from_str("10").unwrap()),
            &FhirPathValue::Decimal(Decimal::from_str("3").unwrap()),
            5,
        )
        .unwrap()
        .unwrap();
        match result {
            FhirPathValue::Decimal(d) => assert_eq!(d, Decimal::from_str("3.3333").unwrap()),
            _ => panic!("expected decimal"),
        }
    }
}
