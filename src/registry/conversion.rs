//! Conversion functions: `toInteger`, `toDecimal`, `toString`, `toDate`,
//! `toDateTime`, `toTime`, `toQuantity`, `toBoolean`, and their
//! `convertsTo…` partners.
//!
//! Each `tryXxx` below converts a single value or returns `None` (not
//! convertible) — `toXxx` propagates empty-input-is-empty and maps
//! inconvertible to empty; `convertsToXxx` maps the same attempt to a
//! Boolean instead.

use crate::error::Result;
use crate::model::{Collection, FhirPathValue, PartialDate, PartialDateTime, PartialTime, Quantity, TimePrecision};
use crate::evaluator::singleton_operand;
use rust_decimal::Decimal;
use std::str::FromStr;

fn try_to_integer(v: &FhirPathValue) -> Option<FhirPathValue> {
    match v {
        FhirPathValue::Integer(i) => Some(FhirPathValue::Integer(*i)),
        FhirPathValue::Long(i) => i64::try_from(*i).ok().map(FhirPathValue::Integer),
        FhirPathValue::Boolean(b) => Some(FhirPathValue::Integer(if *b { 1 } else { 0 })),
        FhirPathValue::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok().map(FhirPathValue::Integer),
        FhirPathValue::String(s) => s.trim().parse::<i64>().ok().map(FhirPathValue::Integer),
        _ => None,
    }
}

fn try_to_decimal(v: &FhirPathValue) -> Option<FhirPathValue> {
    match v {
        FhirPathValue::Decimal(d) => Some(FhirPathValue::Decimal(*d)),
        FhirPathValue::Integer(i) => Some(FhirPathValue::Decimal(Decimal::from(*i))),
        FhirPathValue::Long(i) => Some(FhirPathValue::Decimal(Decimal::from(*i))),
        FhirPathValue::Boolean(b) => Some(FhirPathValue::Decimal(if *b { Decimal::ONE } else { Decimal::ZERO })),
        FhirPathValue::String(s) => Decimal::from_str(s.trim()).ok().map(FhirPathValue::Decimal),
        _ => None,
    }
}

fn try_to_string(v: &FhirPathValue) -> Option<FhirPathValue> {
    match v {
        FhirPathValue::Element(_) => None,
        other => Some(FhirPathValue::String(other.to_string())),
    }
}

fn try_to_boolean(v: &FhirPathValue) -> Option<FhirPathValue> {
    match v {
        FhirPathValue::Boolean(b) => Some(FhirPathValue::Boolean(*b)),
        FhirPathValue::Integer(1) | FhirPathValue::Long(1) => Some(FhirPathValue::Boolean(true)),
        FhirPathValue::Integer(0) | FhirPathValue::Long(0) => Some(FhirPathValue::Boolean(false)),
        FhirPathValue::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(FhirPathValue::Boolean(true)),
            "false" | "f" | "no" | "n" | "0" | "0.0" => Some(FhirPathValue::Boolean(false)),
            _ => None,
        },
        _ => None,
    }
}

fn try_to_date(v: &FhirPathValue) -> Option<FhirPathValue> {
    match v {
        FhirPathValue::Date(d) => Some(FhirPathValue::Date(*d)),
        FhirPathValue::DateTime(dt) => Some(FhirPathValue::Date(PartialDate {
            date: dt.date,
            precision: dt.date_precision,
        })),
        FhirPathValue::String(s) => PartialDate::parse(s).ok().map(FhirPathValue::Date),
        _ => None,
    }
}

fn try_to_date_time(v: &FhirPathValue) -> Option<FhirPathValue> {
    match v {
        FhirPathValue::DateTime(dt) => Some(FhirPathValue::DateTime(*dt)),
        FhirPathValue::Date(d) => Some(FhirPathValue::DateTime(PartialDateTime {
            date: d.date,
            time: None,
            offset: None,
            date_precision: d.precision,
            time_precision: TimePrecision::Hour,
        })),
        FhirPathValue::String(s) => PartialDateTime::parse(s).ok().map(FhirPathValue::DateTime),
        _ => None,
    }
}

fn try_to_time(v: &FhirPathValue) -> Option<FhirPathValue> {
    match v {
        FhirPathValue::Time(t) => Some(FhirPathValue::Time(t.clone())),
        FhirPathValue::String(s) => PartialTime::parse(s).ok().map(FhirPathValue::Time),
        _ => None,
    }
}

fn try_to_quantity(v: &FhirPathValue) -> Option<FhirPathValue> {
    match v {
        FhirPathValue::Quantity(q) => Some(FhirPathValue::Quantity(q.clone())),
        FhirPathValue::Integer(i) => Some(FhirPathValue::Quantity(Quantity::unitless(Decimal::from(*i)))),
        FhirPathValue::Long(i) => Some(FhirPathValue::Quantity(Quantity::unitless(Decimal::from(*i)))),
        FhirPathValue::Decimal(d) => Some(FhirPathValue::Quantity(Quantity::unitless(*d))),
        FhirPathValue::String(s) => parse_quantity_literal(s),
        _ => None,
    }
}

/// Parse the naive `"value 'unit'"` / `"value unit"` textual form `toQuantity()`
/// accepts on a String input.
fn parse_quantity_literal(s: &str) -> Option<FhirPathValue> {
    let s = s.trim();
    let split_at = s.find(|c: char| c.is_whitespace())?;
    let (value_text, unit_text) = s.split_at(split_at);
    let value = Decimal::from_str(value_text.trim()).ok()?;
    let unit = unit_text.trim().trim_matches('\'').to_string();
    let unit = if unit.is_empty() { None } else { Some(unit) };
    Some(FhirPathValue::Quantity(Quantity::new(value, unit)))
}

macro_rules! to_fn {
    ($name:ident, $try_fn:expr) => {
        pub(crate) fn $name(invocant: &Collection) -> Result<Collection> {
            match singleton_operand(invocant, stringify!($name))? {
                None => Ok(Collection::empty()),
                Some(v) => Ok($try_fn(v).map(Collection::singleton).unwrap_or_else(Collection::empty)),
            }
        }
    };
}

macro_rules! converts_to_fn {
    ($name:ident, $try_fn:expr) => {
        pub(crate) fn $name(invocant: &Collection) -> Result<Collection> {
            match singleton_operand(invocant, stringify!($name))? {
                None => Ok(Collection::empty()),
                Some(v) => Ok(Collection::singleton(FhirPathValue::Boolean($try_fn(v).is_some()))),
            }
        }
    };
}

to_fn!(to_integer, try_to_integer);
to_fn!(to_decimal, try_to_decimal);
to_fn!(to_string_fn, try_to_string);
to_fn!(to_boolean, try_to_boolean);
to_fn!(to_date, try_to_date);
to_fn!(to_date_time, try_to_date_time);
to_fn!(to_time, try_to_time);
to_fn!(to_quantity, try_to_quantity);

converts_to_fn!(converts_to_integer, try_to_integer);
converts_to_fn!(converts_to_decimal, try_to_decimal);
converts_to_fn!(converts_to_string, try_to_string);
converts_to_fn!(converts_to_boolean, try_to_boolean);
converts_to_fn!(converts_to_date, try_to_date);
converts_to_fn!(converts_to_date_time, try_to_date_time);
converts_to_fn!(converts_to_time, try_to_time);
converts_to_fn!(converts_to_quantity, try_to_quantity);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_integer_parses_valid_text() {
        let c = Collection::singleton(FhirPathValue::String("42".to_string()));
        assert_eq!(to_integer(&c).unwrap().as_singleton(), Some(&FhirPathValue::Integer(42)));
    }

    #[test]
    fn non_numeric_string_to_integer_is_empty() {
        let c = Collection::singleton(FhirPathValue::String("abc".to_string()));
        assert!(to_integer(&c).unwrap().is_empty());
    }

    #[test]
    fn converts_to_integer_reports_false_without_erroring() {
        let c = Collection::singleton(FhirPathValue::String("abc".to_string()));
        assert_eq!(converts_to_integer(&c).unwrap().as_singleton(), Some(&FhirPathValue::Boolean(false)));
    }

    #[test]
    fn quantity_literal_string_parses() {
        let c = Collection::singleton(FhirPathValue::String("4 'mg'".to_string()));
        match to_quantity(&c).unwrap().as_singleton() {
            Some(FhirPathValue::Quantity(q)) => assert_eq!(q.unit.as_deref(), Some("mg")),
            other => panic!("expected a quantity, got {other:?}"),
        }
    }
}
