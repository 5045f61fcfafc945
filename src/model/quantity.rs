//! Quantity values: a decimal magnitude paired with a UCUM or calendar unit
//! a decimal magnitude paired with a UCUM or calendar unit.

use super::ucum::{self, UnitMap};
use rust_decimal::Decimal;
use std::fmt;

/// A FHIRPath `Quantity`: `value 'unit'` or `value calendarUnit`.
///
/// The unit is stored verbatim as written (a UCUM string or a calendar
/// duration keyword like `year`); canonicalisation for comparison/arithmetic
/// happens on demand via [`Quantity::canonical_form`], never at construction,
/// so the original unit text survives round-tripping through `toString()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    /// The numeric magnitude.
    pub value: Decimal,
    /// The unit exactly as written: a UCUM string (already unquoted) or a
    /// bare calendar duration keyword. `None` means dimensionless.
    pub unit: Option<String>,
}

/// Canonicalised form of a quantity, suitable for comparison across units.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalQuantity {
    /// Canonical numeric value.
    pub value: Decimal,
    /// Canonical unit map.
    pub unit: UnitMap,
}

impl Quantity {
    /// Construct a quantity.
    pub fn new(value: Decimal, unit: Option<String>) -> Self {
        Self { value, unit }
    }

    /// Construct a dimensionless quantity.
    pub fn unitless(value: Decimal) -> Self {
        Self { value, unit: None }
    }

    fn is_calendar_keyword(&self) -> bool {
        matches!(
            self.unit.as_deref(),
            Some(
                "year" | "years" | "month" | "months" | "week" | "weeks" | "day" | "days"
                    | "hour" | "hours" | "minute" | "minutes" | "second" | "seconds"
                    | "millisecond" | "milliseconds"
            )
        )
    }

    /// Canonicalise to a comparable normal form.
    ///
    /// `for_equivalence` selects whether calendar year/month map to their
    /// definite-UCUM equivalents (only valid under `~`, never under `=`).
    /// Returns `None` if the unit text doesn't parse as UCUM and isn't a
    /// recognised calendar keyword.
    pub fn canonical_form(&self, for_equivalence: bool) -> Option<CanonicalQuantity> {
        let Some(unit_text) = &self.unit else {
            return Some(CanonicalQuantity {
                value: self.value,
                unit: UnitMap::dimensionless(),
            });
        };

        let resolved_unit: String = if self.is_calendar_keyword() {
            match ucum::calendar_to_definite(unit_text, for_equivalence) {
                Some(code) => code.to_string(),
                None => return None,
            }
        } else {
            unit_text.clone()
        };

        let parsed = UnitMap::parse(&resolved_unit).ok()?;
        let canonical = ucum::canonicalize(&parsed);
        let scale = ucum::scale_to_decimal(canonical.scale);
        Some(CanonicalQuantity {
            value: self.value * scale,
            unit: canonical.unit,
        })
    }

    /// Whether `self` and `other` can be compared/combined at all — both
    /// canonicalise (under the given equality mode) to the same unit map.
    pub fn is_comparable_to(&self, other: &Quantity, for_equivalence: bool) -> bool {
        match (
            self.canonical_form(for_equivalence),
            other.canonical_form(for_equivalence),
        ) {
            (Some(a), Some(b)) => a.unit == b.unit,
            _ => false,
        }
    }

    /// Strict equality (`=`): canonicalised unit and value must match, with
    /// no calendar year/month mapping.
    pub fn equals(&self, other: &Quantity) -> Option<bool> {
        let a = self.canonical_form(false)?;
        let b = other.canonical_form(false)?;
        if a.unit != b.unit {
            return Some(false);
        }
        Some(a.value == b.value)
    }

    /// Equivalence (`~`): canonicalised unit and value must match, with
    /// calendar year/month mapping permitted.
    pub fn equivalent(&self, other: &Quantity) -> bool {
        match (self.canonical_form(true), other.canonical_form(true)) {
            (Some(a), Some(b)) => a.unit == b.unit && a.value == b.value,
            _ => false,
        }
    }

    /// Three-valued ordering: `None` when units are incomparable.
    pub fn partial_cmp(&self, other: &Quantity) -> Option<std::cmp::Ordering> {
        let a = self.canonical_form(false)?;
        let b = other.canonical_form(false)?;
        if a.unit != b.unit {
            return None;
        }
        Some(a.value.cmp(&b.value))
    }

    /// Multiply two quantities: both sides canonicalise (SI prefix
    /// stripped, known derived units expanded) before their unit maps
    /// multiply and their values combine — `1 'kg' * 2 'm'` yields
    /// `2000 'g.m'`, not `2 'kg.m'`. Falls back to raw (unscaled) unit-map
    /// combination when a side's unit text isn't UCUM-parseable.
    pub fn multiply(&self, other: &Quantity) -> Quantity {
        match (self.canonical_form(false), other.canonical_form(false)) {
            (Some(a), Some(b)) => Quantity::new(a.value * b.value, Some(a.unit.multiply(&b.unit).format())),
            _ => {
                let map_a = self.raw_unit_map();
                let map_b = other.raw_unit_map();
                Quantity::new(self.value * other.value, Some(map_a.multiply(&map_b).format()))
            }
        }
    }

    /// Divide two quantities: canonicalised the same way as [`Quantity::multiply`].
    /// Returns `None` on division by zero (caller maps that to empty).
    pub fn divide(&self, other: &Quantity) -> Option<Quantity> {
        if other.value.is_zero() {
            return None;
        }
        match (self.canonical_form(false), other.canonical_form(false)) {
            (Some(a), Some(b)) => Some(Quantity::new(a.value / b.value, Some(a.unit.divide(&b.unit).format()))),
            _ => {
                let map_a = self.raw_unit_map();
                let map_b = other.raw_unit_map();
                Some(Quantity::new(self.value / other.value, Some(map_a.divide(&map_b).format())))
            }
        }
    }

    fn raw_unit_map(&self) -> UnitMap {
        let text = self.unit.clone().unwrap_or_else(|| "1".to_string());
        UnitMap::parse(&text).unwrap_or_default()
    }

    /// Add two quantities after canonicalising both to the same unit.
    /// `None` if the units are incompatible.
    pub fn add(&self, other: &Quantity) -> Option<Quantity> {
        let a = self.canonical_form(false)?;
        let b = other.canonical_form(false)?;
        if a.unit != b.unit {
            return None;
        }
        Some(Quantity::new(a.value + b.value, Some(a.unit.format())))
    }

    /// Subtract two quantities after canonicalising both to the same unit.
    pub fn subtract(&self, other: &Quantity) -> Option<Quantity> {
        let a = self.canonical_form(false)?;
        let b = other.canonical_form(false)?;
        if a.unit != b.unit {
            return None;
        }
        Some(Quantity::new(a.value - b.value, Some(a.unit.format())))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} '{}'", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn q(value: &str, unit: &str) -> Quantity {
        Quantity::new(Decimal::from_str(value).unwrap(), Some(unit.to_string()))
    }

    #[test]
    fn one_hour_equals_3600_seconds() {
        let a = q("1", "h");
        let b = q("3600", "s");
        assert_eq!(a.equals(&b), Some(true));
    }

    #[test]
    fn multiply_canonicalises_before_combining_units() {
        let a = q("1", "kg");
        let b = q("2", "m");
        let product = a.multiply(&b);
        assert_eq!(product.value, Decimal::from(2000));
        assert_eq!(product.unit.as_deref(), Some("g.m"));
    }

    #[test]
    fn year_does_not_equal_365_days_under_equality_but_does_under_equivalence() {
        let a = Quantity::new(Decimal::from(1), Some("year".to_string()));
        let b = Quantity::new(Decimal::from(31_557_600), Some("s".to_string()));
        assert_eq!(a.equals(&b), None);
        assert!(a.equivalent(&b));
    }

    #[test]
    fn week_maps_under_equality_and_equivalence() {
        let seven_days = q("7", "day");
        let one_week = Quantity::new(Decimal::from(1), Some("week".to_string()));
        assert_eq!(seven_days.equals(&one_week), Some(true));
        assert!(seven_days.equivalent(&one_week));
    }

    #[test]
    fn incompatible_units_are_not_comparable() {
        let a = q("1", "kg");
        let b = q("1", "m");
        assert_eq!(a.partial_cmp(&b), None);
        assert_eq!(a.equals(&b), Some(false));
    }
}
