//! UCUM unit algebra.
//!
//! This is a from-scratch implementation of the slice of UCUM grammar and
//! tables FHIRPath quantity arithmetic needs: parsing a unit string into an
//! exponent map, combining exponent maps under multiplication/division, and
//! canonicalising a `(value, unit)` pair to a comparable normal form (SI
//! prefix stripped, derived unit expanded to base units).
//!
//! The grammar and unit tables are implemented directly as compile-time
//! constants rather than delegated to an external UCUM crate; see
//! DESIGN.md for the rationale.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

/// A parsed UCUM unit expression: base-unit name -> integer exponent.
///
/// Entries with exponent zero are never stored; an empty map is the
/// dimensionless unit `1`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct UnitMap(BTreeMap<String, i32>);

/// Errors parsing a UCUM unit string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UcumError {
    /// A component didn't match `([A-Za-z]+)(-?\d*)`.
    #[error("invalid unit component '{0}'")]
    InvalidComponent(String),
    /// The same base unit name appeared twice in one unit string.
    #[error("duplicate unit '{0}' in unit expression")]
    DuplicateUnit(String),
}

impl UnitMap {
    /// The empty (dimensionless) map.
    pub fn dimensionless() -> Self {
        UnitMap::default()
    }

    /// True if this is the dimensionless map.
    pub fn is_dimensionless(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a map from exponent entries, silently dropping zero exponents.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, i32)>) -> Self {
        let mut map = BTreeMap::new();
        for (k, v) in entries {
            if v != 0 {
                map.insert(k, v);
            }
        }
        UnitMap(map)
    }

    /// Exponent for a given base unit, or 0 if absent.
    pub fn exponent(&self, unit: &str) -> i32 {
        self.0.get(unit).copied().unwrap_or(0)
    }

    /// Iterate `(unit, exponent)` pairs in ascending lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Multiply two unit maps: exponents add, zero results drop.
    pub fn multiply(&self, other: &UnitMap) -> UnitMap {
        let mut map = self.0.clone();
        for (unit, exp) in &other.0 {
            let entry = map.entry(unit.clone()).or_insert(0);
            *entry += exp;
            if *entry == 0 {
                map.remove(unit);
            }
        }
        UnitMap(map)
    }

    /// Divide this unit map by another: exponents subtract.
    pub fn divide(&self, other: &UnitMap) -> UnitMap {
        let negated = UnitMap::from_entries(other.0.iter().map(|(k, v)| (k.clone(), -v)));
        self.multiply(&negated)
    }

    /// Raise every exponent by an integer power.
    pub fn pow(&self, power: i32) -> UnitMap {
        if power == 0 {
            return UnitMap::dimensionless();
        }
        UnitMap::from_entries(self.0.iter().map(|(k, v)| (k.clone(), v * power)))
    }

    /// Parse a (possibly single-quoted) UCUM unit string into an exponent map.
    ///
    /// Grammar:
    /// - strip surrounding quotes; empty or `"1"` is dimensionless;
    /// - split on lookahead at `.`/`/`, components retaining their separator;
    /// - a component matches `([A-Za-z]+)(-?\d*)`: name + optional signed exponent (default 1);
    /// - once a `/` is seen, every subsequent component (even `.`-joined ones) is negated;
    /// - a duplicate unit name within one string is a parse error.
    pub fn parse(input: &str) -> Result<UnitMap, UcumError> {
        let stripped = input.trim();
        let stripped = stripped
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .unwrap_or(stripped);
        if stripped.is_empty() || stripped == "1" {
            return Ok(UnitMap::dimensionless());
        }

        let mut map: BTreeMap<String, i32> = BTreeMap::new();
        let mut negate = false;
        let mut chars = stripped.char_indices().peekable();
        let mut component_start = 0usize;

        let mut push_component = |text: &str, negate: bool, map: &mut BTreeMap<String, i32>| -> Result<(), UcumError> {
            if text.is_empty() {
                return Ok(());
            }
            let split_at = text
                .find(|c: char| c.is_ascii_digit() || c == '-')
                .unwrap_or(text.len());
            let (name, exp_text) = text.split_at(split_at);
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(UcumError::InvalidComponent(text.to_string()));
            }
            let exponent: i32 = if exp_text.is_empty() {
                1
            } else {
                exp_text
                    .parse()
                    .map_err(|_| UcumError::InvalidComponent(text.to_string()))?
            };
            let signed = if negate { -exponent } else { exponent };
            if map.contains_key(name) {
                return Err(UcumError::DuplicateUnit(name.to_string()));
            }
            if signed != 0 {
                map.insert(name.to_string(), signed);
            }
            Ok(())
        };

        while let Some((idx, ch)) = chars.next() {
            if ch == '.' || ch == '/' {
                let text = &stripped[component_start..idx];
                push_component(text, negate, &mut map)?;
                if ch == '/' {
                    negate = true;
                }
                component_start = idx + ch.len_utf8();
            }
        }
        let tail = &stripped[component_start..];
        push_component(tail, negate, &mut map)?;

        Ok(UnitMap(map))
    }

    /// Format back to UCUM text: keys in ascending lexicographic order joined
    /// by `.`, exponent 1 elided, dimensionless as `1`.
    pub fn format(&self) -> String {
        if self.0.is_empty() {
            return "1".to_string();
        }
        self.0
            .iter()
            .map(|(name, exp)| {
                if *exp == 1 {
                    name.clone()
                } else {
                    format!("{name}{exp}")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quoted form, as used in FHIRPath unit literals.
    pub fn format_quoted(&self) -> String {
        format!("'{}'", self.format())
    }
}

impl fmt::Display for UnitMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// One SI prefix: code, scale factor as a power of ten.
struct Prefix {
    code: &'static str,
    power_of_ten: i32,
}

const PREFIXES: &[Prefix] = &[
    Prefix { code: "Y", power_of_ten: 24 },
    Prefix { code: "Z", power_of_ten: 21 },
    Prefix { code: "E", power_of_ten: 18 },
    Prefix { code: "P", power_of_ten: 15 },
    Prefix { code: "T", power_of_ten: 12 },
    Prefix { code: "G", power_of_ten: 9 },
    Prefix { code: "M", power_of_ten: 6 },
    Prefix { code: "k", power_of_ten: 3 },
    Prefix { code: "h", power_of_ten: 2 },
    Prefix { code: "da", power_of_ten: 1 },
    Prefix { code: "d", power_of_ten: -1 },
    Prefix { code: "c", power_of_ten: -2 },
    Prefix { code: "m", power_of_ten: -3 },
    Prefix { code: "u", power_of_ten: -6 },
    Prefix { code: "n", power_of_ten: -9 },
    Prefix { code: "p", power_of_ten: -12 },
    Prefix { code: "f", power_of_ten: -15 },
    Prefix { code: "a", power_of_ten: -18 },
    Prefix { code: "z", power_of_ten: -21 },
    Prefix { code: "y", power_of_ten: -24 },
];

/// A base or derived unit: its canonical base-unit name, scale relative to
/// that base unit, and whether prefixes are permitted on it (UCUM forbids
/// prefixing some units, e.g. `min`, but this subset permits prefixes on
/// everything for simplicity — see DESIGN.md open questions).
#[derive(Clone, Copy)]
struct UnitDef {
    /// Canonical (already-base) unit name this unit expands to.
    base: &'static str,
    /// Multiply a value in this unit by `scale` to get a value in `base`.
    scale: f64,
}

fn unit_table() -> &'static std::collections::HashMap<&'static str, UnitDef> {
    static TABLE: Lazy<std::collections::HashMap<&'static str, UnitDef>> = Lazy::new(|| {
        let mut m = std::collections::HashMap::new();
        // Base units map to themselves.
        for base in ["g", "m", "s", "rad", "K", "C", "cd"] {
            m.insert(base, UnitDef { base, scale: 1.0 });
        }
        // Derived units expand to a base unit with a scale factor.
        // Design note: composite derived units (e.g. W)
        // are deliberately NOT expanded to J/s — only the units this table
        // lists are rewritten.
        m.insert("min", UnitDef { base: "s", scale: 60.0 });
        m.insert("h", UnitDef { base: "s", scale: 3600.0 });
        m.insert("d", UnitDef { base: "s", scale: 86400.0 });
        m.insert("wk", UnitDef { base: "s", scale: 604_800.0 });
        m.insert("a", UnitDef { base: "s", scale: 31_557_600.0 });
        m.insert("mo", UnitDef { base: "s", scale: 2_629_800.0 });
        m.insert("L", UnitDef { base: "m3", scale: 0.001 });
        m.insert("l", UnitDef { base: "m3", scale: 0.001 });
        m
    });
    &TABLE
}

/// Map a calendar-duration keyword (`year`, `years`, `wk`, ...) to its UCUM
/// definite-duration code, for the subset that ever needs it.
fn calendar_duration_to_ucum(name: &str) -> Option<&'static str> {
    Some(match name {
        "year" | "years" => "a",
        "month" | "months" => "mo",
        "week" | "weeks" => "wk",
        "day" | "days" => "d",
        "hour" | "hours" => "h",
        "minute" | "minutes" => "min",
        "second" | "seconds" => "s",
        "millisecond" | "milliseconds" => "ms",
        _ => return None,
    })
}

/// True for the calendar units whose definite-UCUM mapping only applies
/// under equivalence (`~`), never under equality (`=`). Year and month never
/// map under equality but do under equivalence; weeks map under both.
pub fn is_calendar_only_under_equality(name: &str) -> bool {
    matches!(name, "year" | "years" | "month" | "months")
}

/// Strip a recognised SI prefix from `code`, returning `(prefix_scale, rest)`.
fn strip_prefix(code: &str) -> (f64, &str) {
    for prefix in PREFIXES {
        if let Some(rest) = code.strip_prefix(prefix.code) {
            if !rest.is_empty() && unit_table().contains_key(rest) {
                return (10f64.powi(prefix.power_of_ten), rest);
            }
        }
    }
    (1.0, code)
}

/// Canonicalised form of a single unit component: base unit name tagged with
/// exponent 1, and the scale factor to multiply the
/// original value by to express it in that base unit.
pub struct Canonical {
    /// Canonical exponent map, e.g. `{g: 1, m: 1}`.
    pub unit: UnitMap,
    /// Multiply the original numeric value by this to get the canonical value.
    pub scale: f64,
}

/// Canonicalise a parsed unit map: strip prefixes, expand known derived
/// units, scale-adjust. `for_equivalence` additionally maps `year`/`month`
/// calendar keywords (only meaningful when the caller parsed a calendar
/// keyword rather than a UCUM string — see [`Quantity::canonicalize`]).
pub fn canonicalize(map: &UnitMap) -> Canonical {
    let mut scale = 1.0;
    let mut out = UnitMap::dimensionless();
    for (name, exp) in map.iter() {
        let (prefix_scale, base_code) = strip_prefix(name);
        let def = unit_table().get(base_code).copied();
        let (base_name, unit_scale) = match def {
            Some(def) => (def.base, def.scale),
            None => (name, 1.0),
        };
        let combined_scale = prefix_scale * unit_scale;
        scale *= combined_scale.powi(exp);
        out = out.multiply(&UnitMap::from_entries([(base_name.to_string(), exp)]));
    }
    Canonical { unit: out, scale }
}

/// Resolve a bare calendar-duration keyword (as stored verbatim on a
/// `Quantity`) to its UCUM unit string, honouring the
/// equality/equivalence distinction.
pub fn calendar_to_definite(name: &str, for_equivalence: bool) -> Option<&'static str> {
    if !for_equivalence && is_calendar_only_under_equality(name) {
        return None;
    }
    calendar_duration_to_ucum(name)
}

/// Convert an `f64` scale factor to a `Decimal`, saturating rather than
/// panicking on values outside `Decimal`'s range (UCUM scale factors here are
/// all small).
pub fn scale_to_decimal(scale: f64) -> Decimal {
    Decimal::from_f64_retain(scale).unwrap_or(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_unit() {
        let m = UnitMap::parse("'kg'").unwrap();
        assert_eq!(m.exponent("kg"), 1);
    }

    #[test]
    fn parses_division_negates_trailing_components() {
        let m = UnitMap::parse("'kg.m/s2'").unwrap();
        assert_eq!(m.exponent("kg"), 1);
        assert_eq!(m.exponent("m"), 1);
        assert_eq!(m.exponent("s"), -2);
    }

    #[test]
    fn division_negates_dot_joined_components_too() {
        // rule: components joined by '.' after a '/' still get negated
        let m = UnitMap::parse("'m/s.kg'").unwrap();
        assert_eq!(m.exponent("m"), 1);
        assert_eq!(m.exponent("s"), -1);
        assert_eq!(m.exponent("kg"), -1);
    }

    #[test]
    fn duplicate_unit_is_parse_error() {
        assert!(UnitMap::parse("'m.m'").is_err());
    }

    #[test]
    fn empty_and_one_are_dimensionless() {
        assert!(UnitMap::parse("'1'").unwrap().is_dimensionless());
        assert!(UnitMap::parse("''").unwrap().is_dimensionless());
    }

    #[test]
    fn format_round_trips_through_parse() {
        let m = UnitMap::from_entries([("m".to_string(), 1), ("s".to_string(), -2)]);
        assert_eq!(m.format(), "m.s-2");
        let reparsed = UnitMap::parse(&m.format()).unwrap();
        assert_eq!(reparsed, m);
    }

    #[test]
    fn format_orders_components_and_elides_exponent_one() {
        let m = UnitMap::from_entries([
            ("kg".to_string(), -1),
            ("m".to_string(), 1),
            ("s".to_string(), -1),
        ]);
        assert_eq!(m.format(), "kg-1.m.s-1");
    }

    #[test]
    fn multiplication_is_commutative_and_inverse_cancels() {
        let a = UnitMap::parse("'kg'").unwrap();
        let b = UnitMap::parse("'m'").unwrap();
        assert_eq!(a.multiply(&b), b.multiply(&a));
        let inv = a.pow(-1);
        assert!(a.multiply(&inv).is_dimensionless());
        assert!(a.divide(&a).is_dimensionless());
    }

    #[test]
    fn canonicalizes_kg_to_g_with_scale() {
        let m = UnitMap::parse("'kg'").unwrap();
        let c = canonicalize(&m);
        assert_eq!(c.unit.exponent("g"), 1);
        assert!((c.scale - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn canonicalizes_hour_to_second() {
        let m = UnitMap::parse("'h'").unwrap();
        let c = canonicalize(&m);
        assert_eq!(c.unit.exponent("s"), 1);
        assert!((c.scale - 3600.0).abs() < 1e-6);
    }

    #[test]
    fn watt_is_not_expanded_to_joule_per_second() {
        // Naive behaviour preserved on purpose.
        let m = UnitMap::parse("'W'").unwrap();
        let c = canonicalize(&m);
        assert_eq!(c.unit.exponent("W"), 1);
    }
}
