//! Partial-precision date, datetime and time values.
//!
//! FHIRPath dates/times may be written with less than full precision
//! (`@2020`, `@2020-03`, `@2020-03-15T10:30`). Comparisons between values of
//! differing precision are only decidable down to the coarser of the two
//! precisions; beyond that the comparison is indeterminate and the whole
//! expression must propagate empty rather than guess.

use crate::error::{FhirPathError, Result};
use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike};
use std::cmp::Ordering;
use std::fmt;

/// Precision carried by a [`PartialDate`] or the date portion of a [`PartialDateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatePrecision {
    /// `@2020`
    Year,
    /// `@2020-03`
    Month,
    /// `@2020-03-15`
    Day,
}

/// Precision carried by a [`PartialTime`] or the time portion of a [`PartialDateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimePrecision {
    /// `T10`
    Hour,
    /// `T10:30`
    Minute,
    /// `T10:30:15`
    Second,
    /// `T10:30:15.123`
    Millisecond,
}

/// A FHIRPath `Date` value: a calendar date known only to some precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialDate {
    /// The underlying date. Components beyond `precision` are zero-filled
    /// (e.g. a year-only date stores January 1st) and must not be read.
    pub date: NaiveDate,
    /// How much of `date` was actually specified in the source literal.
    pub precision: DatePrecision,
}

/// A FHIRPath `DateTime` value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialDateTime {
    /// Calendar date component.
    pub date: NaiveDate,
    /// Time-of-day component; `None` when precision is date-only.
    pub time: Option<NaiveTime>,
    /// Timezone offset, if the literal specified one.
    pub offset: Option<FixedOffset>,
    /// Precision of the date portion.
    pub date_precision: DatePrecision,
    /// Precision of the time portion, meaningless if `time` is `None`.
    pub time_precision: TimePrecision,
}

/// A FHIRPath `Time` value (no date component).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialTime {
    /// The underlying time of day.
    pub time: NaiveTime,
    /// How much of `time` was actually specified.
    pub precision: TimePrecision,
}

/// Outcome of comparing two partial-precision temporal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialOrdering {
    /// A definite ordering, decidable from the shared precision.
    Ordered(Ordering),
    /// Differing precision makes the comparison indeterminate; propagate empty.
    Indeterminate,
}

impl DatePrecision {
    fn rank(self) -> u8 {
        match self {
            DatePrecision::Year => 0,
            DatePrecision::Month => 1,
            DatePrecision::Day => 2,
        }
    }
}

impl TimePrecision {
    fn rank(self) -> u8 {
        match self {
            TimePrecision::Hour => 0,
            TimePrecision::Minute => 1,
            TimePrecision::Second => 2,
            TimePrecision::Millisecond => 3,
        }
    }
}

impl PartialDate {
    /// Compare two dates down to the coarser of their two precisions.
    pub fn partial_cmp_precise(&self, other: &PartialDate) -> PartialOrdering {
        let shared = self.precision.min(other.precision);
        let a = (self.date.year(), self.date.month(), self.date.day());
        let b = (other.date.year(), other.date.month(), other.date.day());
        if a.0 != b.0 {
            return PartialOrdering::Ordered(a.0.cmp(&b.0));
        }
        if shared == DatePrecision::Year {
            return if self.precision == other.precision {
                PartialOrdering::Ordered(Ordering::Equal)
            } else {
                PartialOrdering::Indeterminate
            };
        }
        if a.1 != b.1 {
            return PartialOrdering::Ordered(a.1.cmp(&b.1));
        }
        if shared == DatePrecision::Month {
            return if self.precision == other.precision {
                PartialOrdering::Ordered(Ordering::Equal)
            } else {
                PartialOrdering::Indeterminate
            };
        }
        PartialOrdering::Ordered(a.2.cmp(&b.2))
    }

    /// Equality for `=`: same precision required, all shared fields equal.
    pub fn strict_eq(&self, other: &PartialDate) -> Option<bool> {
        if self.precision != other.precision {
            return None;
        }
        Some(self.date == other.date)
    }
}

impl PartialTime {
    /// Compare two times down to the coarser of their two precisions.
    pub fn partial_cmp_precise(&self, other: &PartialTime) -> PartialOrdering {
        let shared = self.precision.min(other.precision);
        let a = (
            self.time.hour(),
            self.time.minute(),
            self.time.second(),
            self.time.nanosecond() / 1_000_000,
        );
        let b = (
            other.time.hour(),
            other.time.minute(),
            other.time.second(),
            other.time.nanosecond() / 1_000_000,
        );
        macro_rules! step {
            ($field:tt, $prec:expr) => {
                if a.$field != b.$field {
                    return PartialOrdering::Ordered(a.$field.cmp(&b.$field));
                }
                if shared == $prec {
                    return if self.precision == other.precision {
                        PartialOrdering::Ordered(Ordering::Equal)
                    } else {
                        PartialOrdering::Indeterminate
                    };
                }
            };
        }
        step!(0, TimePrecision::Hour);
        step!(1, TimePrecision::Minute);
        step!(2, TimePrecision::Second);
        PartialOrdering::Ordered(a.3.cmp(&b.3))
    }

    /// Equality for `=`.
    pub fn strict_eq(&self, other: &PartialTime) -> Option<bool> {
        if self.precision != other.precision {
            return None;
        }
        Some(self.time == other.time)
    }
}

impl PartialDateTime {
    /// Normalise to UTC nanoseconds-since-epoch for comparison when both
    /// sides carry a timezone offset; otherwise compares component-wise.
    pub fn partial_cmp_precise(&self, other: &PartialDateTime) -> PartialOrdering {
        match (self.offset, other.offset) {
            (Some(a_off), Some(b_off)) => {
                let shared_time_precision = self.time_precision.min(other.time_precision);
                let shared_date_precision = self.date_precision.min(other.date_precision);
                let a_time = self.time.unwrap_or_default();
                let b_time = other.time.unwrap_or_default();
                let a_utc = a_off.from_local_datetime(&self.date.and_time(a_time)).unwrap();
                let b_utc = b_off.from_local_datetime(&other.date.and_time(b_time)).unwrap();
                if self.date_precision == other.date_precision
                    && self.time_precision == other.time_precision
                    && self.time.is_some() == other.time.is_some()
                {
                    return PartialOrdering::Ordered(a_utc.cmp(&b_utc));
                }
                // Differing precision: still decidable if the coarser
                // boundary already separates the instants.
                let _ = (shared_date_precision, shared_time_precision);
                match a_utc.cmp(&b_utc) {
                    Ordering::Equal => PartialOrdering::Indeterminate,
                    ord => PartialOrdering::Ordered(ord),
                }
            }
            (None, None) => {
                let date_cmp = PartialDate {
                    date: self.date,
                    precision: self.date_precision,
                }
                .partial_cmp_precise(&PartialDate {
                    date: other.date,
                    precision: other.date_precision,
                });
                match date_cmp {
                    PartialOrdering::Ordered(Ordering::Equal) => match (self.time, other.time) {
                        (Some(_), Some(_)) => PartialTime {
                            time: self.time.unwrap(),
                            precision: self.time_precision,
                        }
                        .partial_cmp_precise(&PartialTime {
                            time: other.time.unwrap(),
                            precision: other.time_precision,
                        }),
                        (None, None) => PartialOrdering::Ordered(Ordering::Equal),
                        _ => PartialOrdering::Indeterminate,
                    },
                    other => other,
                }
            }
            // One has an offset and the other doesn't: not directly comparable.
            _ => PartialOrdering::Indeterminate,
        }
    }

    /// Equality for `=`: requires identical precision on both date and time.
    pub fn strict_eq(&self, other: &PartialDateTime) -> Option<bool> {
        if self.date_precision != other.date_precision || self.offset.is_some() != other.offset.is_some() {
            return None;
        }
        match self.partial_cmp_precise(other) {
            PartialOrdering::Ordered(ord) => Some(ord == Ordering::Equal),
            PartialOrdering::Indeterminate => None,
        }
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            DatePrecision::Year => write!(f, "{:04}", self.date.year()),
            DatePrecision::Month => write!(f, "{:04}-{:02}", self.date.year(), self.date.month()),
            DatePrecision::Day => write!(
                f,
                "{:04}-{:02}-{:02}",
                self.date.year(),
                self.date.month(),
                self.date.day()
            ),
        }
    }
}

impl fmt::Display for PartialTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            TimePrecision::Hour => write!(f, "{:02}", self.time.hour()),
            TimePrecision::Minute => write!(f, "{:02}:{:02}", self.time.hour(), self.time.minute()),
            TimePrecision::Second => write!(
                f,
                "{:02}:{:02}:{:02}",
                self.time.hour(),
                self.time.minute(),
                self.time.second()
            ),
            TimePrecision::Millisecond => write!(
                f,
                "{:02}:{:02}:{:02}.{:03}",
                self.time.hour(),
                self.time.minute(),
                self.time.second(),
                self.time.nanosecond() / 1_000_000
            ),
        }
    }
}

impl fmt::Display for PartialDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            PartialDate {
                date: self.date,
                precision: self.date_precision
            }
        )?;
        if let Some(time) = self.time {
            write!(
                f,
                "T{}",
                PartialTime {
                    time,
                    precision: self.time_precision
                }
            )?;
            if let Some(offset) = self.offset {
                write!(f, "{offset}")?;
            }
        }
        Ok(())
    }
}

/// Parse `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`.
fn parse_date_core(text: &str) -> Result<(NaiveDate, DatePrecision)> {
    let mut parts = text.split('-');
    let year_str = parts
        .next()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| FhirPathError::parse(0, "invalid year in date literal", &["YYYY"]))?;
    let year: i32 = year_str
        .parse()
        .map_err(|_| FhirPathError::parse(0, "invalid year in date literal", &["YYYY"]))?;
    let month_str = parts.next();
    let day_str = parts.next();
    let month: u32 = match month_str {
        Some(m) => m
            .parse()
            .map_err(|_| FhirPathError::parse(0, "invalid month in date literal", &["MM"]))?,
        None => 1,
    };
    let day: u32 = match day_str {
        Some(d) => d
            .parse()
            .map_err(|_| FhirPathError::parse(0, "invalid day in date literal", &["DD"]))?,
        None => 1,
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| FhirPathError::parse(0, "date literal is not a valid calendar date", &[]))?;
    let precision = if day_str.is_some() {
        DatePrecision::Day
    } else if month_str.is_some() {
        DatePrecision::Month
    } else {
        DatePrecision::Year
    };
    Ok((date, precision))
}

fn take_digits(s: &str, n: usize) -> Option<(u32, usize)> {
    if s.len() < n || !s.as_bytes()[..n].iter().all(u8::is_ascii_digit) {
        return None;
    }
    s[..n].parse().ok().map(|v| (v, n))
}

/// Parse `HH[:MM[:SS[.sss]]]` followed by an optional `Z`/`+HH:MM`/`-HH:MM`
/// timezone suffix. The timezone is returned separately; callers that don't
/// carry an offset (bare `Time` values) simply discard it.
fn parse_time_and_offset(text: &str) -> Result<(NaiveTime, TimePrecision, Option<FixedOffset>)> {
    let (hour, consumed) =
        take_digits(text, 2).ok_or_else(|| FhirPathError::parse(0, "invalid hour in time literal", &["HH"]))?;
    let mut idx = consumed;
    let mut minute = 0;
    let mut second = 0;
    let mut millis = 0;
    let mut precision = TimePrecision::Hour;

    if text[idx..].starts_with(':') {
        let (m, c) = take_digits(&text[idx + 1..], 2)
            .ok_or_else(|| FhirPathError::parse(idx, "invalid minute in time literal", &["MM"]))?;
        minute = m;
        idx += 1 + c;
        precision = TimePrecision::Minute;

        if text[idx..].starts_with(':') {
            let (s, c) = take_digits(&text[idx + 1..], 2)
                .ok_or_else(|| FhirPathError::parse(idx, "invalid second in time literal", &["SS"]))?;
            second = s;
            idx += 1 + c;
            precision = TimePrecision::Second;

            if text[idx..].starts_with('.') {
                let frac_start = idx + 1;
                let mut frac_end = frac_start;
                while frac_end < text.len() && text.as_bytes()[frac_end].is_ascii_digit() {
                    frac_end += 1;
                }
                if frac_end == frac_start {
                    return Err(FhirPathError::parse(frac_start, "invalid fractional seconds", &[]));
                }
                let mut digits = text[frac_start..frac_end].to_string();
                digits.truncate(3);
                while digits.len() < 3 {
                    digits.push('0');
                }
                millis = digits.parse().unwrap_or(0);
                precision = TimePrecision::Millisecond;
                idx = frac_end;
            }
        }
    }

    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)
        .ok_or_else(|| FhirPathError::parse(0, "time literal is not a valid time of day", &[]))?;
    let offset = parse_offset(&text[idx..])?;
    Ok((time, precision, offset))
}

fn parse_offset(text: &str) -> Result<Option<FixedOffset>> {
    if text.is_empty() {
        return Ok(None);
    }
    if text == "Z" {
        return Ok(Some(FixedOffset::east_opt(0).unwrap()));
    }
    let sign = match text.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => {
            return Err(FhirPathError::parse(
                0,
                "invalid timezone offset",
                &["Z", "+HH:MM", "-HH:MM"],
            ));
        }
    };
    let mut parts = text[1..].split(':');
    let hh: i32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| FhirPathError::parse(0, "invalid timezone hour", &[]))?;
    let mm: i32 = match parts.next() {
        Some(s) => s
            .parse()
            .map_err(|_| FhirPathError::parse(0, "invalid timezone minute", &[]))?,
        None => 0,
    };
    let total_seconds = sign * (hh * 3600 + mm * 60);
    FixedOffset::east_opt(total_seconds)
        .map(Some)
        .ok_or_else(|| FhirPathError::parse(0, "timezone offset out of range", &[]))
}

impl PartialDate {
    /// Parse a date literal body (without the leading `@`): `YYYY`,
    /// `YYYY-MM`, or `YYYY-MM-DD`.
    pub fn parse(text: &str) -> Result<PartialDate> {
        let (date, precision) = parse_date_core(text)?;
        Ok(PartialDate { date, precision })
    }
}

impl PartialTime {
    /// Parse a time literal body (without the leading `@T`):
    /// `HH[:MM[:SS[.sss]]]`. A trailing timezone suffix is accepted but
    /// discarded — `Time` values carry no zone.
    pub fn parse(text: &str) -> Result<PartialTime> {
        let (time, precision, _offset) = parse_time_and_offset(text)?;
        Ok(PartialTime { time, precision })
    }
}

impl PartialDateTime {
    /// Parse a datetime literal body (without the leading `@`):
    /// `YYYY[-MM[-DD[THH[:MM[:SS[.sss]]][zzzz]]]]`.
    pub fn parse(text: &str) -> Result<PartialDateTime> {
        let (date_part, time_part) = match text.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (text, None),
        };
        let (date, date_precision) = parse_date_core(date_part)?;
        match time_part.filter(|t| !t.is_empty()) {
            Some(t) => {
                let (time, time_precision, offset) = parse_time_and_offset(t)?;
                Ok(PartialDateTime {
                    date,
                    time: Some(time),
                    offset,
                    date_precision,
                    time_precision,
                })
            }
            None => Ok(PartialDateTime {
                date,
                time: None,
                offset: None,
                date_precision,
                time_precision: TimePrecision::Hour,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32, precision: DatePrecision) -> PartialDate {
        PartialDate {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            precision,
        }
    }

    #[test]
    fn year_vs_day_precision_is_indeterminate_when_equal() {
        let a = date(2020, 1, 1, DatePrecision::Year);
        let b = date(2020, 3, 15, DatePrecision::Day);
        assert_eq!(a.partial_cmp_precise(&b), PartialOrdering::Indeterminate);
    }

    #[test]
    fn differing_year_is_still_decidable() {
        let a = date(2019, 1, 1, DatePrecision::Year);
        let b = date(2020, 3, 15, DatePrecision::Day);
        assert_eq!(
            a.partial_cmp_precise(&b),
            PartialOrdering::Ordered(Ordering::Less)
        );
    }

    #[test]
    fn same_precision_equal_dates_compare_equal() {
        let a = date(2020, 3, 15, DatePrecision::Day);
        let b = date(2020, 3, 15, DatePrecision::Day);
        assert_eq!(
            a.partial_cmp_precise(&b),
            PartialOrdering::Ordered(Ordering::Equal)
        );
    }

    #[test]
    fn parses_date_at_each_precision() {
        assert_eq!(PartialDate::parse("2020").unwrap().precision, DatePrecision::Year);
        assert_eq!(PartialDate::parse("2020-03").unwrap().precision, DatePrecision::Month);
        assert_eq!(PartialDate::parse("2020-03-15").unwrap().precision, DatePrecision::Day);
    }

    #[test]
    fn parses_datetime_with_offset() {
        let dt = PartialDateTime::parse("2020-03-15T10:30:00.500+01:00").unwrap();
        assert_eq!(dt.time_precision, TimePrecision::Millisecond);
        assert!(dt.offset.is_some());
        assert_eq!(dt.time.unwrap().hour(), 10);
    }

    #[test]
    fn parses_datetime_date_only() {
        let dt = PartialDateTime::parse("2020-03").unwrap();
        assert_eq!(dt.date_precision, DatePrecision::Month);
        assert!(dt.time.is_none());
    }

    #[test]
    fn parses_time_with_seconds() {
        let t = PartialTime::parse("10:30:15").unwrap();
        assert_eq!(t.precision, TimePrecision::Second);
        assert_eq!(t.time.second(), 15);
    }

    #[test]
    fn rejects_invalid_month() {
        assert!(PartialDate::parse("2020-13").is_err());
    }
}
