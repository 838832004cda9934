//! Sample periods and their textual forms.
//!
//! A period has two renderings:
//! - the unit string used in representation ids (`1_s`, `500_ms`, `10_min`),
//!   which picks the largest unit that keeps the value integral;
//! - the duration string used in JSON (`[d.]hh:mm:ss[.fffffff]`).

use std::fmt;

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CatalogError, Result};

const QUOTIENTS: [i64; 7] = [1000, 1000, 1000, 60, 60, 24, 1];
const POST_FIXES: [&str; 7] = ["ns", "us", "ms", "s", "min", "h", "d"];

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;

/// A strictly positive sample period with nanosecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplePeriod(TimeDelta);

impl SamplePeriod {
    /// Create a sample period, rejecting zero, negative and overflowing durations.
    pub fn new(delta: TimeDelta) -> Result<Self> {
        match delta.num_nanoseconds() {
            Some(nanos) if nanos > 0 => Ok(Self(delta)),
            Some(_) => Err(CatalogError::validation(format!(
                "the sample period {} is not valid, it must be positive",
                delta
            ))),
            None => Err(CatalogError::validation(format!(
                "the sample period {} exceeds the nanosecond range",
                delta
            ))),
        }
    }

    /// Create a sample period from nanoseconds.
    pub fn from_nanos(nanos: i64) -> Result<Self> {
        Self::new(TimeDelta::nanoseconds(nanos))
    }

    /// Create a sample period from milliseconds.
    pub fn from_millis(millis: i64) -> Result<Self> {
        Self::new(TimeDelta::milliseconds(millis))
    }

    /// Create a sample period from seconds.
    pub fn from_secs(secs: i64) -> Result<Self> {
        Self::new(TimeDelta::seconds(secs))
    }

    /// Create a sample period from minutes.
    pub fn from_minutes(minutes: i64) -> Result<Self> {
        Self::new(TimeDelta::minutes(minutes))
    }

    /// The period as a chrono duration.
    pub fn as_time_delta(&self) -> TimeDelta {
        self.0
    }

    /// The period in nanoseconds (always positive).
    pub fn as_nanos(&self) -> i64 {
        // validated in `new`
        self.0.num_nanoseconds().unwrap_or(i64::MAX)
    }

    /// Whether `other` is an integer multiple of this period.
    pub fn divides(&self, other: &SamplePeriod) -> bool {
        other.as_nanos() % self.as_nanos() == 0
    }

    /// Render the period as `{value}_{unit}` using the largest integral unit.
    pub fn to_unit_string(&self) -> String {
        let mut current = self.as_nanos();

        for (quotient, post_fix) in QUOTIENTS.iter().zip(POST_FIXES.iter()) {
            if current % quotient != 0 {
                return format!("{}_{}", current, post_fix);
            }
            current /= quotient;
        }

        format!("{}_{}", current, POST_FIXES[POST_FIXES.len() - 1])
    }

    /// Parse a unit string such as `10_min` or `500_ms`.
    pub fn from_unit_string(value: &str) -> Result<Self> {
        let invalid = || CatalogError::validation(format!("'{}' is not a valid unit string", value));

        let (number, unit) = value.split_once('_').ok_or_else(invalid)?;

        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let number: i64 = number.parse().map_err(|_| invalid())?;
        let unit_index = POST_FIXES
            .iter()
            .position(|candidate| *candidate == unit)
            .ok_or_else(invalid)?;

        let factor = QUOTIENTS[..unit_index]
            .iter()
            .try_fold(1i64, |acc, q| acc.checked_mul(*q))
            .ok_or_else(invalid)?;

        let nanos = number.checked_mul(factor).ok_or_else(invalid)?;
        Self::from_nanos(nanos)
    }

    /// Render the period as a duration string `[d.]hh:mm:ss[.fffffff]`.
    ///
    /// Fractions are written with 7 digits (100 ns ticks) and fall back to 9
    /// digits when the period is not a whole number of ticks.
    pub fn to_duration_string(&self) -> String {
        let nanos = self.as_nanos();
        let days = nanos / NANOS_PER_DAY;
        let hours = (nanos % NANOS_PER_DAY) / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
        let seconds = (nanos % NANOS_PER_MINUTE) / NANOS_PER_SECOND;
        let fraction = nanos % NANOS_PER_SECOND;

        let mut result = String::new();

        if days > 0 {
            result.push_str(&format!("{}.", days));
        }

        result.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));

        if fraction != 0 {
            if fraction % 100 == 0 {
                result.push_str(&format!(".{:07}", fraction / 100));
            } else {
                result.push_str(&format!(".{:09}", fraction));
            }
        }

        result
    }

    /// Parse a duration string `[d.]hh:mm:ss[.fffffff]`.
    pub fn from_duration_string(value: &str) -> Result<Self> {
        let invalid =
            || CatalogError::validation(format!("'{}' is not a valid duration string", value));

        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let (days, hours) = match parts[0].split_once('.') {
            Some((days, hours)) => (parse_digits(days).ok_or_else(invalid)?, hours),
            None => (0, parts[0]),
        };

        let (seconds, fraction) = match parts[2].split_once('.') {
            Some((seconds, fraction)) => (seconds, Some(fraction)),
            None => (parts[2], None),
        };

        let hours = parse_two_digits(hours, 24).ok_or_else(invalid)?;
        let minutes = parse_two_digits(parts[1], 60).ok_or_else(invalid)?;
        let seconds = parse_two_digits(seconds, 60).ok_or_else(invalid)?;

        let fraction_nanos = match fraction {
            Some(digits) if !digits.is_empty() && digits.len() <= 9 => {
                let scale = 10i64.pow(9 - digits.len() as u32);
                parse_digits(digits).ok_or_else(invalid)? * scale
            }
            Some(_) => return Err(invalid()),
            None => 0,
        };

        let nanos = days
            .checked_mul(NANOS_PER_DAY)
            .and_then(|n| n.checked_add(hours * NANOS_PER_HOUR))
            .and_then(|n| n.checked_add(minutes * NANOS_PER_MINUTE))
            .and_then(|n| n.checked_add(seconds * NANOS_PER_SECOND))
            .and_then(|n| n.checked_add(fraction_nanos))
            .ok_or_else(invalid)?;

        Self::from_nanos(nanos)
    }
}

fn parse_digits(value: &str) -> Option<i64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_two_digits(value: &str, limit: i64) -> Option<i64> {
    if value.len() != 2 {
        return None;
    }
    parse_digits(value).filter(|v| *v < limit)
}

impl fmt::Display for SamplePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_unit_string())
    }
}

impl TryFrom<TimeDelta> for SamplePeriod {
    type Error = CatalogError;

    fn try_from(value: TimeDelta) -> Result<Self> {
        Self::new(value)
    }
}

impl Serialize for SamplePeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_duration_string())
    }
}

impl<'de> Deserialize<'de> for SamplePeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_duration_string(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(nanos: i64) -> SamplePeriod {
        SamplePeriod::from_nanos(nanos).unwrap()
    }

    #[test]
    fn test_unit_strings() {
        let cases = [
            (100, "100_ns"),
            (200, "200_ns"),
            (1_500, "1500_ns"),
            (1_000, "1_us"),
            (10_000, "10_us"),
            (100_000, "100_us"),
            (1_500_000, "1500_us"),
            (1_000_000, "1_ms"),
            (10_000_000, "10_ms"),
            (100_000_000, "100_ms"),
            (1_500_000_000, "1500_ms"),
            (NANOS_PER_SECOND, "1_s"),
            (15 * NANOS_PER_SECOND, "15_s"),
            (NANOS_PER_MINUTE, "1_min"),
            (15 * NANOS_PER_MINUTE, "15_min"),
            (90 * NANOS_PER_MINUTE, "90_min"),
            (NANOS_PER_HOUR, "1_h"),
            (NANOS_PER_DAY, "1_d"),
            (3 * NANOS_PER_DAY, "3_d"),
        ];

        for (nanos, expected) in cases {
            assert_eq!(period(nanos).to_unit_string(), expected);
        }
    }

    #[test]
    fn test_unit_string_parse() {
        for unit_string in ["100_ns", "1500_us", "1_s", "15_min", "90_min", "1_h", "3_d"] {
            let parsed = SamplePeriod::from_unit_string(unit_string).unwrap();
            assert_eq!(parsed.to_unit_string(), unit_string);
        }

        assert_eq!(
            SamplePeriod::from_unit_string("10_min").unwrap(),
            SamplePeriod::from_minutes(10).unwrap()
        );
    }

    #[test]
    fn test_unit_string_parse_rejects_garbage() {
        for value in ["", "1", "_s", "1_", "1_sec", "0_s", "-1_s", "1_s_mean", "x_s"] {
            assert!(SamplePeriod::from_unit_string(value).is_err(), "{}", value);
        }
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(SamplePeriod::new(TimeDelta::zero()).is_err());
        assert!(SamplePeriod::new(TimeDelta::seconds(-1)).is_err());
        assert!(SamplePeriod::new(TimeDelta::minutes(1)).is_ok());
    }

    #[test]
    fn test_divides() {
        let one_second = SamplePeriod::from_secs(1).unwrap();
        let seven_seconds = SamplePeriod::from_secs(7).unwrap();
        let five_minutes = SamplePeriod::from_minutes(5).unwrap();
        let ten_minutes = SamplePeriod::from_minutes(10).unwrap();

        assert!(one_second.divides(&five_minutes));
        assert!(five_minutes.divides(&ten_minutes));
        assert!(!ten_minutes.divides(&five_minutes));
        assert!(!seven_seconds.divides(&five_minutes));
    }

    #[test]
    fn test_duration_strings() {
        let cases = [
            (NANOS_PER_SECOND, "00:00:01"),
            (NANOS_PER_MINUTE, "00:01:00"),
            (10 * NANOS_PER_MINUTE, "00:10:00"),
            (100_000_000, "00:00:00.1000000"),
            (125, "00:00:00.000000125"),
            (NANOS_PER_DAY + 8 * NANOS_PER_MINUTE + 7 * NANOS_PER_SECOND, "1.00:08:07"),
        ];

        for (nanos, expected) in cases {
            assert_eq!(period(nanos).to_duration_string(), expected);
            assert_eq!(SamplePeriod::from_duration_string(expected).unwrap(), period(nanos));
        }
    }

    #[test]
    fn test_duration_string_short_fraction() {
        assert_eq!(
            SamplePeriod::from_duration_string("12:08:07.125").unwrap(),
            period(12 * NANOS_PER_HOUR + 8 * NANOS_PER_MINUTE + 7 * NANOS_PER_SECOND + 125_000_000)
        );
    }

    #[test]
    fn test_duration_string_rejects_garbage() {
        for value in ["", "1", "00:00", "00:00:00", "00:60:00", "24:00:00", "a.00:00:01", "00:00:01."] {
            assert!(SamplePeriod::from_duration_string(value).is_err(), "{}", value);
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let p = SamplePeriod::from_millis(500).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"00:00:00.5000000\"");
        let back: SamplePeriod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
