//! Logger frequency token parsing.
//!
//! The logger declares record intervals and frame time resolution with short
//! mixed-case tokens such as `30 SEC`, `100 MSEC`, `2HR`, or the compound
//! resolution forms `SecMsec` and `Sec100Usec`. A compound token with no
//! explicit count carries an implicit count of 1.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Compound resolution tokens rewritten to carry their implicit count.
/// Applied before unit matching.
const COMPOUND: [(&str, &str); 2] = [("SECUSEC", "SEC1USEC"), ("SECMSEC", "SEC1MSEC")];

/// Unit abbreviations and their length in microseconds, in decreasing match
/// precedence so `MSEC`/`USEC` win over the `SEC` they embed.
const UNITS: [(&str, u64); 9] = [
    ("MSEC", 1_000),
    ("USEC", 1),
    ("SEC", 1_000_000),
    ("MIN", 60_000_000),
    ("MS", 1_000),
    ("US", 1),
    ("HR", 3_600_000_000),
    ("H", 3_600_000_000),
    ("S", 1_000_000),
];

/// A sampling or frame-time interval with microsecond resolution.
///
/// Parsed from a logger frequency token via [`FromStr`]; [`fmt::Display`]
/// renders the canonical short form (`30s`, `100ms`, `50us`, `2h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval(Duration);

impl Interval {
    /// Build from fractional seconds, rounding to whole seconds at or above
    /// one second and to microseconds below it.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs >= 1.0 {
            Interval(Duration::from_secs(secs.round() as u64))
        } else {
            Interval(Duration::from_micros((secs * 1e6).round().max(0.0) as u64))
        }
    }

    /// Total seconds, possibly fractional.
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    #[must_use]
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let mut text: String = token
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        for (from, to) in COMPOUND {
            text = text.replace(from, to);
        }

        // Strip any non-numeric prefix, e.g. the leading whole-seconds marker
        // of `Sec100Usec`.
        let start = text
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::Frequency(token.to_string()))?;
        let mut rest = &text[start..];

        let mut micros = 0.0f64;
        while !rest.is_empty() {
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit() && c != '.')
                .unwrap_or(rest.len());
            if digits_end == 0 {
                return Err(Error::Frequency(token.to_string()));
            }
            let count: f64 = rest[..digits_end]
                .parse()
                .map_err(|_| Error::Frequency(token.to_string()))?;
            rest = &rest[digits_end..];

            let Some((abbrev, unit_micros)) = UNITS.iter().find(|(u, _)| rest.starts_with(u))
            else {
                return Err(Error::Frequency(token.to_string()));
            };
            rest = &rest[abbrev.len()..];
            micros += count * *unit_micros as f64;
        }

        Ok(Interval(Duration::from_micros(micros.round() as u64)))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let micros = self.0.as_micros();
        if micros == 0 {
            write!(f, "0s")
        } else if micros % 3_600_000_000 == 0 {
            write!(f, "{}h", micros / 3_600_000_000)
        } else if micros % 1_000_000 == 0 {
            write!(f, "{}s", micros / 1_000_000)
        } else if micros % 1_000 == 0 {
            write!(f, "{}ms", micros / 1_000)
        } else {
            write!(f, "{micros}us")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1SEC", 1.0; "one second")]
    #[test_case("30 SEC", 30.0; "thirty seconds with space")]
    #[test_case("100MSEC", 0.1; "milliseconds")]
    #[test_case("500Usec", 0.0005; "microseconds")]
    #[test_case("2HR", 7200.0; "hours")]
    #[test_case("5MIN", 300.0; "minutes")]
    #[test_case("SecMsec", 0.001; "compound millisecond resolution")]
    #[test_case("SecUsec", 0.000_001; "compound microsecond resolution")]
    #[test_case("Sec100Usec", 0.0001; "compound with explicit count")]
    #[test_case("1Sec500Usec", 1.0005; "sum of compound parts")]
    #[test_case("0.05 SEC", 0.05; "fractional count")]
    #[test_case("30s", 30.0; "canonical seconds")]
    #[test_case("100ms", 0.1; "canonical milliseconds")]
    fn parse(token: &str, secs: f64) {
        let interval: Interval = token.parse().unwrap();
        assert!(
            (interval.as_secs_f64() - secs).abs() < 1e-12,
            "{token:?} parsed to {} expected {secs}",
            interval.as_secs_f64()
        );
    }

    #[test_case(""; "empty")]
    #[test_case("fast"; "no digits no units")]
    #[test_case("10"; "count with no unit")]
    #[test_case("10XYZ"; "unknown unit")]
    fn parse_fails(token: &str) {
        assert!(token.parse::<Interval>().is_err(), "{token:?} should fail");
    }

    #[test_case(30.0, "30s"; "whole seconds")]
    #[test_case(0.1, "100ms"; "milliseconds")]
    #[test_case(0.0001, "100us"; "microseconds")]
    #[test_case(7200.0, "2h"; "hours")]
    fn display(secs: f64, expected: &str) {
        assert_eq!(Interval::from_secs_f64(secs).to_string(), expected);
    }

    #[test]
    fn display_round_trips() {
        for token in ["30s", "100ms", "50us", "2h"] {
            let interval: Interval = token.parse().unwrap();
            assert_eq!(interval.to_string(), token);
        }
    }

    #[test]
    fn average_interval_rounds_to_whole_seconds() {
        let interval = Interval::from_secs_f64(29.97);
        assert_eq!(interval.to_string(), "30s");
    }
}
