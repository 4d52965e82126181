//! Calendar date keys.
//!
//! A [`DateKey`] is a local calendar date rendered as `YYYY-MM-DD`. Keys are
//! only ever compared by whole-day distance, never by wall-clock time, so all
//! arithmetic goes through `NaiveDate` and is immune to DST shifts.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar date in `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a key from year/month/day, rejecting impossible dates.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| Error::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Month this key falls in, as `YYYY-MM`.
    pub fn month_label(&self) -> String {
        format!("{:04}-{:02}", self.0.year(), self.0.month())
    }

    /// Key `days` calendar days after this one (negative goes back).
    pub fn offset(&self, days: i64) -> Self {
        Self(self.0 + chrono::Duration::days(days))
    }
}

/// Current local calendar date.
///
/// Two calls that straddle midnight return different keys; callers must not
/// assume stability across an await point.
pub fn today() -> DateKey {
    DateKey(Local::now().date_naive())
}

/// Whole calendar days from `a` to `b` (`b - a`).
pub fn diff_days(a: DateKey, b: DateKey) -> i64 {
    b.0.signed_duration_since(a.0).num_days()
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        // chrono accepts unpadded fields; keys must be unambiguous.
        if trimmed.len() != 10 {
            return Err(Error::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Self)
            .map_err(|_| Error::InvalidDate(s.to_string()))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DateKey {
        s.parse().expect("date key")
    }

    #[test]
    fn diff_is_zero_for_same_day() {
        let d = key("2024-03-05");
        assert_eq!(diff_days(d, d), 0);
    }

    #[test]
    fn diff_is_antisymmetric() {
        let a = key("2024-01-30");
        let b = key("2024-03-02");
        assert_eq!(diff_days(a, b), 32);
        assert_eq!(diff_days(b, a), -32);
    }

    #[test]
    fn diff_crosses_dst_and_leap_day() {
        // US and EU DST changes both fall inside this range.
        assert_eq!(diff_days(key("2024-03-09"), key("2024-03-11")), 2);
        assert_eq!(diff_days(key("2024-10-26"), key("2024-10-28")), 2);
        assert_eq!(diff_days(key("2024-02-28"), key("2024-03-01")), 2);
        assert_eq!(diff_days(key("2023-12-31"), key("2024-01-01")), 1);
    }

    #[test]
    fn parse_rejects_ambiguous_forms() {
        assert!("2024-1-5".parse::<DateKey>().is_err());
        assert!("2024/01/05".parse::<DateKey>().is_err());
        assert!("2024-02-30".parse::<DateKey>().is_err());
        assert!("".parse::<DateKey>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let d = key("2024-01-05");
        assert_eq!(d.to_string(), "2024-01-05");
        assert_eq!(d.month_label(), "2024-01");
        assert_eq!(d.offset(-5).to_string(), "2023-12-31");
    }

    #[test]
    fn serde_uses_plain_string() {
        let d = key("2024-07-04");
        let json = serde_json::to_string(&d).expect("serialize");
        assert_eq!(json, "\"2024-07-04\"");
        let back: DateKey = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, d);
        assert!(serde_json::from_str::<DateKey>("\"07/04/2024\"").is_err());
    }

    #[test]
    fn today_is_well_formed() {
        let t = today();
        assert_eq!(t.to_string().len(), 10);
        assert_eq!(t.to_string().parse::<DateKey>().expect("parse"), t);
    }
}
