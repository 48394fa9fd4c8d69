// src/period_key.rs
//! Canonical `Wnn-YYYY` identifiers for custom weeks.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DateError, ParseError};
use crate::week_math::{self, CalendarDate, CustomWeek};

// Patterns are literals; a failure here is a programming error.
static WEEK_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^w(\d{1,2})-(\d{4})$").expect("week-first pattern"));
static YEAR_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{4})-w(\d{1,2})$").expect("year-first pattern"));
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern"));

const LABEL_DAY_FORMAT: &str = "%b %-d";

/// A custom week addressed by its textual key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey(CustomWeek);

impl PeriodKey {
    pub fn new(week: CustomWeek) -> Self {
        Self(week)
    }

    /// Accepts `Wnn-YYYY`, `YYYY-Wnn` or `YYYY-MM-DD`. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        parse(input).map(Self)
    }

    /// The week containing `date`.
    pub fn from_date(date: CalendarDate) -> Result<Self, DateError> {
        week_math::to_custom_week(date).map(Self)
    }

    pub fn week(&self) -> CustomWeek {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn week_number(&self) -> u32 {
        self.0.week()
    }

    /// The Sunday the week starts on.
    pub fn start_date(&self) -> Result<CalendarDate, DateError> {
        self.0.start_date()
    }

    /// `"Jun 22 - Jun 26, 2025"`
    pub fn label(&self) -> Result<String, DateError> {
        label(self.0)
    }
}

impl From<CustomWeek> for PeriodKey {
    fn from(week: CustomWeek) -> Self {
        Self(week)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self.0))
    }
}

impl FromStr for PeriodKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parses any accepted period shape into a custom week.
pub fn parse(input: &str) -> Result<CustomWeek, ParseError> {
    let trimmed = input.trim();
    let invalid = |source: DateError| ParseError::InvalidWeek {
        input: input.to_string(),
        source,
    };

    if let Some(caps) = WEEK_FIRST.captures(trimmed) {
        let (week, year) = numbers(input, &caps[1], &caps[2])?;
        return CustomWeek::new(year, week).map_err(invalid);
    }
    if let Some(caps) = YEAR_FIRST.captures(trimmed) {
        let (week, year) = numbers(input, &caps[2], &caps[1])?;
        return CustomWeek::new(year, week).map_err(invalid);
    }
    if ISO_DATE.is_match(trimmed) {
        let date = week_math::parse_calendar_date(trimmed).map_err(invalid)?;
        return week_math::to_custom_week(date).map_err(invalid);
    }

    Err(ParseError::UnrecognizedFormat {
        input: input.to_string(),
    })
}

fn numbers(input: &str, week: &str, year: &str) -> Result<(u32, i32), ParseError> {
    let unrecognized = || ParseError::UnrecognizedFormat {
        input: input.to_string(),
    };
    let week = week.parse::<u32>().map_err(|_| unrecognized())?;
    let year = year.parse::<i32>().map_err(|_| unrecognized())?;
    Ok((week, year))
}

/// `Wnn-YYYY` with a zero-padded week number.
pub fn format(week: CustomWeek) -> String {
    format!("W{:02}-{}", week.week(), week.year())
}

/// Human label spanning the five business days of the week.
pub fn label(week: CustomWeek) -> Result<String, DateError> {
    let start = week.start_date()?;
    let end = week.end_date()?;
    Ok(format!(
        "{} - {}, {}",
        start.format(LABEL_DAY_FORMAT),
        end.format(LABEL_DAY_FORMAT),
        week.year()
    ))
}
