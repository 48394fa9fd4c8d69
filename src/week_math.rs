// src/week_math.rs
//! Sunday-Thursday business-week arithmetic.
//!
//! A custom week runs Sunday through Thursday; Friday and Saturday roll into the
//! following week. Every date is projected onto its week's Wednesday (the reference
//! day) and weeks are counted in whole 7-day spans from the first Wednesday on or
//! after 1 January. This is ISO-week math re-anchored to a Sunday start.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::DateError;

/// A date with no time component. All week arithmetic runs on this type only.
pub type CalendarDate = NaiveDate;

pub const REFERENCE_WEEKDAY: Weekday = Weekday::Wed;
pub const BUSINESS_DAYS_PER_WEEK: u64 = 5;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DAYS_PER_WEEK: i64 = 7;

/// A (year, week) pair under the Sunday-Thursday rule.
///
/// Field order matters: the derived `Ord` compares year first, then week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomWeek {
    year: i32,
    week: u32,
}

impl CustomWeek {
    /// Builds a week, rejecting numbers outside `1..=weeks_in_year(year)`.
    pub fn new(year: i32, week: u32) -> Result<Self, DateError> {
        let max = weeks_in_year(year)?;
        if week == 0 || week > max {
            return Err(DateError::WeekOutOfRange { year, week, max });
        }
        Ok(Self { year, week })
    }

    /// The custom week a date belongs to.
    pub fn containing(date: CalendarDate) -> Result<Self, DateError> {
        to_custom_week(date)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// The Sunday that opens this week.
    pub fn start_date(&self) -> Result<CalendarDate, DateError> {
        start_of_custom_week(self.year, self.week)
    }

    /// The Thursday that closes this week.
    pub fn end_date(&self) -> Result<CalendarDate, DateError> {
        let start = self.start_date()?;
        shift_days(start, BUSINESS_DAYS_PER_WEEK as i64 - 1)
    }

    /// Sunday through Thursday, in order.
    pub fn business_days(&self) -> Result<Vec<CalendarDate>, DateError> {
        let start = self.start_date()?;
        (0..BUSINESS_DAYS_PER_WEEK as i64)
            .map(|offset| shift_days(start, offset))
            .collect()
    }

    /// The week `weeks` away from this one (negative goes back).
    pub fn offset(&self, weeks: i64) -> Result<Self, DateError> {
        let wednesday = shift_days(self.start_date()?, 3)?;
        let target = shift_days(wednesday, weeks * DAYS_PER_WEEK)?;
        to_custom_week(target)
    }

    pub fn next(&self) -> Result<Self, DateError> {
        self.offset(1)
    }

    pub fn previous(&self) -> Result<Self, DateError> {
        self.offset(-1)
    }
}

/// Maps a calendar date to its custom week.
pub fn to_custom_week(date: CalendarDate) -> Result<CustomWeek, DateError> {
    let wednesday = reference_day(date)?;
    let year = wednesday.year();
    let first = first_reference_day(year)?;
    let elapsed = wednesday.signed_duration_since(first).num_days();
    let week = elapsed.div_euclid(DAYS_PER_WEEK) + 1;
    Ok(CustomWeek {
        year,
        week: week as u32,
    })
}

/// The Sunday of `week` in `year`.
pub fn start_of_custom_week(year: i32, week: u32) -> Result<CalendarDate, DateError> {
    let max = weeks_in_year(year)?;
    if week == 0 || week > max {
        return Err(DateError::WeekOutOfRange { year, week, max });
    }
    let first = first_reference_day(year)?;
    let wednesday = shift_days(first, (i64::from(week) - 1) * DAYS_PER_WEEK)?;
    shift_days(wednesday, -3)
}

/// Number of custom weeks in a year: one per Wednesday, so 52 or 53.
pub fn weeks_in_year(year: i32) -> Result<u32, DateError> {
    let next_year = year
        .checked_add(1)
        .ok_or(DateError::YearOutOfRange { year })?;
    let first = first_reference_day(year)?;
    let next_first = first_reference_day(next_year)?;
    let span = next_first.signed_duration_since(first).num_days();
    Ok((span / DAYS_PER_WEEK) as u32)
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_calendar_date(input: &str) -> Result<CalendarDate, DateError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| DateError::Unparseable {
        input: input.to_string(),
    })
}

/// Sunday=0 .. Saturday=6
fn day_index(date: CalendarDate) -> i64 {
    i64::from(date.weekday().num_days_from_sunday())
}

/// Projects a date onto the Wednesday of its Sunday-Thursday week.
/// Friday and Saturday project onto the following Wednesday.
fn reference_day(date: CalendarDate) -> Result<CalendarDate, DateError> {
    let day = day_index(date);
    let offset = if day <= 4 { 3 - day } else { 10 - day };
    shift_days(date, offset)
}

/// First Wednesday on or after 1 January.
fn first_reference_day(year: i32) -> Result<CalendarDate, DateError> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(DateError::YearOutOfRange { year })?;
    let day = day_index(jan1);
    let offset = if day <= 3 { 3 - day } else { 10 - day };
    shift_days(jan1, offset)
}

fn shift_days(date: CalendarDate, days: i64) -> Result<CalendarDate, DateError> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or(DateError::Overflow { date })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn week(year: i32, week: u32) -> CustomWeek {
        CustomWeek::new(year, week).unwrap()
    }

    #[test]
    fn monday_in_june_maps_to_week_26() {
        assert_eq!(to_custom_week(d("2025-06-23")).unwrap(), week(2025, 26));
        assert_eq!(start_of_custom_week(2025, 26).unwrap(), d("2025-06-22"));
    }

    #[test]
    fn friday_and_saturday_roll_into_next_week() {
        assert_eq!(to_custom_week(d("2025-06-26")).unwrap(), week(2025, 26)); // Thursday
        assert_eq!(to_custom_week(d("2025-06-27")).unwrap(), week(2025, 27)); // Friday
        assert_eq!(to_custom_week(d("2025-06-28")).unwrap(), week(2025, 27)); // Saturday
        assert_eq!(to_custom_week(d("2025-06-29")).unwrap(), week(2025, 27)); // Sunday
    }

    #[test]
    fn week_one_can_start_in_december() {
        // 2025-01-01 is a Wednesday, so week 1 opens on Sunday 2024-12-29.
        assert_eq!(start_of_custom_week(2025, 1).unwrap(), d("2024-12-29"));
        assert_eq!(to_custom_week(d("2024-12-29")).unwrap(), week(2025, 1));
        assert_eq!(to_custom_week(d("2024-12-27")).unwrap(), week(2025, 1)); // Friday before
        assert_eq!(to_custom_week(d("2024-12-26")).unwrap(), week(2024, 52)); // Thursday before
    }

    #[test]
    fn late_new_year_spills_into_week_53() {
        // 2026-01-01 is a Thursday: it closes the 53rd week of 2025.
        assert_eq!(to_custom_week(d("2025-12-28")).unwrap(), week(2025, 53));
        assert_eq!(to_custom_week(d("2026-01-01")).unwrap(), week(2025, 53));
        assert_eq!(to_custom_week(d("2026-01-02")).unwrap(), week(2026, 1));
        assert_eq!(start_of_custom_week(2026, 1).unwrap(), d("2026-01-04"));
    }

    #[test]
    fn weeks_in_year_counts_wednesdays() {
        assert_eq!(weeks_in_year(2020).unwrap(), 53);
        assert_eq!(weeks_in_year(2024).unwrap(), 52);
        assert_eq!(weeks_in_year(2025).unwrap(), 53);
        assert_eq!(weeks_in_year(2026).unwrap(), 52);
    }

    #[test]
    fn out_of_range_weeks_are_rejected() {
        assert_eq!(
            CustomWeek::new(2024, 53),
            Err(DateError::WeekOutOfRange {
                year: 2024,
                week: 53,
                max: 52
            })
        );
        assert!(CustomWeek::new(2025, 0).is_err());
        assert!(start_of_custom_week(2026, 53).is_err());
        assert!(CustomWeek::new(2025, 53).is_ok());
    }

    #[test]
    fn start_of_week_round_trips_for_every_valid_week() {
        for year in 1990..=2060 {
            let max = weeks_in_year(year).unwrap();
            for w in 1..=max {
                let sunday = start_of_custom_week(year, w).unwrap();
                assert_eq!(sunday.weekday(), Weekday::Sun, "{year} W{w}");
                assert_eq!(to_custom_week(sunday).unwrap(), week(year, w), "{sunday}");
            }
        }
    }

    #[test]
    fn every_date_resolves_to_a_sunday_anchored_week() {
        let mut date = d("2019-12-01");
        let end = d("2031-01-31");
        while date <= end {
            let w = to_custom_week(date).unwrap();
            let sunday = w.start_date().unwrap();
            assert_eq!(sunday.weekday(), Weekday::Sun);
            match date.weekday() {
                Weekday::Fri | Weekday::Sat => {
                    let gap = sunday.signed_duration_since(date).num_days();
                    assert!((1..=2).contains(&gap), "{date} -> {sunday}");
                }
                _ => {
                    assert!(sunday <= date && date <= w.end_date().unwrap(), "{date}");
                }
            }
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn offsets_cross_year_boundaries_without_drift() {
        assert_eq!(week(2024, 52).next().unwrap(), week(2025, 1));
        assert_eq!(week(2025, 1).previous().unwrap(), week(2024, 52));
        assert_eq!(week(2025, 53).next().unwrap(), week(2026, 1));
        assert_eq!(week(2026, 1).offset(-2).unwrap(), week(2025, 52));
        assert_eq!(week(2025, 26).offset(0).unwrap(), week(2025, 26));
    }

    #[test]
    fn ordering_is_year_then_week() {
        assert!(week(2024, 52) < week(2025, 1));
        assert!(week(2025, 2) > week(2025, 1));
    }

    #[test]
    fn business_days_run_sunday_to_thursday() {
        let days = week(2025, 26).business_days().unwrap();
        assert_eq!(days.len(), 5);
        assert_eq!(days[0], d("2025-06-22"));
        assert_eq!(days[4], d("2025-06-26"));
        assert_eq!(days[4].weekday(), Weekday::Thu);
    }

    #[test]
    fn calendar_dates_must_be_real() {
        assert_eq!(parse_calendar_date(" 2025-06-23 ").unwrap(), d("2025-06-23"));
        assert_eq!(
            parse_calendar_date("2025-02-30"),
            Err(DateError::Unparseable {
                input: "2025-02-30".to_string()
            })
        );
        assert!(parse_calendar_date("23/06/2025").is_err());
    }
}
