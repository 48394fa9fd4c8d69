// src/edit_window.rs
//! Sliding write window: only the current and the next custom week accept submissions.
//!
//! The policy is advisory. Reads of locked weeks stay allowed; callers consult
//! [`EditWindowPolicy::classify`] before writing.

use serde::Serialize;

use crate::error::DateError;
use crate::period_key::{self, PeriodKey};
use crate::week_math::{self, CalendarDate, CustomWeek};

/// First week the reporting programme ran.
pub const FIRST_REPORTING_WEEK: (i32, u32) = (2025, 26);

/// [`FIRST_REPORTING_WEEK`] as a [`CustomWeek`].
pub fn first_reporting_week() -> Result<CustomWeek, DateError> {
    CustomWeek::new(FIRST_REPORTING_WEEK.0, FIRST_REPORTING_WEEK.1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditDecision {
    Editable,
    LockedFuture,
    LockedPast,
}

impl EditDecision {
    pub fn is_editable(&self) -> bool {
        matches!(self, EditDecision::Editable)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EditWindowPolicy {
    /// Weeks after the current one that are open for planning.
    lookahead: u32,
}

impl Default for EditWindowPolicy {
    fn default() -> Self {
        Self { lookahead: 1 }
    }
}

impl EditWindowPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether `candidate` may be written when today is `today`.
    ///
    /// Weeks are compared as `(year, week)` pairs, never by date subtraction.
    pub fn classify(
        &self,
        today: CalendarDate,
        candidate: CustomWeek,
    ) -> Result<EditDecision, DateError> {
        let current = week_math::to_custom_week(today)?;
        if candidate < current {
            return Ok(EditDecision::LockedPast);
        }
        let last_open = current.offset(i64::from(self.lookahead))?;
        if candidate > last_open {
            Ok(EditDecision::LockedFuture)
        } else {
            Ok(EditDecision::Editable)
        }
    }

    /// Every week from `since` through next week, most recent first.
    ///
    /// `since` never reaches back before [`FIRST_REPORTING_WEEK`].
    /// Returns an empty list when `since` lies beyond next week.
    pub fn selectable_weeks(
        &self,
        today: CalendarDate,
        since: CustomWeek,
    ) -> Result<Vec<WeekOption>, DateError> {
        let current = week_math::to_custom_week(today)?;
        let next = current.next()?;
        let last_open = current.offset(i64::from(self.lookahead))?;

        let mut options = Vec::new();
        let mut cursor = since.max(first_reporting_week()?);
        while cursor <= last_open {
            options.push(WeekOption {
                key: PeriodKey::new(cursor),
                label: period_key::label(cursor)?,
                week_number: cursor.week(),
                year: cursor.year(),
                start_date: cursor.start_date()?,
                decision: self.classify(today, cursor)?,
                is_current: cursor == current,
                is_next_week: cursor == next,
            });
            cursor = cursor.next()?;
        }
        options.reverse();
        Ok(options)
    }
}

/// One entry of the week picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekOption {
    pub key: PeriodKey,
    pub label: String,
    pub week_number: u32,
    pub year: i32,
    pub start_date: CalendarDate,
    pub decision: EditDecision,
    pub is_current: bool,
    pub is_next_week: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn week(year: i32, week: u32) -> CustomWeek {
        CustomWeek::new(year, week).unwrap()
    }

    #[test]
    fn current_and_next_week_are_editable() {
        let policy = EditWindowPolicy::new();
        let today = d("2025-06-23"); // W26-2025
        assert_eq!(policy.classify(today, week(2025, 26)).unwrap(), EditDecision::Editable);
        assert_eq!(policy.classify(today, week(2025, 27)).unwrap(), EditDecision::Editable);
        assert_eq!(policy.classify(today, week(2025, 28)).unwrap(), EditDecision::LockedFuture);
        assert_eq!(policy.classify(today, week(2025, 25)).unwrap(), EditDecision::LockedPast);
    }

    #[test]
    fn window_holds_for_every_day_across_several_years() {
        let policy = EditWindowPolicy::new();
        let mut today = d("2023-11-01");
        while today <= d("2027-02-28") {
            let current = week_math::to_custom_week(today).unwrap();
            let check = |w: CustomWeek| policy.classify(today, w).unwrap();
            assert_eq!(check(current), EditDecision::Editable, "{today}");
            assert_eq!(check(current.next().unwrap()), EditDecision::Editable, "{today}");
            assert_eq!(check(current.offset(2).unwrap()), EditDecision::LockedFuture, "{today}");
            assert_eq!(check(current.previous().unwrap()), EditDecision::LockedPast, "{today}");
            today = today.succ_opt().unwrap();
        }
    }

    #[test]
    fn window_spans_the_year_boundary() {
        let policy = EditWindowPolicy::new();
        // Thursday 2026-01-01 sits in W53-2025; next week is W01-2026.
        let today = d("2026-01-01");
        assert_eq!(policy.classify(today, week(2026, 1)).unwrap(), EditDecision::Editable);
        assert_eq!(policy.classify(today, week(2026, 2)).unwrap(), EditDecision::LockedFuture);
        assert_eq!(policy.classify(today, week(2025, 52)).unwrap(), EditDecision::LockedPast);
    }

    #[test]
    fn friday_already_belongs_to_the_coming_week() {
        let policy = EditWindowPolicy::new();
        let friday = d("2025-06-27"); // W27-2025
        assert_eq!(policy.classify(friday, week(2025, 26)).unwrap(), EditDecision::LockedPast);
        assert_eq!(policy.classify(friday, week(2025, 28)).unwrap(), EditDecision::Editable);
    }

    #[test]
    fn selectable_weeks_run_newest_first_and_end_at_next_week() {
        let policy = EditWindowPolicy::new();
        let today = d("2025-07-07"); // W28-2025
        let options = policy.selectable_weeks(today, week(2025, 26)).unwrap();

        let keys: Vec<String> = options.iter().map(|o| o.key.to_string()).collect();
        assert_eq!(keys, vec!["W29-2025", "W28-2025", "W27-2025", "W26-2025"]);

        assert!(options[0].is_next_week && options[0].decision.is_editable());
        assert!(options[1].is_current && options[1].decision.is_editable());
        assert_eq!(options[2].decision, EditDecision::LockedPast);
        assert_eq!(options[1].label, "Jul 6 - Jul 10, 2025");
        assert_eq!(options[1].start_date, d("2025-07-06"));
    }

    #[test]
    fn selectable_weeks_never_start_before_the_first_reporting_week() {
        let policy = EditWindowPolicy::new();
        let today = d("2025-06-30"); // W27-2025
        let from_default = policy.selectable_weeks(today, first_reporting_week().unwrap()).unwrap();

        for early in [week(2025, 24), week(2024, 52), week(1970, 1)] {
            assert_eq!(policy.selectable_weeks(today, early).unwrap(), from_default, "{early:?}");
        }
        let keys: Vec<String> = from_default.iter().map(|o| o.key.to_string()).collect();
        assert_eq!(keys, vec!["W28-2025", "W27-2025", "W26-2025"]);
    }

    #[test]
    fn selectable_weeks_is_empty_when_start_is_in_the_future() {
        let policy = EditWindowPolicy::new();
        let options = policy.selectable_weeks(d("2025-06-23"), week(2025, 30)).unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn decisions_serialize_in_camel_case() {
        assert_eq!(
            serde_json::to_string(&EditDecision::LockedFuture).unwrap(),
            "\"lockedFuture\""
        );
    }
}
