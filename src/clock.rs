// src/clock.rs
//! The clock collaborator. Everything that needs "now" or "today" takes a [`Clock`].

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::DateError;
use crate::week_math::{self, CalendarDate};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The UTC calendar date of [`Clock::now`].
    fn today(&self) -> CalendarDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock. Clones share the same instant, so a test can hold one
/// handle and move time under a resolver holding another.
#[derive(Debug, Clone)]
pub struct TestClock {
    current_time: Arc<Mutex<NaiveDateTime>>,
}

impl TestClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(at.naive_utc())),
        }
    }

    /// Pins the clock to midnight UTC of a `YYYY-MM-DD` date.
    pub fn at_date(input: &str) -> Result<Self, DateError> {
        let date = week_math::parse_calendar_date(input)?;
        Ok(Self::new(midnight(date)))
    }

    pub fn set_time(&self, at: DateTime<Utc>) {
        *self.lock() = at.naive_utc();
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.set_time(midnight(date));
    }

    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    fn lock(&self) -> MutexGuard<'_, NaiveDateTime> {
        // A panicked holder cannot leave a half-written NaiveDateTime behind.
        self.current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().and_utc()
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
