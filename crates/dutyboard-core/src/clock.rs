//! Wall-clock source for the "what day is it" question.

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::sync::Mutex;

/// Source of the hospital-local current date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Real clock pinned to the hospital's UTC offset.
#[derive(Debug, Clone)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| {
            tracing::warn!("⚠️ Invalid UTC offset {minutes}min, falling back to UTC");
            Utc.fix()
        });
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        if let Ok(mut t) = self.today.lock() {
            *t = date;
        }
    }

    /// Move forward by whole days.
    pub fn advance_days(&self, days: u64) {
        if let Ok(mut t) = self.today.lock() {
            *t = *t + chrono::Days::new(days);
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        match self.today.lock() {
            Ok(t) => *t,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
