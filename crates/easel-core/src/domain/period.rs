//! Generation periods: four 6-hour slots per day.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Hours covered by one period.
pub const PERIOD_HOURS: u32 = 6;

/// The slot a cycle belongs to. `number` is 1..=4.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Period {
    pub date: NaiveDate,
    pub number: u8,
}

impl Period {
    /// Period containing the given local time.
    pub fn containing(at: NaiveDateTime) -> Self {
        Self {
            date: at.date(),
            number: (at.hour() / PERIOD_HOURS + 1) as u8,
        }
    }

    /// Directory / file stem for this period, e.g. `period_3`.
    pub fn slug(&self) -> String {
        format!("period_{}", self.number)
    }

    /// Start of the period after the one containing `at`.
    pub fn next_start(at: NaiveDateTime) -> NaiveDateTime {
        let next_hour = (at.hour() / PERIOD_HOURS + 1) * PERIOD_HOURS;
        at.date().and_time(NaiveTime::MIN) + Duration::hours(i64::from(next_hour))
    }

    /// Human hint for status updates, e.g. `in 2h 15m`.
    pub fn next_cycle_hint(at: NaiveDateTime) -> String {
        let remaining = Self::next_start(at) - at;
        let minutes = remaining.num_minutes();
        format!("in {}h {}m", minutes / 60, minutes % 60)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Period {}", self.number)
    }
}
