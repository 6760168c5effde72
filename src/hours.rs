// src/hours.rs
//! Weekly business-hours windows and the pre-event early-start window.
//!
//! Every window is a uniform `(open, close)` pair in minutes since local
//! midnight. `close < open` wraps past midnight into the next calendar day,
//! so a Saturday 18:00–01:00 window covers Sunday 00:30.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// One open/close window. `open == close` is degenerate and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub open: u16,
    pub close: u16,
}

impl DayWindow {
    pub fn wraps(&self) -> bool {
        self.close < self.open
    }

    /// Does `minute` fall inside the same-day portion of this window?
    fn covers_same_day(&self, minute: u16) -> bool {
        if self.wraps() {
            minute >= self.open
        } else {
            minute >= self.open && minute < self.close
        }
    }

    /// Does `minute` fall inside the next-day tail of a wrapping window?
    fn covers_next_day(&self, minute: u16) -> bool {
        self.wraps() && minute < self.close
    }
}

/// Per-weekday open windows. An entirely empty table fails open: the venue
/// prefers showing content over a blank screen, so no configuration means
/// "always in hours".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoursTable {
    pub mon: Vec<DayWindow>,
    pub tue: Vec<DayWindow>,
    pub wed: Vec<DayWindow>,
    pub thu: Vec<DayWindow>,
    pub fri: Vec<DayWindow>,
    pub sat: Vec<DayWindow>,
    pub sun: Vec<DayWindow>,
}

impl HoursTable {
    pub fn windows_for(&self, day: Weekday) -> &[DayWindow] {
        match day {
            Weekday::Mon => &self.mon,
            Weekday::Tue => &self.tue,
            Weekday::Wed => &self.wed,
            Weekday::Thu => &self.thu,
            Weekday::Fri => &self.fri,
            Weekday::Sat => &self.sat,
            Weekday::Sun => &self.sun,
        }
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.mon, &self.tue, &self.wed, &self.thu, &self.fri, &self.sat, &self.sun,
        ]
        .iter()
        .all(|d| d.is_empty())
    }

    /// Is the local wall-clock moment inside any open window?
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        if self.is_empty() {
            return true;
        }
        let minute = (now.time().hour() * 60 + now.time().minute()) as u16;
        let today = now.date().weekday();
        if self
            .windows_for(today)
            .iter()
            .any(|w| w.covers_same_day(minute))
        {
            return true;
        }
        // Yesterday's wrapping windows spill into the small hours of today.
        let yesterday = today.pred();
        self.windows_for(yesterday)
            .iter()
            .any(|w| w.covers_next_day(minute))
    }
}

/// True iff `now` falls within `[scheduled - offset, scheduled)` on the
/// event's own date. Allows the display to come up ahead of a scheduled
/// start even outside business hours.
pub fn in_early_start_window(
    event_date: NaiveDate,
    scheduled: NaiveTime,
    now: NaiveDateTime,
    offset: Duration,
) -> bool {
    let anchor = event_date.and_time(scheduled);
    now >= anchor - offset && now < anchor
}
