// src/selector.rs
//! # Selector
//! Pure, testable logic that maps today's candidate events to at most one
//! record worth displaying. No I/O, no clock; suitable for unit tests and
//! offline replay.
//!
//! Policy: the latest-started Active event wins (earlier ones at the same
//! venue are assumed background or finishing up); with nothing Active, the
//! first not-yet-completed event of the day is shown. Whether it is "too
//! early" to put it on screen is the cast scheduler's call, not ours.

use chrono::NaiveTime;

use crate::record::{EventRecord, EventStatus};

/// Output of [`select`]: at most one record, with the derived display flag.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayDecision {
    pub record: Option<EventRecord>,
    pub should_display: bool,
}

impl DisplayDecision {
    pub fn none() -> Self {
        Self {
            record: None,
            should_display: false,
        }
    }

    fn of(record: &EventRecord) -> Self {
        Self {
            should_display: matches!(record.status, EventStatus::Active | EventStatus::Scheduled),
            record: Some(record.clone()),
        }
    }
}

/// Pick the single event worth displaying from today's candidates.
///
/// The ordering is total (time, then name, then reference), so the result is
/// invariant under permutation of the input.
pub fn select(candidates: &[EventRecord]) -> DisplayDecision {
    let active = candidates
        .iter()
        .filter(|c| c.status == EventStatus::Active)
        .max_by_key(|c| latest_key(c));

    if let Some(pick) = active {
        return DisplayDecision::of(pick);
    }

    let first_pending = candidates
        .iter()
        .filter(|c| c.status != EventStatus::Completed)
        .min_by_key(|c| earliest_key(c));

    match first_pending {
        Some(pick) => DisplayDecision::of(pick),
        None => DisplayDecision::none(),
    }
}

/// Latest start wins; a missing time counts as start of day, so it loses to
/// any explicit time. Ties fall to the lexicographically greatest name.
fn latest_key<'a>(c: &&'a EventRecord) -> (NaiveTime, &'a str, &'a str) {
    let c: &'a EventRecord = c;
    (
        c.scheduled_time.unwrap_or(NaiveTime::MIN),
        c.name.as_str(),
        c.external_reference.as_str(),
    )
}

/// Earliest start wins; records with no time sort behind every timed one.
fn earliest_key<'a>(c: &&'a EventRecord) -> (bool, NaiveTime, &'a str, &'a str) {
    let c: &'a EventRecord = c;
    (
        c.scheduled_time.is_none(),
        c.scheduled_time.unwrap_or(NaiveTime::MIN),
        c.name.as_str(),
        c.external_reference.as_str(),
    )
}
