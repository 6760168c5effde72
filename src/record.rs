// src/record.rs
//! Event records as written by the upstream producer, plus tolerant parsing
//! of the single overwritten JSON slot the scheduler reads each tick.
//!
//! The producer's shape drifted over time (legacy key names, "7:00 PM" style
//! times, `%Y/%m/%d` dates), so deserialization accepts every spelling that
//! has appeared in the wild and degrades field-by-field instead of failing.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::fs;

/// Lifecycle state of one candidate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Scheduled,
    Active,
    Completed,
    Unknown,
}

impl EventStatus {
    /// Map the producer's free-form status strings onto the four states.
    /// Unrecognized input is `Unknown`, never an error.
    pub fn parse(s: &str) -> Self {
        let t = s.trim();
        const ACTIVE: [&str; 4] = ["In Progress", "Live", "Active", "Playing"];
        const SCHEDULED: [&str; 3] = ["Upcoming", "Scheduled", "Future"];
        const COMPLETED: [&str; 4] = ["Completed", "Finished", "Final", "Ended"];
        if ACTIVE.iter().any(|k| t.eq_ignore_ascii_case(k)) {
            EventStatus::Active
        } else if SCHEDULED.iter().any(|k| t.eq_ignore_ascii_case(k)) {
            EventStatus::Scheduled
        } else if COMPLETED.iter().any(|k| t.eq_ignore_ascii_case(k)) {
            EventStatus::Completed
        } else {
            EventStatus::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "Scheduled",
            EventStatus::Active => "Active",
            EventStatus::Completed => "Completed",
            EventStatus::Unknown => "Unknown",
        }
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Unknown
    }
}

impl Serialize for EventStatus {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventStatus {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(de)?;
        Ok(s.as_deref().map(EventStatus::parse).unwrap_or_default())
    }
}

/// One candidate occurrence of the monitored activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(alias = "tournament_name", default, deserialize_with = "null_to_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub venue: String,
    /// Occurrence day by the producer's convention; may roll past local
    /// midnight. `None` when the slot carries the "nothing to show" record.
    #[serde(default, with = "flexible_date")]
    pub date: Option<NaiveDate>,
    #[serde(alias = "start_time", default, with = "flexible_time")]
    pub scheduled_time: Option<NaiveTime>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(alias = "player_count", default)]
    pub participant_count: u32,
    /// Stable identifier/URL used for idempotence and re-verification.
    #[serde(alias = "tournament_url", default, deserialize_with = "null_to_empty")]
    pub external_reference: String,
    #[serde(alias = "last_updated", default, with = "flexible_timestamp")]
    pub observed_at: Option<NaiveDateTime>,
    /// Auxiliary display config (payout tables etc.); opaque here but part
    /// of what the screen renders, so the fingerprint covers it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_config: Option<serde_json::Value>,
}

/// The slot the producer writes: an [`EventRecord`] plus the precomputed
/// display flag from the selector pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRecord {
    #[serde(flatten)]
    pub event: EventRecord,
    #[serde(alias = "display_tournament", default)]
    pub should_display: bool,
}

/// Read the record slot. Absence of the file is a valid "no event" state;
/// unparseable content is logged and treated the same way.
pub async fn load_display_record(path: &Path) -> Option<DisplayRecord> {
    let raw = match fs::read_to_string(path).await {
        Ok(s) => s,
        Err(_) => return None,
    };
    match serde_json::from_str::<DisplayRecord>(&raw) {
        Ok(r) => Some(r),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "unreadable record slot, treating as no event");
            None
        }
    }
}

/// Extract a clock time from producer strings like "7:00 PM", "7 PM",
/// "19:00" or "Wed, Nov 26, 2025 7:00 PM (America/New_York)".
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    static RE_AMPM: OnceCell<Regex> = OnceCell::new();
    let re = RE_AMPM.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,2})(?::(\d{2}))?\s*([AP])\.?M\.?").unwrap()
    });

    if let Some(c) = re.captures(raw) {
        let mut hour: u32 = c[1].parse().ok()?;
        let minute: u32 = c.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let pm = c[3].eq_ignore_ascii_case("p");
        if hour == 12 {
            hour = 0;
        }
        if pm {
            hour += 12;
        }
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    let t = raw.trim();
    for fmt in ["%H:%M:%S", "%H:%M"] {
        if let Ok(parsed) = NaiveTime::parse_from_str(t, fmt) {
            return Some(parsed);
        }
    }
    None
}

/// The producer writes explicit `null`s into the "nothing to show" record.
fn null_to_empty<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    for fmt in ["%Y/%m/%d", "%Y-%m-%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(t, fmt) {
            return Some(parsed);
        }
    }
    None
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let t = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(parsed);
        }
    }
    chrono::DateTime::parse_from_rfc3339(t)
        .ok()
        .map(|dt| dt.naive_local())
}

mod flexible_date {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Option<NaiveDate>, ser: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => ser.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveDate>, D::Error> {
        let s = Option::<String>::deserialize(de)?;
        Ok(s.as_deref().and_then(parse_calendar_date))
    }
}

mod flexible_time {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Option<NaiveTime>, ser: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(t) => ser.serialize_str(&t.format("%H:%M").to_string()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveTime>, D::Error> {
        let s = Option::<String>::deserialize(de)?;
        Ok(s.as_deref().and_then(parse_clock_time))
    }
}

mod flexible_timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        v: &Option<NaiveDateTime>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match v {
            Some(ts) => ser.serialize_str(&ts.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let s = Option::<String>::deserialize(de)?;
        Ok(s.as_deref().and_then(parse_timestamp))
    }
}
