// tests/scheduler_transitions.rs
//! Drives the tick state machine against a recording mock device with a
//! synthetic clock. Covers the start/refresh/stop transitions, cooldown
//! suppression, the one-shot failsafe, and failure handling.

use chrono::{NaiveDate, NaiveDateTime};
use tournament_caster::config::SchedulerConfig;
use tournament_caster::device::MockDevice;
use tournament_caster::fingerprint::fingerprint;
use tournament_caster::hours::{DayWindow, HoursTable};
use tournament_caster::notify::{MockAlertSink, NotifierMux};
use tournament_caster::record::{DisplayRecord, EventRecord, EventStatus};
use tournament_caster::scheduler::{CastScheduler, TickAction};
use tournament_caster::state::CastState;

const CAST_URL: &str = "http://localhost/display/";

fn at(time: &str) -> NaiveDateTime {
    // 2026-08-04 is a Tuesday.
    NaiveDate::from_ymd_opt(2026, 8, 4)
        .unwrap()
        .and_time(chrono::NaiveTime::parse_from_str(time, "%H:%M").unwrap())
}

fn record(status: EventStatus, time: &str) -> DisplayRecord {
    let event = EventRecord {
        name: "Tuesday 9-Ball".into(),
        venue: "Bankshot Billiards, Hilliard".into(),
        date: NaiveDate::from_ymd_opt(2026, 8, 4),
        scheduled_time: tournament_caster::record::parse_clock_time(time),
        status,
        participant_count: 24,
        external_reference: "https://digitalpool.com/tournaments/20260804-tuesday-9-ball/".into(),
        observed_at: None,
        display_config: None,
    };
    let should_display = matches!(status, EventStatus::Active | EventStatus::Scheduled);
    DisplayRecord {
        event,
        should_display,
    }
}

fn cfg() -> SchedulerConfig {
    SchedulerConfig {
        cast_url: CAST_URL.to_string(),
        ..Default::default()
    }
}

fn scheduler(device: &MockDevice) -> CastScheduler<&MockDevice> {
    CastScheduler::new(cfg(), device, NotifierMux::noop())
}

/// A state as if a cast started at `started` showing `rec`.
fn showing_state(rec: &DisplayRecord, started: NaiveDateTime) -> CastState {
    let mut s = CastState::default();
    s.begin_session(
        rec.event.external_reference.clone(),
        fingerprint(&rec.event),
        started,
    );
    s
}

#[tokio::test]
async fn idle_to_showing_issues_stop_then_start() {
    let device = MockDevice::new();
    let mut sched = scheduler(&device);
    let rec = record(EventStatus::Active, "19:00");

    let out = sched.tick(at("19:05"), Some(&rec)).await;

    assert_eq!(out.action, TickAction::Started);
    assert!(out.mutated);
    assert_eq!(device.calls(), vec!["stop", &format!("start {CAST_URL}")]);
    assert!(sched.state().is_active);
    assert_eq!(
        sched.state().active_reference.as_deref(),
        Some(rec.event.external_reference.as_str())
    );
    assert!(!sched.state().failsafe_done);
}

#[tokio::test]
async fn unchanged_content_issues_no_commands() {
    let device = MockDevice::new();
    let mut sched = scheduler(&device);
    let rec = record(EventStatus::Active, "19:00");

    sched.tick(at("19:05"), Some(&rec)).await;
    let baseline = device.calls().len();

    for minute in ["19:06", "19:07", "19:08", "19:09"] {
        let out = sched.tick(at(minute), Some(&rec)).await;
        assert_eq!(out.action, TickAction::Idle);
        assert!(!out.mutated);
    }
    assert_eq!(device.calls().len(), baseline);
}

#[tokio::test]
async fn change_inside_cooldown_is_suppressed_then_applied() {
    let device = MockDevice::new();
    let mut sched = scheduler(&device);
    let rec = record(EventStatus::Active, "19:00");

    sched.tick(at("19:00"), Some(&rec)).await;

    let mut updated = rec.clone();
    updated.event.participant_count = 25;

    // 5 minutes in: inside the 10-minute cooldown.
    let out = sched.tick(at("19:05"), Some(&updated)).await;
    assert_eq!(out.action, TickAction::Suppressed);
    assert!(!out.mutated);
    assert_eq!(device.calls().len(), 2); // the initial stop+start only

    // 11 minutes in: exactly one re-cast.
    let out = sched.tick(at("19:11"), Some(&updated)).await;
    assert_eq!(out.action, TickAction::Refreshed);
    assert!(out.mutated);
    assert_eq!(device.calls().len(), 4);
    assert_eq!(
        sched.state().last_fingerprint.as_deref(),
        Some(fingerprint(&updated.event).as_str())
    );
    // The cooldown clock restarted at the re-cast.
    assert_eq!(sched.state().cast_started_at, Some(at("19:11")));
}

#[tokio::test]
async fn showing_to_idle_on_ineligible() {
    let device = MockDevice::new();
    let rec = record(EventStatus::Active, "19:00");
    let mut sched = scheduler(&device).with_state(showing_state(&rec, at("19:00")));

    let mut finished = rec.clone();
    finished.event.status = EventStatus::Completed;
    finished.should_display = false;

    let out = sched.tick(at("22:30"), Some(&finished)).await;

    assert_eq!(out.action, TickAction::Stopped);
    assert!(out.mutated);
    assert_eq!(device.calls(), vec!["stop"]);
    assert_eq!(*sched.state(), CastState::default());
}

#[tokio::test]
async fn missing_record_while_idle_does_nothing() {
    let device = MockDevice::new();
    let mut sched = scheduler(&device);

    let out = sched.tick(at("12:00"), None).await;

    assert_eq!(out.action, TickAction::Idle);
    assert!(!out.mutated);
    assert!(device.calls().is_empty());
}

#[tokio::test]
async fn failsafe_unchanged_content_marks_done_without_commands() {
    // Cast began at the event's scheduled start, 40 minutes ago.
    let device = MockDevice::new();
    let rec = record(EventStatus::Active, "19:00");
    let mut sched = scheduler(&device).with_state(showing_state(&rec, at("19:00")));

    let out = sched.tick(at("19:40"), Some(&rec)).await;

    assert_eq!(out.action, TickAction::Idle);
    assert!(out.mutated);
    assert!(sched.state().failsafe_done);
    assert!(device.calls().is_empty());
}

#[tokio::test]
async fn failsafe_fires_once_per_session() {
    let device = MockDevice::new();
    let rec = record(EventStatus::Active, "19:00");
    let mut sched = scheduler(&device).with_state(showing_state(&rec, at("19:00")));

    let out = sched.tick(at("19:40"), Some(&rec)).await;
    assert!(out.mutated);

    // Many more ticks past the anchor: the check never reruns.
    for minute in ["19:41", "20:10", "21:00"] {
        let out = sched.tick(at(minute), Some(&rec)).await;
        assert_eq!(out.action, TickAction::Idle);
        assert!(!out.mutated);
    }
    assert!(device.calls().is_empty());
}

#[tokio::test]
async fn failsafe_forces_recast_through_cooldown() {
    let device = MockDevice::new();
    let rec = record(EventStatus::Active, "19:00");
    // Session started with different content; the last re-cast was only 5
    // minutes ago, so the ordinary refresh path is still cooling down.
    let mut stale = showing_state(&rec, at("19:35"));
    stale.last_fingerprint = Some("stale".into());
    let mut sched = scheduler(&device).with_state(stale);

    let out = sched.tick(at("19:40"), Some(&rec)).await;

    assert_eq!(out.action, TickAction::Refreshed);
    assert!(out.mutated);
    assert_eq!(device.calls(), vec!["stop", &format!("start {CAST_URL}")]);
    assert!(sched.state().failsafe_done);
    assert_eq!(
        sched.state().last_fingerprint.as_deref(),
        Some(fingerprint(&rec.event).as_str())
    );
}

#[tokio::test]
async fn command_failure_leaves_state_for_retry() {
    let device = MockDevice::new();
    let mut sched = scheduler(&device);
    let rec = record(EventStatus::Active, "19:00");

    device.inject_failures(1);
    let out = sched.tick(at("19:00"), Some(&rec)).await;
    assert_eq!(out.action, TickAction::CommandFailed);
    assert!(!out.mutated);
    assert!(!sched.state().is_active);

    // Next tick retries the same transition and succeeds.
    let out = sched.tick(at("19:01"), Some(&rec)).await;
    assert_eq!(out.action, TickAction::Started);
    assert!(sched.state().is_active);
}

#[tokio::test]
async fn third_consecutive_failure_raises_one_alert() {
    let device = MockDevice::new();
    let (sink, sent) = MockAlertSink::new();
    let mut sched = CastScheduler::new(cfg(), &device, NotifierMux::with_sinks(vec![Box::new(sink)]));
    let rec = record(EventStatus::Active, "19:00");

    device.inject_failures(4);
    for minute in ["19:00", "19:01", "19:02", "19:03"] {
        sched.tick(at(minute), Some(&rec)).await;
    }

    let alerts = sent.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].title.contains("unresponsive"));
}

#[tokio::test]
async fn early_start_window_beats_closed_hours() {
    let device = MockDevice::new();
    let mut config = cfg();
    // Venue opens Tuesday 11:00; the event is a 10:15 morning special.
    config.hours = HoursTable {
        tue: vec![DayWindow {
            open: 660,
            close: 1380,
        }],
        ..Default::default()
    };
    let mut sched = CastScheduler::new(config, &device, NotifierMux::noop());
    let rec = record(EventStatus::Scheduled, "10:15");

    // 08:00: before the early-start window, venue closed, nothing happens.
    let out = sched.tick(at("08:00"), Some(&rec)).await;
    assert_eq!(out.action, TickAction::Idle);
    assert!(device.calls().is_empty());

    // 09:30: inside [09:15, 10:15), display comes up despite closed doors.
    let out = sched.tick(at("09:30"), Some(&rec)).await;
    assert_eq!(out.action, TickAction::Started);
    assert!(sched.state().is_active);
}
