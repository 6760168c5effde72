// tests/selector_priority.rs
use tournament_caster::record::{EventRecord, EventStatus};
use tournament_caster::selector::{select, DisplayDecision};

fn ev(name: &str, status: EventStatus, time: Option<&str>) -> EventRecord {
    EventRecord {
        name: name.to_string(),
        venue: "Bankshot Billiards, Hilliard".into(),
        date: chrono::NaiveDate::from_ymd_opt(2026, 8, 4),
        scheduled_time: time.and_then(tournament_caster::record::parse_clock_time),
        status,
        participant_count: 12,
        external_reference: format!("https://digitalpool.com/tournaments/{name}"),
        observed_at: None,
        display_config: None,
    }
}

#[test]
fn two_active_latest_start_wins() {
    // Scenario: 19:00 and 20:00 both in progress; the 20:00 one is what the
    // room cares about.
    let d = select(&[
        ev("Early 8-Ball", EventStatus::Active, Some("7:00 PM")),
        ev("Late 9-Ball", EventStatus::Active, Some("8:00 PM")),
    ]);
    assert_eq!(d.record.unwrap().name, "Late 9-Ball");
    assert!(d.should_display);
}

#[test]
fn no_active_earliest_scheduled_wins() {
    let d = select(&[
        ev("Second", EventStatus::Scheduled, Some("6:00 PM")),
        ev("First", EventStatus::Scheduled, Some("5:00 PM")),
    ]);
    assert_eq!(d.record.unwrap().name, "First");
    assert!(d.should_display);
}

#[test]
fn single_completed_yields_none() {
    let d = select(&[ev("Over", EventStatus::Completed, Some("12:00"))]);
    assert_eq!(d, DisplayDecision::none());
}

#[test]
fn empty_input_yields_none() {
    assert_eq!(select(&[]), DisplayDecision::none());
}

#[test]
fn active_beats_scheduled_regardless_of_time() {
    let d = select(&[
        ev("Tonight", EventStatus::Scheduled, Some("11:00 PM")),
        ev("Running", EventStatus::Active, Some("1:00 PM")),
    ]);
    assert_eq!(d.record.unwrap().name, "Running");
}

#[test]
fn lone_far_future_scheduled_is_still_picked() {
    // "Too early to show" is the cast scheduler's call, not the selector's.
    let d = select(&[ev("Midnight Madness", EventStatus::Scheduled, Some("11:45 PM"))]);
    assert_eq!(d.record.unwrap().name, "Midnight Madness");
    assert!(d.should_display);
}

#[test]
fn active_tie_broken_by_greatest_name() {
    let d = select(&[
        ev("Alpha", EventStatus::Active, Some("8:00 PM")),
        ev("Bravo", EventStatus::Active, Some("8:00 PM")),
    ]);
    assert_eq!(d.record.unwrap().name, "Bravo");
}

#[test]
fn selection_is_permutation_invariant() {
    let base = vec![
        ev("One", EventStatus::Scheduled, Some("5:00 PM")),
        ev("Two", EventStatus::Active, Some("7:00 PM")),
        ev("Three", EventStatus::Active, Some("7:00 PM")),
        ev("Four", EventStatus::Completed, Some("1:00 PM")),
        ev("Five", EventStatus::Scheduled, None),
    ];
    let expected = select(&base);
    assert!(expected.record.is_some());

    // Rotations plus a reversal cover enough orderings to catch an unstable
    // tie-break.
    let mut perm = base.clone();
    for _ in 0..base.len() {
        perm.rotate_left(1);
        assert_eq!(select(&perm), expected);
    }
    perm.reverse();
    assert_eq!(select(&perm), expected);
}
