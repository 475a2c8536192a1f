//! Replay tests for the subscription projector: canonical ordering,
//! determinism, and the full lifecycle state machine.

mod common;

use common::*;
use timeline_rs::{project, EventDetail, SubscriptionStatus};
use uuid::Uuid;

fn ids() -> (Uuid, Uuid) {
    (Uuid::new_v4(), Uuid::new_v4())
}

#[test]
fn projection_is_deterministic() {
    let (sub, bundle) = ids();
    let events = vec![
        event(sub, bundle, 1, date(2011, 1, 1), create_detail("pistol-monthly")),
        event(sub, bundle, 2, date(2011, 3, 1), change_detail("shotgun-monthly")),
        event(sub, bundle, 3, date(2011, 6, 1), EventDetail::Cancel),
    ];

    let first = project(&events, date(2011, 4, 1));
    let second = project(&events, date(2011, 4, 1));
    assert_eq!(first, second);
    assert_eq!(first.unwrap().plan_name, "shotgun-monthly");
}

#[test]
fn lifecycle_walk() {
    let (sub, bundle) = ids();
    let events = vec![
        event(sub, bundle, 1, date(2011, 1, 1), create_detail("pistol-monthly")),
        event(
            sub,
            bundle,
            2,
            date(2011, 2, 1),
            EventDetail::Phase {
                phase_name: "pistol-monthly-evergreen".to_string(),
            },
        ),
        event(sub, bundle, 3, date(2011, 3, 1), EventDetail::Pause),
        event(sub, bundle, 4, date(2011, 4, 1), EventDetail::Resume),
        event(sub, bundle, 5, date(2011, 5, 1), EventDetail::Cancel),
    ];

    let at_start = project(&events, date(2011, 1, 15)).unwrap();
    assert_eq!(at_start.status, SubscriptionStatus::Active);
    assert_eq!(at_start.phase_name, None);
    assert_eq!(at_start.start_date, date(2011, 1, 1));

    let after_phase = project(&events, date(2011, 2, 15)).unwrap();
    assert_eq!(
        after_phase.phase_name.as_deref(),
        Some("pistol-monthly-evergreen")
    );

    let paused = project(&events, date(2011, 3, 15)).unwrap();
    assert_eq!(paused.status, SubscriptionStatus::Paused);

    let resumed = project(&events, date(2011, 4, 15)).unwrap();
    assert_eq!(resumed.status, SubscriptionStatus::Active);

    let cancelled = project(&events, date(2011, 6, 1)).unwrap();
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    assert_eq!(cancelled.cancel_date, Some(date(2011, 5, 1)));
    // Start date survives the whole lifecycle.
    assert_eq!(cancelled.start_date, date(2011, 1, 1));
}

#[test]
fn change_keeps_start_date() {
    let (sub, bundle) = ids();
    let events = vec![
        event(sub, bundle, 1, date(2011, 1, 1), create_detail("pistol-monthly")),
        event(sub, bundle, 2, date(2011, 3, 1), change_detail("shotgun-monthly")),
    ];

    let state = project(&events, date(2011, 3, 2)).unwrap();
    assert_eq!(state.plan_name, "shotgun-monthly");
    assert_eq!(state.start_date, date(2011, 1, 1));
}

#[test]
fn ties_on_effective_date_break_by_total_ordering() {
    let (sub, bundle) = ids();
    // Two changes landing at the same instant: the later insertion wins.
    let events = vec![
        event(sub, bundle, 1, date(2011, 1, 1), create_detail("pistol-monthly")),
        event(sub, bundle, 3, date(2011, 2, 1), change_detail("pistol-monthly")),
        event(sub, bundle, 2, date(2011, 2, 1), change_detail("shotgun-monthly")),
    ];

    let state = project(&events, date(2011, 2, 2)).unwrap();
    assert_eq!(state.plan_name, "pistol-monthly");
}

#[test]
fn past_dated_insertion_sorts_by_effective_date_first() {
    let (sub, bundle) = ids();
    // A repair appended an event (high ordering) dated before the change:
    // effective date dominates the canonical order.
    let events = vec![
        event(sub, bundle, 1, date(2011, 1, 1), create_detail("pistol-monthly")),
        event(sub, bundle, 2, date(2011, 3, 1), change_detail("shotgun-monthly")),
        event(sub, bundle, 3, date(2011, 2, 1), EventDetail::Pause),
    ];

    let state = project(&events, date(2011, 2, 15)).unwrap();
    assert_eq!(state.status, SubscriptionStatus::Paused);
    assert_eq!(state.plan_name, "pistol-monthly");

    let later = project(&events, date(2011, 3, 15)).unwrap();
    assert_eq!(later.plan_name, "shotgun-monthly");
}

#[test]
fn future_dated_creation_is_pending() {
    let (sub, bundle) = ids();
    let events = vec![event(
        sub,
        bundle,
        1,
        date(2011, 6, 1),
        create_detail("pistol-monthly"),
    )];

    let state = project(&events, date(2011, 1, 1)).unwrap();
    assert_eq!(state.status, SubscriptionStatus::Pending);
    assert_eq!(state.start_date, date(2011, 6, 1));
    assert_eq!(state.plan_name, "pistol-monthly");
}

#[test]
fn stream_without_creation_does_not_exist() {
    let (sub, bundle) = ids();
    assert_eq!(project(&[], date(2011, 1, 1)), None);

    let events = vec![event(sub, bundle, 1, date(2011, 6, 1), EventDetail::Cancel)];
    assert_eq!(project(&events, date(2011, 1, 1)), None);
}

#[test]
fn uncancel_restores_active_state() {
    let (sub, bundle) = ids();
    let events = vec![
        event(sub, bundle, 1, date(2011, 1, 1), create_detail("pistol-monthly")),
        event(sub, bundle, 2, date(2011, 5, 1), EventDetail::Cancel),
        event(sub, bundle, 3, date(2011, 5, 10), EventDetail::Uncancel),
    ];

    let cancelled = project(&events, date(2011, 5, 5)).unwrap();
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);

    let restored = project(&events, date(2011, 5, 11)).unwrap();
    assert_eq!(restored.status, SubscriptionStatus::Active);
    assert_eq!(restored.cancel_date, None);
}
