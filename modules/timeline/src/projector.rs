//! Point-in-time replay of a subscription's event stream.
//!
//! Pure functions: identical input always produces identical output, with no
//! caching side effects visible to callers.

use crate::models::{EventDetail, SubscriptionEvent, SubscriptionState, SubscriptionStatus};
use chrono::{DateTime, Utc};

/// Return the events sorted by the canonical `(effective_date,
/// total_ordering)` key.
///
/// The key is a total order: orderings are unique within a version, so no
/// two events compare equal and the sort is deterministic.
pub fn canonically_sorted(events: &[SubscriptionEvent]) -> Vec<SubscriptionEvent> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(SubscriptionEvent::sort_key);
    sorted
}

/// Replay `events` as of `as_of` and reconstruct the subscription state.
///
/// Events with `effective_date <= as_of` are applied in canonical order:
/// CREATE/TRANSFER set the initial plan, phase, and start date; CHANGE swaps
/// the plan keeping the start date; PHASE advances the phase without
/// changing the plan; CANCEL/UNCANCEL and PAUSE/RESUME toggle status.
///
/// Before the first applied event the subscription either does not exist yet
/// (`None` — no CREATE/TRANSFER anywhere in the stream) or is PENDING with a
/// future-dated start.
pub fn project(events: &[SubscriptionEvent], as_of: DateTime<Utc>) -> Option<SubscriptionState> {
    let sorted = canonically_sorted(events);
    let mut state: Option<SubscriptionState> = None;

    for event in sorted.iter().filter(|e| e.effective_date <= as_of) {
        match &event.detail {
            EventDetail::Create {
                plan_name,
                phase_name,
                ..
            }
            | EventDetail::Transfer {
                plan_name,
                phase_name,
                ..
            } => {
                state = Some(SubscriptionState {
                    plan_name: plan_name.clone(),
                    phase_name: phase_name.clone(),
                    status: SubscriptionStatus::Active,
                    start_date: event.effective_date,
                    cancel_date: None,
                });
            }
            EventDetail::Change {
                plan_name,
                phase_name,
                ..
            } => {
                if let Some(s) = state.as_mut() {
                    s.plan_name = plan_name.clone();
                    s.phase_name = phase_name.clone();
                }
            }
            EventDetail::Phase { phase_name } => {
                if let Some(s) = state.as_mut() {
                    s.phase_name = Some(phase_name.clone());
                }
            }
            EventDetail::Cancel => {
                if let Some(s) = state.as_mut() {
                    s.status = SubscriptionStatus::Cancelled;
                    s.cancel_date = Some(event.effective_date);
                }
            }
            EventDetail::Uncancel => {
                if let Some(s) = state.as_mut() {
                    s.status = SubscriptionStatus::Active;
                    s.cancel_date = None;
                }
            }
            EventDetail::Pause => {
                if let Some(s) = state.as_mut() {
                    s.status = SubscriptionStatus::Paused;
                }
            }
            EventDetail::Resume => {
                if let Some(s) = state.as_mut() {
                    s.status = SubscriptionStatus::Active;
                }
            }
        }
    }

    if state.is_some() {
        return state;
    }

    // Nothing applied yet: a future-dated creation is legal and shows up as
    // a PENDING subscription.
    sorted.iter().find_map(|event| match &event.detail {
        EventDetail::Create {
            plan_name,
            phase_name,
            ..
        }
        | EventDetail::Transfer {
            plan_name,
            phase_name,
            ..
        } => Some(SubscriptionState {
            plan_name: plan_name.clone(),
            phase_name: phase_name.clone(),
            status: SubscriptionStatus::Pending,
            start_date: event.effective_date,
            cancel_date: None,
        }),
        _ => None,
    })
}
