//! Timeline validation applied to the candidate event set of a repair.
//!
//! Two classes of rule:
//!
//! 1. No two simultaneous terminal transitions — two CANCEL events sharing
//!    one effective instant describe an impossible lifecycle.
//! 2. Every plan reference (CREATE/TRANSFER/CHANGE/PHASE) must resolve
//!    against the catalog at the event's own effective date, and a named
//!    phase must exist in the resolved plan.
//!
//! Errors always name the offending event so the caller can surface it
//! verbatim.

use crate::models::{EventDetail, SubscriptionEvent};
use catalog_core::{CatalogError, CatalogResolver};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimelineValidationError {
    #[error("events {first} and {second} are simultaneous terminal transitions at {at}")]
    SimultaneousTerminalTransitions {
        first: Uuid,
        second: Uuid,
        at: DateTime<Utc>,
    },

    #[error("event {event_id} references plan '{plan_name}' unresolvable at {at}: {source}")]
    UnresolvablePlan {
        event_id: Uuid,
        plan_name: String,
        at: DateTime<Utc>,
        source: CatalogError,
    },

    #[error("event {event_id} names phase '{phase_name}' missing from plan '{plan_name}'")]
    UnknownPhase {
        event_id: Uuid,
        plan_name: String,
        phase_name: String,
    },

    #[error("plan '{plan_name}' referenced by event {event_id} has no phases")]
    PlanHasNoPhases { event_id: Uuid, plan_name: String },

    #[error("event {event_id} has no preceding CREATE or CHANGE to supply a plan")]
    MissingPlanContext { event_id: Uuid },
}

/// Validate a canonically sorted event set against the catalog.
///
/// Total over well-formed input: a stream that passed validation when it was
/// committed will pass again unless the catalog itself changed underneath
/// it.
pub fn validate_timeline(
    sorted_events: &[SubscriptionEvent],
    resolver: &CatalogResolver<'_>,
) -> Result<(), TimelineValidationError> {
    let mut last_cancel: Option<&SubscriptionEvent> = None;
    // (plan, date of the CREATE/CHANGE that committed to it)
    let mut plan_context: Option<(String, DateTime<Utc>)> = None;

    for event in sorted_events {
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
            }
            | EventDetail::Change {
                plan_name,
                phase_name,
                ..
            } => {
                check_plan_reference(
                    resolver,
                    event,
                    plan_name,
                    phase_name.as_deref(),
                    event.effective_date,
                )?;
                plan_context = Some((plan_name.clone(), event.effective_date));
            }
            EventDetail::Phase { phase_name } => {
                let Some((plan_name, change_date)) = plan_context.as_ref() else {
                    return Err(TimelineValidationError::MissingPlanContext {
                        event_id: event.id,
                    });
                };
                check_phase_reference(resolver, event, plan_name, phase_name, *change_date)?;
            }
            EventDetail::Cancel => {
                if let Some(previous) = last_cancel {
                    if previous.effective_date == event.effective_date {
                        return Err(
                            TimelineValidationError::SimultaneousTerminalTransitions {
                                first: previous.id,
                                second: event.id,
                                at: event.effective_date,
                            },
                        );
                    }
                }
                last_cancel = Some(event);
            }
            EventDetail::Pause | EventDetail::Resume | EventDetail::Uncancel => {}
        }
    }

    Ok(())
}

/// CREATE/TRANSFER/CHANGE commit to the plan on their own effective date, so
/// requested date and change date coincide and resolution hits the single
/// version effective at that instant.
fn check_plan_reference(
    resolver: &CatalogResolver<'_>,
    event: &SubscriptionEvent,
    plan_name: &str,
    phase_name: Option<&str>,
    at: DateTime<Utc>,
) -> Result<(), TimelineValidationError> {
    let resolved = resolver.resolve_plan(plan_name, at, at).map_err(|source| {
        TimelineValidationError::UnresolvablePlan {
            event_id: event.id,
            plan_name: plan_name.to_string(),
            at,
            source,
        }
    })?;

    match phase_name {
        Some(name) => {
            resolved
                .find_phase(name)
                .ok_or_else(|| TimelineValidationError::UnknownPhase {
                    event_id: event.id,
                    plan_name: plan_name.to_string(),
                    phase_name: name.to_string(),
                })?;
        }
        None => {
            resolved
                .initial_phase()
                .ok_or_else(|| TimelineValidationError::PlanHasNoPhases {
                    event_id: event.id,
                    plan_name: plan_name.to_string(),
                })?;
        }
    }
    Ok(())
}

/// PHASE transitions keep the plan of the preceding CREATE/CHANGE, so the
/// plan is re-resolved with that commitment date (grandfathering applies).
fn check_phase_reference(
    resolver: &CatalogResolver<'_>,
    event: &SubscriptionEvent,
    plan_name: &str,
    phase_name: &str,
    change_date: DateTime<Utc>,
) -> Result<(), TimelineValidationError> {
    let resolved = resolver
        .resolve_plan(plan_name, event.effective_date, change_date)
        .map_err(|source| TimelineValidationError::UnresolvablePlan {
            event_id: event.id,
            plan_name: plan_name.to_string(),
            at: event.effective_date,
            source,
        })?;

    resolved
        .find_phase(phase_name)
        .ok_or(TimelineValidationError::UnknownPhase {
            event_id: event.id,
            plan_name: plan_name.to_string(),
            phase_name: phase_name.to_string(),
        })?;
    Ok(())
}
