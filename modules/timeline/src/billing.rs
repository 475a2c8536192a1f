//! Projection of an event stream into the ordered billing-event sequence
//! consumed by invoicing.
//!
//! The sequence is derived fresh on every call — billing events are a view,
//! never stored. Iteration is lazy and finite; the same inputs always
//! re-derive the same sequence because resolution and replay are pure.

use crate::models::{BillingEvent, EventDetail, SubscriptionEvent};
use crate::projector::canonically_sorted;
use crate::validation::TimelineValidationError;
use catalog_core::{BillingPeriod, CatalogResolver, CatalogVersion, PlanPhase};
use chrono::{DateTime, Utc};

/// Projects billing events against one tenant's catalog versions.
pub struct BillingEventProjector<'a> {
    resolver: CatalogResolver<'a>,
}

impl<'a> BillingEventProjector<'a> {
    pub fn new(versions: &'a [CatalogVersion]) -> Self {
        Self {
            resolver: CatalogResolver::new(versions),
        }
    }

    /// Billing events for transitions effective within `[from, to]`.
    ///
    /// Events before `from` are still replayed to establish context (current
    /// plan, last commitment date) but yield no output. Output ordering is
    /// strictly `(effective_date, total_ordering)`.
    pub fn project_billing_events(
        &'a self,
        events: &[SubscriptionEvent],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BillingEventIter<'a> {
        BillingEventIter {
            resolver: &self.resolver,
            events: canonically_sorted(events).into_iter(),
            from,
            to,
            context: ReplayContext::default(),
        }
    }
}

/// Rolling replay state: which plan/phase the subscription is on and when it
/// last committed to the plan (CREATE or CHANGE date — the
/// `subscription_change_date` fed to catalog resolution).
#[derive(Default)]
struct ReplayContext {
    plan_name: Option<String>,
    phase_name: Option<String>,
    change_date: Option<DateTime<Utc>>,
    bill_cycle_day_local: u8,
}

/// Lazy billing-event sequence. Not restartable once consumed; call
/// [`BillingEventProjector::project_billing_events`] again to re-derive.
pub struct BillingEventIter<'a> {
    resolver: &'a CatalogResolver<'a>,
    events: std::vec::IntoIter<SubscriptionEvent>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    context: ReplayContext,
}

impl Iterator for BillingEventIter<'_> {
    type Item = Result<BillingEvent, TimelineValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let event = self.events.next()?;

            match &event.detail {
                EventDetail::Create {
                    plan_name,
                    phase_name,
                    bill_cycle_day_local,
                    ..
                }
                | EventDetail::Transfer {
                    plan_name,
                    phase_name,
                    bill_cycle_day_local,
                } => {
                    self.context.plan_name = Some(plan_name.clone());
                    self.context.phase_name = phase_name.clone();
                    self.context.change_date = Some(event.effective_date);
                    self.context.bill_cycle_day_local = *bill_cycle_day_local;
                }
                EventDetail::Change {
                    plan_name,
                    phase_name,
                    ..
                } => {
                    self.context.plan_name = Some(plan_name.clone());
                    self.context.phase_name = phase_name.clone();
                    self.context.change_date = Some(event.effective_date);
                }
                EventDetail::Phase { phase_name } => {
                    self.context.phase_name = Some(phase_name.clone());
                }
                EventDetail::Cancel
                | EventDetail::Pause
                | EventDetail::Resume
                | EventDetail::Uncancel => {}
            }

            if event.effective_date < self.from || event.effective_date > self.to {
                continue;
            }
            return Some(self.emit(&event));
        }
    }
}

impl BillingEventIter<'_> {
    fn emit(&self, event: &SubscriptionEvent) -> Result<BillingEvent, TimelineValidationError> {
        let (plan_name, phase) = self.resolved_phase(event)?;

        // CANCEL/PAUSE are terminal for billing: null prices tell the
        // invoicing consumer that billing stops at this instant.
        if matches!(event.detail, EventDetail::Cancel | EventDetail::Pause) {
            return Ok(BillingEvent {
                subscription_id: event.subscription_id,
                effective_date: event.effective_date,
                total_ordering: event.total_ordering,
                plan_name,
                phase_name: phase.name,
                fixed_price: None,
                recurring_price: None,
                billing_period: BillingPeriod::NoBillingPeriod,
                bill_cycle_day_local: self.context.bill_cycle_day_local,
                transition_type: event.detail.event_type(),
            });
        }

        let mut fixed_price = phase.fixed_price;
        let mut recurring_price = phase.recurring_price;
        if let EventDetail::Create {
            price_overrides: Some(overrides),
            ..
        }
        | EventDetail::Change {
            price_overrides: Some(overrides),
            ..
        } = &event.detail
        {
            if overrides.fixed_price.is_some() {
                fixed_price = overrides.fixed_price;
            }
            if overrides.recurring_price.is_some() {
                recurring_price = overrides.recurring_price;
            }
        }

        Ok(BillingEvent {
            subscription_id: event.subscription_id,
            effective_date: event.effective_date,
            total_ordering: event.total_ordering,
            plan_name,
            phase_name: phase.name,
            fixed_price,
            recurring_price,
            billing_period: phase.billing_period,
            bill_cycle_day_local: self.context.bill_cycle_day_local,
            transition_type: event.detail.event_type(),
        })
    }

    /// Resolve the context plan at the event's date and pick the phase the
    /// context points at (or the plan's initial phase).
    ///
    /// `requested_date` is the event's own effective date;
    /// `subscription_change_date` is the last CREATE/CHANGE date, so
    /// grandfathered pricing survives PHASE/RESUME transitions.
    fn resolved_phase(
        &self,
        event: &SubscriptionEvent,
    ) -> Result<(String, PlanPhase), TimelineValidationError> {
        let (Some(plan_name), Some(change_date)) =
            (self.context.plan_name.clone(), self.context.change_date)
        else {
            return Err(TimelineValidationError::MissingPlanContext {
                event_id: event.id,
            });
        };

        let resolved = self
            .resolver
            .resolve_plan(&plan_name, event.effective_date, change_date)
            .map_err(|source| TimelineValidationError::UnresolvablePlan {
                event_id: event.id,
                plan_name: plan_name.clone(),
                at: event.effective_date,
                source,
            })?;

        let phase = match self.context.phase_name.as_deref() {
            Some(name) => {
                resolved
                    .find_phase(name)
                    .ok_or_else(|| TimelineValidationError::UnknownPhase {
                        event_id: event.id,
                        plan_name: plan_name.clone(),
                        phase_name: name.to_string(),
                    })?
            }
            None => resolved.initial_phase().ok_or_else(|| {
                TimelineValidationError::PlanHasNoPhases {
                    event_id: event.id,
                    plan_name: plan_name.clone(),
                }
            })?,
        };

        Ok((plan_name, phase.clone()))
    }
}
