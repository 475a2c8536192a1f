//! Temporal plan resolution across dated catalog versions.
//!
//! Resolution answers: "which version of plan X prices this subscription on
//! this date?" Two dates drive the answer — the date a price is needed for
//! (`requested_date`) and the date the subscription last committed to the
//! plan (`subscription_change_date`). They differ whenever a catalog version
//! landed between the subscription's commitment and the query.

use crate::error::CatalogError;
use crate::model::{CatalogVersion, PlanDefinition, PlanPhase};
use chrono::{DateTime, Utc};

/// A plan resolved against one concrete catalog version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlan<'a> {
    /// Effective date of the catalog version that supplied the plan.
    pub version_effective_date: DateTime<Utc>,
    pub plan: &'a PlanDefinition,
}

impl<'a> ResolvedPlan<'a> {
    pub fn initial_phase(&self) -> Option<&'a PlanPhase> {
        self.plan.initial_phase()
    }

    pub fn find_phase(&self, phase_name: &str) -> Option<&'a PlanPhase> {
        self.plan.find_phase(phase_name)
    }
}

/// Resolver over a tenant's catalog versions.
///
/// Construction sorts the versions by effective date; the borrowed slice is
/// never mutated. All resolution methods are pure.
pub struct CatalogResolver<'a> {
    /// Ascending by `effective_date`.
    versions: Vec<&'a CatalogVersion>,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(versions: &'a [CatalogVersion]) -> Self {
        let mut sorted: Vec<&CatalogVersion> = versions.iter().collect();
        sorted.sort_by_key(|v| v.effective_date);
        Self { versions: sorted }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Resolve `plan_name` for a price needed on `requested_date`, for a
    /// subscription that last committed to the plan on
    /// `subscription_change_date`.
    ///
    /// The walk runs newest-first over versions effective at or before
    /// `requested_date`:
    ///
    /// - A version missing the plan is skipped — the plan was retired there,
    ///   and an older version must price pre-existing subscriptions.
    /// - A version no newer than the subscription's own commitment always
    ///   applies.
    /// - A version newer than the commitment applies only once its
    ///   grandfathering cutover has been reached. The boundary is inclusive:
    ///   at `requested_date == cutover` the window is closed and the new
    ///   pricing applies. A version without a cutover never applies to
    ///   pre-existing subscriptions.
    ///
    /// # Errors
    ///
    /// * [`CatalogError::NoCatalogForDate`] — no version is effective at or
    ///   before `requested_date`.
    /// * [`CatalogError::NoSuchPlan`] — no applicable version defines the
    ///   plan; indicates an orphaned reference or corrupt catalog.
    pub fn resolve_plan(
        &self,
        plan_name: &str,
        requested_date: DateTime<Utc>,
        subscription_change_date: DateTime<Utc>,
    ) -> Result<ResolvedPlan<'a>, CatalogError> {
        let eligible: Vec<&CatalogVersion> = self
            .versions
            .iter()
            .copied()
            .filter(|v| v.effective_date <= requested_date)
            .collect();

        if eligible.is_empty() {
            return Err(CatalogError::NoCatalogForDate(requested_date));
        }

        for version in eligible.iter().rev() {
            let Some(plan) = version.plan(plan_name) else {
                // Retired in this version; keep walking back.
                continue;
            };

            let applies = if subscription_change_date >= version.effective_date {
                // The subscription committed at or after this version took
                // effect, so the version is simply its vintage.
                true
            } else {
                // Pre-existing subscription: frozen until the cutover.
                match version.effective_date_for_existing_subscriptions {
                    Some(cutover) => requested_date >= cutover,
                    None => false,
                }
            };

            if applies {
                return Ok(ResolvedPlan {
                    version_effective_date: version.effective_date,
                    plan,
                });
            }
        }

        Err(CatalogError::NoSuchPlan {
            plan_name: plan_name.to_string(),
            as_of: subscription_change_date,
        })
    }
}
