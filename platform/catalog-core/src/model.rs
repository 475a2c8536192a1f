use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Plan phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseType {
    Trial,
    Discount,
    Evergreen,
    FixedTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingPeriod {
    Monthly,
    Quarterly,
    Annual,
    NoBillingPeriod,
}

/// One phase of a plan's lifecycle (e.g. a 30-day trial followed by an
/// evergreen phase).
///
/// Prices are exact decimals; rounding is a downstream invoicing concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPhase {
    pub name: String,
    pub phase_type: PhaseType,
    pub billing_period: BillingPeriod,
    pub fixed_price: Option<Decimal>,
    pub recurring_price: Option<Decimal>,
}

// ============================================================================
// Plans
// ============================================================================

/// A named plan inside one catalog version. Phases are ordered: a new
/// subscription enters the first phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDefinition {
    pub name: String,
    pub phases: Vec<PlanPhase>,
}

impl PlanDefinition {
    /// Phase a newly created subscription starts in.
    pub fn initial_phase(&self) -> Option<&PlanPhase> {
        self.phases.first()
    }

    pub fn find_phase(&self, phase_name: &str) -> Option<&PlanPhase> {
        self.phases.iter().find(|p| p.name == phase_name)
    }
}

// ============================================================================
// Catalog versions
// ============================================================================

/// One immutable, dated snapshot of the full catalog.
///
/// Versions are self-contained: a plan missing from a later version has been
/// retired, and resolution falls back to the version in effect at the
/// subscription's own vintage (see `CatalogResolver`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVersion {
    /// Date this version starts applying to new subscriptions.
    pub effective_date: DateTime<Utc>,

    /// Grandfathering cutover: until this date, subscriptions committed
    /// before `effective_date` keep resolving against their previous
    /// version. `None` means changes in this version never apply to
    /// pre-existing subscriptions.
    pub effective_date_for_existing_subscriptions: Option<DateTime<Utc>>,

    pub plans: BTreeMap<String, PlanDefinition>,
}

impl CatalogVersion {
    pub fn new(effective_date: DateTime<Utc>) -> Self {
        Self {
            effective_date,
            effective_date_for_existing_subscriptions: None,
            plans: BTreeMap::new(),
        }
    }

    pub fn with_existing_subscriptions_cutover(mut self, cutover: DateTime<Utc>) -> Self {
        self.effective_date_for_existing_subscriptions = Some(cutover);
        self
    }

    pub fn with_plan(mut self, plan: PlanDefinition) -> Self {
        self.plans.insert(plan.name.clone(), plan);
        self
    }

    pub fn plan(&self, plan_name: &str) -> Option<&PlanDefinition> {
        self.plans.get(plan_name)
    }
}
