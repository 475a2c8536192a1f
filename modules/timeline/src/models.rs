use catalog_core::BillingPeriod;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Subscription events
// ============================================================================

/// Discriminator for the closed set of subscription event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Create,
    Transfer,
    Change,
    Cancel,
    Phase,
    Pause,
    Resume,
    Uncancel,
}

/// Per-event price overrides, taking precedence over catalog phase prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOverride {
    pub fixed_price: Option<Decimal>,
    pub recurring_price: Option<Decimal>,
}

/// Type-specific payload of a subscription event.
///
/// A closed tagged union: the projectors match exhaustively over it, so a
/// new event type fails to compile until every transition handles it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDetail {
    Create {
        plan_name: String,
        /// Omitted means the plan's initial phase.
        phase_name: Option<String>,
        bill_cycle_day_local: u8,
        price_overrides: Option<PriceOverride>,
    },
    Transfer {
        plan_name: String,
        phase_name: Option<String>,
        bill_cycle_day_local: u8,
    },
    Change {
        plan_name: String,
        phase_name: Option<String>,
        price_overrides: Option<PriceOverride>,
    },
    Cancel,
    Phase {
        phase_name: String,
    },
    Pause,
    Resume,
    Uncancel,
}

impl EventDetail {
    pub fn event_type(&self) -> EventType {
        match self {
            EventDetail::Create { .. } => EventType::Create,
            EventDetail::Transfer { .. } => EventType::Transfer,
            EventDetail::Change { .. } => EventType::Change,
            EventDetail::Cancel => EventType::Cancel,
            EventDetail::Phase { .. } => EventType::Phase,
            EventDetail::Pause => EventType::Pause,
            EventDetail::Resume => EventType::Resume,
            EventDetail::Uncancel => EventType::Uncancel,
        }
    }
}

/// An immutable fact attached to one subscription.
///
/// `total_ordering` is unique and strictly increasing with insertion within
/// one (subscription, version); it breaks ties between events sharing an
/// effective date. Effective dates need not be monotonic with it — a repair
/// can insert a past-dated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub bundle_id: Uuid,
    pub effective_date: DateTime<Utc>,
    pub total_ordering: u64,
    #[serde(flatten)]
    pub detail: EventDetail,
}

impl SubscriptionEvent {
    /// Canonical ordering key. Ties on effective date always break by
    /// insertion order, never by event type.
    pub fn sort_key(&self) -> (DateTime<Utc>, u64) {
        (self.effective_date, self.total_ordering)
    }
}

/// An event proposed by a repair; id and total ordering are assigned at
/// validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub effective_date: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: EventDetail,
}

// ============================================================================
// Stream versions
// ============================================================================

/// An immutable, numbered snapshot of a subscription's full event history.
///
/// Versions start at 1 and increase strictly; exactly one version per
/// subscription is active at a time. A committed version is never mutated,
/// only superseded by the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStreamVersion {
    pub subscription_id: Uuid,
    pub bundle_id: Uuid,
    pub version: u32,
    pub events: Vec<SubscriptionEvent>,
}

impl EventStreamVersion {
    /// Highest total ordering in this version; new events of a repair are
    /// numbered after it.
    pub fn max_total_ordering(&self) -> u64 {
        self.events.iter().map(|e| e.total_ordering).max().unwrap_or(0)
    }
}

// ============================================================================
// Repair requests
// ============================================================================

/// A proposed retroactive correction to one subscription's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRequest {
    /// Events of the base version to retire.
    pub deleted_event_ids: Vec<Uuid>,
    /// Events to insert.
    pub new_events: Vec<NewEvent>,
    /// Version the caller believed was active — optimistic-concurrency guard.
    pub expected_base_version: u32,
    /// Immutable-history boundary, typically the last invoice's
    /// covered-through date. New events dated before it are rejected.
    pub billed_through: Option<DateTime<Utc>>,
}

/// One subscription's repair inside a bundle-level request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRepair {
    pub subscription_id: Uuid,
    pub request: RepairRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRepairRequest {
    pub bundle_id: Uuid,
    pub repairs: Vec<SubscriptionRepair>,
}

/// Dry-run result: the event set and state a repair would produce, without
/// anything having been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedTimeline {
    pub subscription_id: Uuid,
    pub bundle_id: Uuid,
    pub base_version: u32,
    /// Candidate event set, canonically sorted. Ids and orderings of inserted
    /// events are provisional until a commit assigns them for real.
    pub events: Vec<SubscriptionEvent>,
    pub state_as_of_now: Option<SubscriptionState>,
}

// ============================================================================
// Projection results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Paused,
}

/// Subscription state reconstructed by replaying a stream as of a point in
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub plan_name: String,
    pub phase_name: Option<String>,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub cancel_date: Option<DateTime<Utc>>,
}

// ============================================================================
// Billing events
// ============================================================================

/// A derived, time-stamped pricing fact consumed by invoicing.
///
/// Never persisted as authoritative state: the event stream is the source of
/// truth and billing events are recomputed on every projection. A `None`
/// recurring price on a CANCEL/PAUSE transition signals "billing stops here".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingEvent {
    pub subscription_id: Uuid,
    pub effective_date: DateTime<Utc>,
    pub total_ordering: u64,
    pub plan_name: String,
    pub phase_name: String,
    pub fixed_price: Option<Decimal>,
    pub recurring_price: Option<Decimal>,
    pub billing_period: BillingPeriod,
    pub bill_cycle_day_local: u8,
    pub transition_type: EventType,
}

// ============================================================================
// Bundle read models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTimeline {
    pub subscription_id: Uuid,
    pub version: u32,
    pub events: Vec<SubscriptionEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleTimeline {
    pub bundle_id: Uuid,
    pub subscriptions: Vec<SubscriptionTimeline>,
}

// ============================================================================
// Signals
// ============================================================================

/// Payload of the repair-completed signal published after a successful
/// commit. Consumers holding derived data for the subscription (cached
/// billing events, draft invoices) must recompute; this engine does not
/// regenerate invoices itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairCompleted {
    pub subscription_id: Uuid,
    pub bundle_id: Uuid,
    pub new_version: u32,
    pub superseded_version: u32,
}
