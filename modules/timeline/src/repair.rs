//! Timeline repair: validated, atomic retroactive correction of a
//! subscription's event stream.
//!
//! A repair never patches a committed version. It builds a candidate event
//! set (base minus deletions plus insertions), validates it, and on commit
//! swaps the per-subscription active-version pointer to a brand-new
//! `base + 1` version. The superseded version stays in the audit history.
//! Concurrent commits against the same base race through the store's
//! compare-and-swap; exactly one wins.

use crate::billing::BillingEventProjector;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::RepairError;
use crate::models::{
    BillingEvent, BundleRepairRequest, BundleTimeline, EventStreamVersion, ProjectedTimeline,
    RepairCompleted, RepairRequest, SubscriptionEvent, SubscriptionTimeline,
};
use crate::projector::{canonically_sorted, project};
use crate::store::EventStore;
use crate::validation::validate_timeline;
use catalog_core::{CatalogResolver, CatalogStore};
use chrono::{DateTime, Utc};
use event_bus::{EventBus, EventEnvelope};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Engine facade scoped to one tenant. All collaborators are injected;
/// projections are read-only and may run with unbounded concurrency, while
/// commits serialize per subscription through the store's version-pointer
/// swap.
pub struct TimelineRepairEngine {
    tenant_id: String,
    store: Arc<dyn EventStore>,
    catalogs: Arc<dyn CatalogStore>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl TimelineRepairEngine {
    pub fn new(
        tenant_id: impl Into<String>,
        store: Arc<dyn EventStore>,
        catalogs: Arc<dyn CatalogStore>,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            store,
            catalogs,
            bus,
            clock,
            config,
        }
    }

    /// Dry-run a repair: validate it against the active version and return
    /// the timeline it would produce. Performs no writes and may be
    /// abandoned at any time.
    ///
    /// Validation order: base-version guard, unknown deletions, timeline
    /// validity, immutable-history boundary.
    pub async fn validate_repair(
        &self,
        subscription_id: Uuid,
        request: &RepairRequest,
    ) -> Result<ProjectedTimeline, RepairError> {
        let base = self.store.load(subscription_id).await?;

        if base.version != request.expected_base_version {
            return Err(RepairError::ConcurrentModification {
                expected: request.expected_base_version,
                actual: base.version,
            });
        }

        let base_ids: HashSet<Uuid> = base.events.iter().map(|e| e.id).collect();
        for deleted in &request.deleted_event_ids {
            if !base_ids.contains(deleted) {
                return Err(RepairError::UnknownEvent(*deleted));
            }
        }

        let (events, inserted) = build_candidate_events(&base, request);

        let versions = self.catalogs.versions_for_tenant(&self.tenant_id).await;
        let resolver = CatalogResolver::new(&versions);
        validate_timeline(&events, &resolver)?;

        if let Some(boundary) = request.billed_through {
            for event in &inserted {
                if event.effective_date < boundary {
                    return Err(RepairError::ImmutableHistory {
                        event_id: event.id,
                        effective_date: event.effective_date,
                        boundary,
                    });
                }
            }
        }

        let state_as_of_now = project(&events, self.clock.now());
        Ok(ProjectedTimeline {
            subscription_id,
            bundle_id: base.bundle_id,
            base_version: base.version,
            events,
            state_as_of_now,
        })
    }

    /// Validate and atomically commit a repair, producing version
    /// `base + 1`. On success a repair-completed signal is published for
    /// downstream consumers holding derived data; invoices are not
    /// regenerated here.
    pub async fn commit_repair(
        &self,
        subscription_id: Uuid,
        request: &RepairRequest,
    ) -> Result<EventStreamVersion, RepairError> {
        let projected = self.validate_repair(subscription_id, request).await?;

        let new_version = EventStreamVersion {
            subscription_id,
            bundle_id: projected.bundle_id,
            version: projected.base_version + 1,
            events: projected.events,
        };

        self.store
            .commit(request.expected_base_version, new_version.clone())
            .await?;

        tracing::info!(
            subscription_id = %subscription_id,
            superseded_version = projected.base_version,
            new_version = new_version.version,
            deleted = request.deleted_event_ids.len(),
            inserted = request.new_events.len(),
            "committed repaired timeline"
        );

        self.publish_repair_completed(&new_version).await;
        Ok(new_version)
    }

    /// Current active versions and events for every subscription in a
    /// bundle.
    pub async fn get_bundle_timeline(&self, bundle_id: Uuid) -> Result<BundleTimeline, RepairError> {
        let ids = self.store.subscription_ids_in_bundle(bundle_id).await?;

        let mut subscriptions = Vec::with_capacity(ids.len());
        for subscription_id in ids {
            let active = self.store.load(subscription_id).await?;
            subscriptions.push(SubscriptionTimeline {
                subscription_id,
                version: active.version,
                events: canonically_sorted(&active.events),
            });
        }

        Ok(BundleTimeline {
            bundle_id,
            subscriptions,
        })
    }

    /// Repair several subscriptions of one bundle.
    ///
    /// Every member repair is validated before anything is committed; with
    /// `dry_run` the projected timelines come back without a single write.
    /// Commits then run sequentially, each independently atomic — a conflict
    /// mid-sequence aborts the remainder and surfaces as
    /// `ConcurrentModification`.
    pub async fn repair_bundle(
        &self,
        request: &BundleRepairRequest,
        dry_run: bool,
    ) -> Result<BundleTimeline, RepairError> {
        let mut projected = Vec::with_capacity(request.repairs.len());
        for repair in &request.repairs {
            let timeline = self
                .validate_repair(repair.subscription_id, &repair.request)
                .await?;
            if timeline.bundle_id != request.bundle_id {
                return Err(RepairError::SubscriptionNotInBundle {
                    subscription_id: repair.subscription_id,
                    bundle_id: request.bundle_id,
                });
            }
            projected.push(timeline);
        }

        if dry_run {
            return Ok(BundleTimeline {
                bundle_id: request.bundle_id,
                subscriptions: projected
                    .into_iter()
                    .map(|t| SubscriptionTimeline {
                        subscription_id: t.subscription_id,
                        // The version the repair would produce.
                        version: t.base_version + 1,
                        events: t.events,
                    })
                    .collect(),
            });
        }

        for repair in &request.repairs {
            self.commit_repair(repair.subscription_id, &repair.request)
                .await?;
        }
        self.get_bundle_timeline(request.bundle_id).await
    }

    /// Ordered billing events for one subscription's active stream within
    /// `[from, to]`.
    pub async fn project_billing_events(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BillingEvent>, RepairError> {
        let active = self.store.load(subscription_id).await?;
        let versions = self.catalogs.versions_for_tenant(&self.tenant_id).await;
        let projector = BillingEventProjector::new(&versions);

        let events = projector
            .project_billing_events(&active.events, from, to)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Best-effort signal: the commit is already durable, so a publish
    /// failure is logged and never unwound.
    async fn publish_repair_completed(&self, new_version: &EventStreamVersion) {
        let payload = RepairCompleted {
            subscription_id: new_version.subscription_id,
            bundle_id: new_version.bundle_id,
            new_version: new_version.version,
            superseded_version: new_version.version - 1,
        };
        let envelope = EventEnvelope::new(
            self.clock.now(),
            self.tenant_id.clone(),
            "timeline".to_string(),
            payload,
        )
        .with_source_version(env!("CARGO_PKG_VERSION").to_string());

        let subject = format!("{}.repair.completed", self.config.signal_subject_prefix);
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize repair-completed signal");
                return;
            }
        };

        if let Err(err) = self.bus.publish(&subject, bytes).await {
            tracing::warn!(
                subscription_id = %new_version.subscription_id,
                subject = %subject,
                error = %err,
                "failed to publish repair-completed signal"
            );
        }
    }
}

/// Base events minus deletions, plus insertions carrying fresh ids and
/// sequential total orderings starting after the base maximum. Returns the
/// canonically sorted candidate set and the inserted events.
fn build_candidate_events(
    base: &EventStreamVersion,
    request: &RepairRequest,
) -> (Vec<SubscriptionEvent>, Vec<SubscriptionEvent>) {
    let deleted: HashSet<Uuid> = request.deleted_event_ids.iter().copied().collect();

    let mut events: Vec<SubscriptionEvent> = base
        .events
        .iter()
        .filter(|e| !deleted.contains(&e.id))
        .cloned()
        .collect();

    let mut next_ordering = base.max_total_ordering() + 1;
    let mut inserted = Vec::with_capacity(request.new_events.len());
    for new_event in &request.new_events {
        let event = SubscriptionEvent {
            id: Uuid::new_v4(),
            subscription_id: base.subscription_id,
            bundle_id: base.bundle_id,
            effective_date: new_event.effective_date,
            total_ordering: next_ordering,
            detail: new_event.detail.clone(),
        };
        next_ordering += 1;
        inserted.push(event.clone());
        events.push(event);
    }

    (canonically_sorted(&events), inserted)
}
