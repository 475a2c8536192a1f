//! Common test utilities for timeline engine tests.
//!
//! Provides the pistol/shotgun catalog from the 2011 price-increase
//! scenario, event builders, and a fully wired engine harness backed by the
//! in-memory store, catalog store, and bus.

#![allow(dead_code)]

use catalog_core::{
    BillingPeriod, CatalogStore, CatalogVersion, InMemoryCatalogStore, PhaseType, PlanDefinition,
    PlanPhase,
};
use chrono::{DateTime, TimeZone, Utc};
use event_bus::{EventBus, InMemoryBus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use timeline_rs::{
    EngineConfig, EventDetail, EventStore, EventStreamVersion, FixedClock, InMemoryEventStore,
    SubscriptionEvent, TimelineRepairEngine,
};
use uuid::Uuid;

pub const TENANT: &str = "tenant-1";

pub fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn evergreen_plan(name: &str, recurring: Decimal) -> PlanDefinition {
    PlanDefinition {
        name: name.to_string(),
        phases: vec![PlanPhase {
            name: format!("{name}-evergreen"),
            phase_type: PhaseType::Evergreen,
            billing_period: BillingPeriod::Monthly,
            fixed_price: None,
            recurring_price: Some(recurring),
        }],
    }
}

pub fn trial_then_evergreen_plan(name: &str, recurring: Decimal) -> PlanDefinition {
    PlanDefinition {
        name: name.to_string(),
        phases: vec![
            PlanPhase {
                name: format!("{name}-trial"),
                phase_type: PhaseType::Trial,
                billing_period: BillingPeriod::NoBillingPeriod,
                fixed_price: Some(dec!(0)),
                recurring_price: None,
            },
            PlanPhase {
                name: format!("{name}-evergreen"),
                phase_type: PhaseType::Evergreen,
                billing_period: BillingPeriod::Monthly,
                fixed_price: None,
                recurring_price: Some(recurring),
            },
        ],
    }
}

/// Catalog v1 (2011-01-01): pistol-monthly 29.95, shotgun-monthly 49.95.
/// Catalog v2 (2011-02-02): pistol raised to 39.95, shotgun to 59.95,
/// grandfathering cutover 2011-02-14.
pub fn pistol_catalog() -> Vec<CatalogVersion> {
    vec![
        CatalogVersion::new(date(2011, 1, 1))
            .with_plan(evergreen_plan("pistol-monthly", dec!(29.95)))
            .with_plan(evergreen_plan("shotgun-monthly", dec!(49.95))),
        CatalogVersion::new(date(2011, 2, 2))
            .with_existing_subscriptions_cutover(date(2011, 2, 14))
            .with_plan(evergreen_plan("pistol-monthly", dec!(39.95)))
            .with_plan(evergreen_plan("shotgun-monthly", dec!(59.95))),
    ]
}

pub fn event(
    subscription_id: Uuid,
    bundle_id: Uuid,
    total_ordering: u64,
    effective_date: DateTime<Utc>,
    detail: EventDetail,
) -> SubscriptionEvent {
    SubscriptionEvent {
        id: Uuid::new_v4(),
        subscription_id,
        bundle_id,
        effective_date,
        total_ordering,
        detail,
    }
}

pub fn create_detail(plan_name: &str) -> EventDetail {
    EventDetail::Create {
        plan_name: plan_name.to_string(),
        phase_name: None,
        bill_cycle_day_local: 1,
        price_overrides: None,
    }
}

pub fn change_detail(plan_name: &str) -> EventDetail {
    EventDetail::Change {
        plan_name: plan_name.to_string(),
        phase_name: None,
        price_overrides: None,
    }
}

pub struct Harness {
    pub engine: TimelineRepairEngine,
    pub store: Arc<InMemoryEventStore>,
    pub catalogs: Arc<InMemoryCatalogStore>,
    pub bus: Arc<InMemoryBus>,
    pub clock: Arc<FixedClock>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine wired to in-memory collaborators, with the pistol catalog loaded
/// and the clock frozen at `now`.
pub async fn harness(now: DateTime<Utc>) -> Harness {
    init_tracing();
    let store = Arc::new(InMemoryEventStore::new());
    let catalogs = Arc::new(InMemoryCatalogStore::new());
    let bus = Arc::new(InMemoryBus::new());
    let clock = Arc::new(FixedClock::new(now));

    for version in pistol_catalog() {
        catalogs.add_version(TENANT, version).await;
    }

    let engine = TimelineRepairEngine::new(
        TENANT,
        Arc::clone(&store) as Arc<dyn EventStore>,
        Arc::clone(&catalogs) as Arc<dyn CatalogStore>,
        Arc::clone(&bus) as Arc<dyn EventBus>,
        Arc::clone(&clock) as Arc<dyn timeline_rs::Clock>,
        EngineConfig::default(),
    );

    Harness {
        engine,
        store,
        catalogs,
        bus,
        clock,
    }
}

/// Seed a subscription whose version 1 holds a single CREATE on
/// `pistol-monthly` at 2011-01-01.
pub async fn seed_pistol_subscription(harness: &Harness) -> (Uuid, Uuid, EventStreamVersion) {
    let subscription_id = Uuid::new_v4();
    let bundle_id = Uuid::new_v4();
    let v1 = EventStreamVersion {
        subscription_id,
        bundle_id,
        version: 1,
        events: vec![event(
            subscription_id,
            bundle_id,
            1,
            date(2011, 1, 1),
            create_detail("pistol-monthly"),
        )],
    };
    harness.store.create(v1.clone()).await.unwrap();
    (subscription_id, bundle_id, v1)
}
