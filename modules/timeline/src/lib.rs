//! # Subscription Timeline Engine
//!
//! Event-sourcing core for subscription billing: a subscription's lifecycle
//! is a versioned, append-only stream of typed events. The engine can
//!
//! - replay a stream as of any point in time ([`projector`]),
//! - retroactively correct a stream through validated, atomic version swaps
//!   ([`repair`]),
//! - derive the ordered billing-event sequence that drives invoicing,
//!   resolving each transition against the dated pricing catalog
//!   ([`billing`]).
//!
//! Persistence and transport are seams, not dependencies: the engine talks
//! to an [`store::EventStore`], a `catalog_core::CatalogStore`, a
//! [`clock::Clock`], and an `event_bus::EventBus`, all injected.

pub mod billing;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod projector;
pub mod repair;
pub mod store;
pub mod validation;

pub use billing::BillingEventProjector;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use error::RepairError;
pub use models::{
    BillingEvent, BundleRepairRequest, BundleTimeline, EventDetail, EventStreamVersion, EventType,
    NewEvent, PriceOverride, ProjectedTimeline, RepairCompleted, RepairRequest, SubscriptionEvent,
    SubscriptionRepair, SubscriptionState, SubscriptionStatus, SubscriptionTimeline,
};
pub use projector::{canonically_sorted, project};
pub use repair::TimelineRepairEngine;
pub use store::{EventStore, InMemoryEventStore, StoreError};
pub use validation::TimelineValidationError;
