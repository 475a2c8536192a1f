//! # Catalog Core
//!
//! Dated, immutable pricing-catalog snapshots and the temporal resolution
//! rules the timeline engine applies to them.
//!
//! A tenant's catalog is an ordered list of [`CatalogVersion`] snapshots.
//! Each version is fully self-contained — it is never diffed against the
//! version before it — so resolving a plan for a historical date is a walk
//! backwards through the snapshots, not a reconstruction. The walk honours
//! grandfathering: a version can declare a cutover date before which
//! subscriptions older than the version keep seeing their previous pricing.

mod error;
mod model;
mod resolver;
mod store;

pub use error::CatalogError;
pub use model::{BillingPeriod, CatalogVersion, PhaseType, PlanDefinition, PlanPhase};
pub use resolver::{CatalogResolver, ResolvedPlan};
pub use store::{CatalogStore, InMemoryCatalogStore};
