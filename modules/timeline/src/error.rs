use crate::store::StoreError;
use crate::validation::TimelineValidationError;
use catalog_core::CatalogError;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Repair and projection failures surfaced to callers.
///
/// Only `ConcurrentModification` is designed to be retried (re-fetch the
/// active version, re-validate, commit again). The caller-input errors are
/// surfaced verbatim with the offending event identified; the catalog
/// variants indicate corrupt data and are never retried.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("expected base version {expected} but active version is {actual}")]
    ConcurrentModification { expected: u32, actual: u32 },

    #[error("deleted event {0} does not exist in the base version")]
    UnknownEvent(Uuid),

    #[error("invalid timeline: {0}")]
    InvalidTimeline(#[from] TimelineValidationError),

    #[error(
        "event {event_id} dated {effective_date} predates the billed-through boundary {boundary}"
    )]
    ImmutableHistory {
        event_id: Uuid,
        effective_date: DateTime<Utc>,
        boundary: DateTime<Utc>,
    },

    #[error("subscription {0} not found")]
    SubscriptionNotFound(Uuid),

    #[error("bundle {0} not found")]
    BundleNotFound(Uuid),

    #[error("subscription {subscription_id} does not belong to bundle {bundle_id}")]
    SubscriptionNotInBundle {
        subscription_id: Uuid,
        bundle_id: Uuid,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("event store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RepairError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SubscriptionNotFound(id) => RepairError::SubscriptionNotFound(id),
            StoreError::BundleNotFound(id) => RepairError::BundleNotFound(id),
            StoreError::Conflict {
                expected, actual, ..
            } => RepairError::ConcurrentModification { expected, actual },
            other => RepairError::Store(other),
        }
    }
}
