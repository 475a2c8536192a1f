use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while resolving plans against a tenant catalog.
///
/// Both variants indicate data inconsistency rather than transient faults:
/// an orphaned plan reference or a query predating every catalog version.
/// Callers surface them as hard failures and never retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no catalog version is effective at or before {0}")]
    NoCatalogForDate(DateTime<Utc>),

    #[error("no catalog version at or before {as_of} defines plan '{plan_name}'")]
    NoSuchPlan {
        plan_name: String,
        as_of: DateTime<Utc>,
    },
}
