//! Event stream storage seam.
//!
//! The store owns persisted events and versions. Committing is a
//! compare-and-swap against the single authoritative active-version pointer
//! per subscription: of any set of concurrent commit attempts against the
//! same base version, exactly one succeeds and the rest fail with
//! [`StoreError::Conflict`]. Readers always observe either the old or the
//! new version, never a mix.

use crate::models::EventStreamVersion;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("subscription {0} not found")]
    SubscriptionNotFound(Uuid),

    #[error("bundle {0} not found")]
    BundleNotFound(Uuid),

    #[error("subscription {0} already has a stream")]
    AlreadyExists(Uuid),

    #[error(
        "commit conflict for subscription {subscription_id}: expected base version {expected}, active is {actual}"
    )]
    Conflict {
        subscription_id: Uuid,
        expected: u32,
        actual: u32,
    },

    #[error("version {version} is not a valid successor of active version {active}")]
    NonSequentialVersion { version: u32, active: u32 },
}

/// Durable, append-only storage keyed by (subscription, version).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Active version for a subscription.
    async fn load(&self, subscription_id: Uuid) -> Result<EventStreamVersion, StoreError>;

    /// Superseded versions, oldest first, excluding the active one. Kept for
    /// audit: a repair never destroys the history it replaced.
    async fn load_history(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<EventStreamVersion>, StoreError>;

    /// Subscriptions belonging to a bundle, in a stable order.
    async fn subscription_ids_in_bundle(&self, bundle_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// Seed a subscription with its first version (must be version 1).
    async fn create(&self, initial: EventStreamVersion) -> Result<(), StoreError>;

    /// Atomically swap the active version: succeeds only if the active
    /// version still equals `expected_base_version` and `new_version` is its
    /// direct successor. The superseded version moves to the audit history.
    async fn commit(
        &self,
        expected_base_version: u32,
        new_version: EventStreamVersion,
    ) -> Result<(), StoreError>;
}

struct StreamRecord {
    bundle_id: Uuid,
    active: EventStreamVersion,
    superseded: Vec<EventStreamVersion>,
}

/// In-memory store for tests and single-process deployments.
///
/// One `RwLock` guards the whole map; commits take the write lock, so the
/// version-pointer swap is atomic and readers never see a half-committed
/// version. Projections only ever hold the read lock.
#[derive(Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<Uuid, StreamRecord>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load(&self, subscription_id: Uuid) -> Result<EventStreamVersion, StoreError> {
        self.streams
            .read()
            .await
            .get(&subscription_id)
            .map(|record| record.active.clone())
            .ok_or(StoreError::SubscriptionNotFound(subscription_id))
    }

    async fn load_history(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<EventStreamVersion>, StoreError> {
        self.streams
            .read()
            .await
            .get(&subscription_id)
            .map(|record| record.superseded.clone())
            .ok_or(StoreError::SubscriptionNotFound(subscription_id))
    }

    async fn subscription_ids_in_bundle(&self, bundle_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let streams = self.streams.read().await;
        let mut ids: Vec<Uuid> = streams
            .iter()
            .filter(|(_, record)| record.bundle_id == bundle_id)
            .map(|(id, _)| *id)
            .collect();

        if ids.is_empty() {
            return Err(StoreError::BundleNotFound(bundle_id));
        }
        ids.sort();
        Ok(ids)
    }

    async fn create(&self, initial: EventStreamVersion) -> Result<(), StoreError> {
        let mut streams = self.streams.write().await;
        if streams.contains_key(&initial.subscription_id) {
            return Err(StoreError::AlreadyExists(initial.subscription_id));
        }
        if initial.version != 1 {
            return Err(StoreError::NonSequentialVersion {
                version: initial.version,
                active: 0,
            });
        }
        streams.insert(
            initial.subscription_id,
            StreamRecord {
                bundle_id: initial.bundle_id,
                active: initial,
                superseded: Vec::new(),
            },
        );
        Ok(())
    }

    async fn commit(
        &self,
        expected_base_version: u32,
        new_version: EventStreamVersion,
    ) -> Result<(), StoreError> {
        let mut streams = self.streams.write().await;
        let record = streams
            .get_mut(&new_version.subscription_id)
            .ok_or(StoreError::SubscriptionNotFound(new_version.subscription_id))?;

        if record.active.version != expected_base_version {
            return Err(StoreError::Conflict {
                subscription_id: new_version.subscription_id,
                expected: expected_base_version,
                actual: record.active.version,
            });
        }
        if new_version.version != expected_base_version + 1 {
            return Err(StoreError::NonSequentialVersion {
                version: new_version.version,
                active: record.active.version,
            });
        }

        let superseded = std::mem::replace(&mut record.active, new_version);
        record.superseded.push(superseded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventDetail, SubscriptionEvent};
    use chrono::{TimeZone, Utc};

    fn version(subscription_id: Uuid, bundle_id: Uuid, version: u32) -> EventStreamVersion {
        let effective = Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap();
        EventStreamVersion {
            subscription_id,
            bundle_id,
            version,
            events: vec![SubscriptionEvent {
                id: Uuid::new_v4(),
                subscription_id,
                bundle_id,
                effective_date: effective,
                total_ordering: 1,
                detail: EventDetail::Create {
                    plan_name: "pistol-monthly".to_string(),
                    phase_name: None,
                    bill_cycle_day_local: 1,
                    price_overrides: None,
                },
            }],
        }
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let store = InMemoryEventStore::new();
        let sub = Uuid::new_v4();
        let bundle = Uuid::new_v4();
        let v1 = version(sub, bundle, 1);

        store.create(v1.clone()).await.unwrap();
        assert_eq!(store.load(sub).await.unwrap(), v1);
        assert!(store.load_history(sub).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_duplicates_and_wrong_first_version() {
        let store = InMemoryEventStore::new();
        let sub = Uuid::new_v4();
        let bundle = Uuid::new_v4();

        store.create(version(sub, bundle, 1)).await.unwrap();
        assert_eq!(
            store.create(version(sub, bundle, 1)).await,
            Err(StoreError::AlreadyExists(sub))
        );

        let other = Uuid::new_v4();
        assert!(matches!(
            store.create(version(other, bundle, 2)).await,
            Err(StoreError::NonSequentialVersion { version: 2, .. })
        ));
    }

    #[tokio::test]
    async fn commit_swaps_active_and_keeps_audit_history() {
        let store = InMemoryEventStore::new();
        let sub = Uuid::new_v4();
        let bundle = Uuid::new_v4();
        let v1 = version(sub, bundle, 1);
        let v2 = version(sub, bundle, 2);

        store.create(v1.clone()).await.unwrap();
        store.commit(1, v2.clone()).await.unwrap();

        assert_eq!(store.load(sub).await.unwrap(), v2);
        assert_eq!(store.load_history(sub).await.unwrap(), vec![v1]);
    }

    #[tokio::test]
    async fn commit_against_stale_base_conflicts() {
        let store = InMemoryEventStore::new();
        let sub = Uuid::new_v4();
        let bundle = Uuid::new_v4();

        store.create(version(sub, bundle, 1)).await.unwrap();
        store.commit(1, version(sub, bundle, 2)).await.unwrap();

        let err = store.commit(1, version(sub, bundle, 2)).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                subscription_id: sub,
                expected: 1,
                actual: 2,
            }
        );
    }

    #[tokio::test]
    async fn bundle_lookup_is_stable_and_scoped() {
        let store = InMemoryEventStore::new();
        let bundle = Uuid::new_v4();
        let other_bundle = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.create(version(a, bundle, 1)).await.unwrap();
        store.create(version(b, bundle, 1)).await.unwrap();
        store
            .create(version(Uuid::new_v4(), other_bundle, 1))
            .await
            .unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(
            store.subscription_ids_in_bundle(bundle).await.unwrap(),
            expected
        );

        let unknown = Uuid::new_v4();
        assert_eq!(
            store.subscription_ids_in_bundle(unknown).await,
            Err(StoreError::BundleNotFound(unknown))
        );
    }
}
