//! Catalog storage seam.
//!
//! The engine only ever reads catalogs; whoever hosts the engine decides
//! where they live. The in-memory implementation backs tests and
//! single-process deployments.

use crate::model::CatalogVersion;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Read-only access to a tenant's catalog versions.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All catalog versions for a tenant, ordered by effective date.
    ///
    /// A tenant with no uploaded catalog yields an empty list; resolution
    /// against it fails with `NoCatalogForDate`.
    async fn versions_for_tenant(&self, tenant_id: &str) -> Vec<CatalogVersion>;
}

/// In-memory catalog store keyed by tenant.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    catalogs: RwLock<HashMap<String, Vec<CatalogVersion>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version to a tenant's catalog, keeping the list ordered.
    pub async fn add_version(&self, tenant_id: &str, version: CatalogVersion) {
        let mut catalogs = self.catalogs.write().await;
        let versions = catalogs.entry(tenant_id.to_string()).or_default();
        versions.push(version);
        versions.sort_by_key(|v| v.effective_date);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn versions_for_tenant(&self, tenant_id: &str) -> Vec<CatalogVersion> {
        self.catalogs
            .read()
            .await
            .get(tenant_id)
            .cloned()
            .unwrap_or_default()
    }
}
