//! Tenant state persistence.

use crate::error::{SyncError, SyncResult};
use crate::types::Tenant;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Loads and saves the tenant whose accounts are synced.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_one_tenant(&self) -> SyncResult<Tenant>;
    async fn persist(&self, tenant: &Tenant) -> SyncResult<()>;
}

/// Keeps the tenant as a single JSON document on disk.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous document intact.
pub struct JsonFileTenantStore {
    path: PathBuf,
}

impl JsonFileTenantStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl TenantStore for JsonFileTenantStore {
    async fn find_one_tenant(&self) -> SyncResult<Tenant> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            SyncError::Store(format!("cannot read {}: {e}", self.path.display()))
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn persist(&self, tenant: &Tenant) -> SyncResult<()> {
        let json = serde_json::to_vec_pretty(tenant)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("persisted tenant to {}", self.path.display());
        Ok(())
    }
}
