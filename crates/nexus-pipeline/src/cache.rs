//! Shared store of catalog snapshots.
//!
//! Every snapshot reported for a catalog is merged into the stored one, so
//! the cache only ever grows more complete. Writers are serialized by the
//! lock; readers get cloned snapshots.

use std::collections::HashMap;

use nexus_catalog::{CatalogError, ResolvedItem, ResourceCatalog, ResourcePath};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::source::DataSource;

/// Catalog snapshot cache.
#[derive(Debug, Default)]
pub struct CatalogCache {
    catalogs: RwLock<HashMap<String, ResourceCatalog>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `catalog` into the stored snapshot and return the result.
    pub async fn update(&self, catalog: ResourceCatalog) -> Result<ResourceCatalog> {
        let mut catalogs = self.catalogs.write().await;

        let merged = match catalogs.get(catalog.id()) {
            Some(existing) => existing.merge(&catalog)?,
            None => catalog,
        };

        debug!(catalog = %merged.id(), "Catalog snapshot updated");
        catalogs.insert(merged.id().to_string(), merged.clone());
        Ok(merged)
    }

    /// Get the stored snapshot of a catalog.
    pub async fn get(&self, catalog_id: &str) -> Option<ResourceCatalog> {
        self.catalogs.read().await.get(catalog_id).cloned()
    }

    /// Ids of all stored catalogs, sorted.
    pub async fn catalog_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.catalogs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.catalogs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.catalogs.read().await.is_empty()
    }

    /// Drop the stored snapshot of a catalog.
    pub async fn remove(&self, catalog_id: &str) -> Option<ResourceCatalog> {
        self.catalogs.write().await.remove(catalog_id)
    }

    /// Walk the registrations of `source` below `path` and store every
    /// catalog it reports. Returns the ids of the stored catalogs.
    pub async fn refresh(
        &self,
        source: &dyn DataSource,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let mut pending = vec![path.to_string()];
        let mut loaded = Vec::new();

        while let Some(parent) = pending.pop() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let registrations = source
                .get_catalog_registrations(&parent, cancel)
                .await
                .map_err(|err| PipelineError::backend_read(parent.clone(), err))?;

            for registration in registrations {
                let catalog_id = registration.path.to_absolute(&parent);

                // a source may report the parent itself
                if loaded.contains(&catalog_id) {
                    continue;
                }

                let catalog = source
                    .get_catalog(&catalog_id, cancel)
                    .await
                    .map_err(|err| PipelineError::backend_read(catalog_id.clone(), err))?;

                if catalog.id() != catalog_id {
                    return Err(CatalogError::merge_conflict(format!(
                        "requested catalog '{}' but the source returned '{}'",
                        catalog_id,
                        catalog.id()
                    ))
                    .into());
                }

                self.update(catalog).await?;
                pending.push(format!("{}/", catalog_id));
                loaded.push(catalog_id);
            }
        }

        info!(path = %path, catalogs = loaded.len(), "Catalog cache refreshed");
        Ok(loaded)
    }

    /// Resolve a resource path against the stored snapshot of its catalog.
    pub async fn resolve(&self, path: &str) -> Result<ResolvedItem> {
        let parsed = ResourcePath::parse(path)?;
        let catalogs = self.catalogs.read().await;

        let catalog = catalogs
            .get(&parsed.catalog_id)
            .ok_or_else(|| CatalogError::CatalogNotFound(parsed.catalog_id.clone()))?;

        Ok(catalog.resolve(path)?)
    }
}
