//! The contract between the pipeline and data sources.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexus_catalog::{CatalogItem, CatalogRegistration, ResourceCatalog};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::pool::PooledBuffer;

/// Settings handed to a data source before first use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceContext {
    /// Where the source finds its data (a directory, a URL, ...).
    pub resource_locator: Option<String>,
    /// Source-specific settings.
    #[serde(default)]
    pub source_configuration: Map<String, Value>,
    /// Settings attached to the current request, if any.
    #[serde(default)]
    pub request_configuration: Option<Map<String, Value>>,
}

/// The time span covered by a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTimeRange {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Default for CatalogTimeRange {
    fn default() -> Self {
        Self {
            begin: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }
}

/// One item to be read together with the buffers the source fills.
///
/// `data` holds `element_count * element_size` bytes in native byte order;
/// `status` holds one byte per element, `1` for a valid sample.
#[derive(Debug)]
pub struct ReadRequest {
    pub catalog_item: CatalogItem,
    pub data: PooledBuffer,
    pub status: PooledBuffer,
}

impl ReadRequest {
    pub fn element_count(&self) -> usize {
        self.status.len()
    }

    /// Mark every element valid.
    pub fn mark_all_valid(&mut self) {
        self.status.fill(1);
    }
}

/// Lets a data source read other items as `f64`, e.g. to compute a
/// resource from other resources.
#[async_trait]
pub trait ReadDataHandler: Send + Sync {
    /// Read `resource_path` over `begin..end` into `buffer`.
    async fn read_data(
        &self,
        resource_path: &str,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        buffer: &mut [f64],
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}

/// A backend that publishes catalogs and delivers their data.
///
/// Sources return `anyhow::Result`; a source that stops because `cancel`
/// fired should return [`crate::PipelineError::Cancelled`].
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Receive settings before first use.
    async fn set_context(&mut self, _context: DataSourceContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Catalogs directly below `path` (`/` or a catalog id with a trailing `/`).
    async fn get_catalog_registrations(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<CatalogRegistration>>;

    /// The catalog with the given id.
    async fn get_catalog(
        &self,
        catalog_id: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<ResourceCatalog>;

    /// The time span covered by a catalog. Defaults to everything.
    async fn get_time_range(
        &self,
        _catalog_id: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<CatalogTimeRange> {
        Ok(CatalogTimeRange::default())
    }

    /// The fraction of `begin..end` with data, `NaN` when unknown.
    async fn get_availability(
        &self,
        _catalog_id: &str,
        _begin: DateTime<Utc>,
        _end: DateTime<Utc>,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<f64> {
        Ok(f64::NAN)
    }

    /// Fill the buffers of every request for `begin..end`.
    ///
    /// `progress` receives values in `[0, 1]`.
    async fn read(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        requests: &mut [ReadRequest],
        read_data: &dyn ReadDataHandler,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}
