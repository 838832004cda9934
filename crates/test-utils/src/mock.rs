//! Scriptable data source for pipeline tests.
//!
//! [`MockDataSource`] serves a fixed set of catalogs and answers reads per
//! resource id according to a [`MockBehavior`]. Counters record how many
//! reads started, finished and observed cancellation, so tests can check
//! what happened to sibling reads of a failing batch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexus_catalog::{CatalogRegistration, ResourceCatalog};
use nexus_pipeline::{DataSource, PipelineError, ReadDataHandler, ReadRequest};
use tokio_util::sync::CancellationToken;

use crate::generators::{encode_as, ramp};

/// What a read of one resource does.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Write `0, 1, 2, ...` and mark everything valid.
    Ramp,
    /// Write the given values (repeated as needed) with the given status
    /// (repeated as needed; empty means all valid).
    Values { values: Vec<f64>, status: Vec<u8> },
    /// Fail with the given message.
    Fail(String),
    /// Sleep, then fail with the given message.
    FailAfter(Duration, String),
    /// Block until the read is cancelled.
    WaitForCancel,
    /// Sleep, then behave like [`MockBehavior::Ramp`]. Stops early when cancelled.
    Delay(Duration),
    /// Read another path through the handler and write its values.
    ReadThrough(String),
}

/// Counters of a [`MockDataSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub reads_started: usize,
    pub reads_finished: usize,
    pub cancellations_observed: usize,
}

/// A data source with scripted answers.
#[derive(Debug)]
pub struct MockDataSource {
    catalogs: Vec<ResourceCatalog>,
    behaviors: HashMap<String, MockBehavior>,
    reads_started: AtomicUsize,
    reads_finished: AtomicUsize,
    cancellations_observed: AtomicUsize,
}

impl MockDataSource {
    /// A source serving `catalogs`; every resource behaves like
    /// [`MockBehavior::Ramp`] until told otherwise.
    pub fn new(catalogs: impl IntoIterator<Item = ResourceCatalog>) -> Self {
        Self {
            catalogs: catalogs.into_iter().collect(),
            behaviors: HashMap::new(),
            reads_started: AtomicUsize::new(0),
            reads_finished: AtomicUsize::new(0),
            cancellations_observed: AtomicUsize::new(0),
        }
    }

    /// Set the behaviour of reads of `resource_id`.
    pub fn with_behavior(mut self, resource_id: impl Into<String>, behavior: MockBehavior) -> Self {
        self.behaviors.insert(resource_id.into(), behavior);
        self
    }

    pub fn stats(&self) -> MockStats {
        MockStats {
            reads_started: self.reads_started.load(Ordering::SeqCst),
            reads_finished: self.reads_finished.load(Ordering::SeqCst),
            cancellations_observed: self.cancellations_observed.load(Ordering::SeqCst),
        }
    }

    fn cancelled(&self) -> anyhow::Error {
        self.cancellations_observed.fetch_add(1, Ordering::SeqCst);
        PipelineError::Cancelled.into()
    }

    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> anyhow::Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = cancel.cancelled() => Err(self.cancelled()),
        }
    }

    async fn fill(
        &self,
        request: &mut ReadRequest,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        read_data: &dyn ReadDataHandler,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let count = request.element_count();
        let behavior = self
            .behaviors
            .get(request.catalog_item.resource.id())
            .cloned()
            .unwrap_or(MockBehavior::Ramp);

        let (values, status) = match behavior {
            MockBehavior::Ramp => (ramp(count), Vec::new()),
            MockBehavior::Values { values, status } => (values, status),
            MockBehavior::Fail(message) => bail!(message),
            MockBehavior::FailAfter(duration, message) => {
                self.sleep(duration, cancel).await?;
                bail!(message)
            }
            MockBehavior::WaitForCancel => {
                cancel.cancelled().await;
                return Err(self.cancelled());
            }
            MockBehavior::Delay(duration) => {
                self.sleep(duration, cancel).await?;
                (ramp(count), Vec::new())
            }
            MockBehavior::ReadThrough(path) => {
                let mut buffer = vec![0.0; count];
                read_data.read_data(&path, begin, end, &mut buffer, cancel).await?;
                (buffer, Vec::new())
            }
        };

        write_request(request, &values, &status)
    }
}

/// Write `values` and `status` into the request buffers, repeating both to
/// the element count.
fn write_request(request: &mut ReadRequest, values: &[f64], status: &[u8]) -> anyhow::Result<()> {
    let count = request.element_count();
    if count == 0 {
        return Ok(());
    }
    if values.is_empty() {
        return Err(anyhow!("no values to write"));
    }

    let repeated: Vec<f64> = values.iter().copied().cycle().take(count).collect();
    let data_type = request.catalog_item.representation.data_type();
    request.data.copy_from_slice(&encode_as(data_type, &repeated));

    if status.is_empty() {
        request.mark_all_valid();
    } else {
        for (target, value) in request.status.iter_mut().zip(status.iter().cycle()) {
            *target = *value;
        }
    }

    Ok(())
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn get_catalog_registrations(
        &self,
        path: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<CatalogRegistration>> {
        let parent = path.trim_end_matches('/');

        let mut registrations = Vec::new();
        for catalog in &self.catalogs {
            let direct_child = match catalog.id().rsplit_once('/') {
                Some((catalog_parent, _)) => {
                    catalog_parent == parent || (parent.is_empty() && !self.has_ancestor(catalog))
                }
                None => false,
            };

            if direct_child {
                registrations.push(CatalogRegistration::new(catalog.id(), None)?);
            }
        }

        Ok(registrations)
    }

    async fn get_catalog(
        &self,
        catalog_id: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<ResourceCatalog> {
        self.catalogs
            .iter()
            .find(|catalog| catalog.id() == catalog_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown catalog '{}'", catalog_id))
    }

    async fn read(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        requests: &mut [ReadRequest],
        read_data: &dyn ReadDataHandler,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.reads_started.fetch_add(1, Ordering::SeqCst);
        let total = requests.len();

        for (index, request) in requests.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            self.fill(request, begin, end, read_data, cancel).await?;
            progress((index + 1) as f64 / total as f64);
        }

        self.reads_finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MockDataSource {
    /// Whether another served catalog lies above `catalog`.
    fn has_ancestor(&self, catalog: &ResourceCatalog) -> bool {
        self.catalogs.iter().any(|other| {
            catalog
                .id()
                .strip_prefix(other.id())
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ids, mock_catalog, nested_catalog};

    #[tokio::test]
    async fn test_registrations_follow_hierarchy() {
        let source = MockDataSource::new([mock_catalog(), nested_catalog()]);
        let cancel = CancellationToken::new();

        let root = source.get_catalog_registrations("/", &cancel).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].path.as_str(), ids::MOCK);

        let children = source
            .get_catalog_registrations(&format!("{}/", ids::MOCK), &cancel)
            .await
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path.as_str(), ids::MOCK_NESTED);
    }

    #[tokio::test]
    async fn test_unknown_catalog() {
        let source = MockDataSource::new([mock_catalog()]);
        let cancel = CancellationToken::new();
        assert!(source.get_catalog(ids::UNKNOWN, &cancel).await.is_err());
        assert_eq!(source.stats(), MockStats::default());
    }
}
