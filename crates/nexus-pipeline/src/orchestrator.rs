//! Concurrent batch reads.
//!
//! ```text
//! read_many(begin, end, items)
//!      │
//!      ├─► plan each item: data source, native item, native range, derivation
//!      │
//!      ├─► spawn one task per item (bounded by a semaphore)
//!      │         │
//!      │         ├─► rent data + status buffers
//!      │         ├─► DataSource::read
//!      │         └─► cast / aggregate / resample on the blocking pool
//!      │
//!      └─► join first-to-finish, report completed / total
//!                │
//!                └─► first failure: cancel the batch, return its error
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexus_catalog::{CatalogItem, RepresentationKind, ResolvedItem};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregation::{aggregate, aggregate_bitwise, resample, ReduceOptions};
use crate::buffers::{ceil_to, create_buffers, element_count, epoch_nanos, floor_to};
use crate::cache::CatalogCache;
use crate::cast::cast_to_vec;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pool::BufferPool;
use crate::registry::DataSourceResolver;
use crate::source::{DataSource, ReadDataHandler, ReadRequest};

/// How the values of the native item become the requested values.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Derivation {
    Native,
    Aggregate { kind: RepresentationKind, window: usize },
    Bitwise { kind: RepresentationKind, window: usize },
    Resample { factor: usize, offset: usize },
}

struct ItemPlan {
    index: usize,
    path: String,
    source: Arc<dyn DataSource>,
    native: CatalogItem,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
    derivation: Derivation,
    output_len: usize,
}

/// Reads batches of items from their data sources.
#[derive(Clone)]
pub struct ReadOrchestrator {
    resolver: Arc<dyn DataSourceResolver>,
    catalogs: Arc<CatalogCache>,
    pool: BufferPool,
    config: PipelineConfig,
}

impl ReadOrchestrator {
    /// Create an orchestrator with its own buffer pool.
    pub fn new(
        resolver: Arc<dyn DataSourceResolver>,
        catalogs: Arc<CatalogCache>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate().map_err(PipelineError::Config)?;

        Ok(Self {
            resolver,
            catalogs,
            pool: BufferPool::new(config.pool_max_retained),
            config,
        })
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn catalogs(&self) -> &Arc<CatalogCache> {
        &self.catalogs
    }

    /// Resolve `paths` against the catalog cache and read them.
    pub async fn read_paths(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        paths: &[&str],
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f64>>> {
        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            items.push(self.catalogs.resolve(path).await?);
        }

        self.read_many(begin, end, &items, progress, cancel).await
    }

    /// Read every item over `begin..end`, returning one `f64` series per
    /// item in input order.
    ///
    /// `progress` receives `completed / total` after each finished item.
    /// The first failing item cancels the batch and its error is returned;
    /// tasks still running observe the cancellation at their next check.
    pub async fn read_many(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        items: &[ResolvedItem],
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f64>>> {
        let plans = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.plan(index, item, begin, end))
            .collect::<Result<Vec<_>>>()?;

        let total = plans.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        info!(items = total, begin = %begin, end = %end, "Starting batch read");

        let batch_cancel = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_reads));
        let handler: Arc<dyn ReadDataHandler> = Arc::new(self.clone());
        let mut tasks = JoinSet::new();

        for plan in plans {
            tasks.spawn(run_item(
                plan,
                self.pool.clone(),
                self.config.clone(),
                Arc::clone(&semaphore),
                Arc::clone(&handler),
                batch_cancel.clone(),
            ));
        }

        let mut results: Vec<Option<Vec<f64>>> = vec![None; total];
        let mut completed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(PipelineError::from).and_then(|result| result);

            match outcome {
                Ok((index, values)) => {
                    results[index] = Some(values);
                    completed += 1;
                    progress(completed as f64 / total as f64);
                }
                Err(err) => {
                    warn!(error = %err, completed, total, "Batch read failed");
                    batch_cancel.cancel();
                    tasks.detach_all();
                    return Err(err);
                }
            }
        }

        info!(items = total, "Batch read finished");

        results
            .into_iter()
            .map(|values| values.ok_or_else(|| PipelineError::TaskFailed("missing result".into())))
            .collect()
    }

    fn plan(
        &self,
        index: usize,
        item: &ResolvedItem,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ItemPlan> {
        let requested = &item.item;
        let period = requested.representation.sample_period();
        let output_len = element_count(begin, end, period)?;
        let native = item.native_item().clone();

        let source = self
            .resolver
            .resolve(native.catalog.id())
            .ok_or_else(|| PipelineError::NoDataSource(native.catalog.id().to_string()))?;

        let base_period = native.representation.sample_period();
        let kind = requested.representation.kind();

        let (native_begin, native_end, derivation) = if item.base.is_none() {
            (begin, end, Derivation::Native)
        } else if kind == RepresentationKind::Resampled {
            let native_begin = floor_to(begin, base_period)?;
            let native_end = ceil_to(end, base_period)?;
            let offset = (epoch_nanos(begin)? - epoch_nanos(native_begin)?) / period.as_nanos();
            let factor = base_period.as_nanos() / period.as_nanos();

            (
                native_begin,
                native_end,
                Derivation::Resample {
                    factor: to_usize(factor)?,
                    offset: to_usize(offset)?,
                },
            )
        } else {
            let window = to_usize(period.as_nanos() / base_period.as_nanos())?;
            let derivation = if kind.is_bitwise() {
                Derivation::Bitwise { kind, window }
            } else {
                Derivation::Aggregate { kind, window }
            };
            (begin, end, derivation)
        };

        Ok(ItemPlan {
            index,
            path: requested.to_path(),
            source,
            native,
            begin: native_begin,
            end: native_end,
            derivation,
            output_len,
        })
    }
}

fn to_usize(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| PipelineError::invalid_time_range("sample ratio out of range"))
}

async fn run_item(
    plan: ItemPlan,
    pool: BufferPool,
    config: PipelineConfig,
    semaphore: Arc<Semaphore>,
    handler: Arc<dyn ReadDataHandler>,
    cancel: CancellationToken,
) -> Result<(usize, Vec<f64>)> {
    let _permit = tokio::select! {
        permit = semaphore.acquire_owned() => permit.map_err(|_| PipelineError::Cancelled)?,
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
    };

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let (data, status) = create_buffers(&pool, &plan.native.representation, plan.begin, plan.end)?;
    let mut requests = vec![ReadRequest {
        catalog_item: plan.native.clone(),
        data,
        status,
    }];

    let path = plan.path.clone();
    let source_progress = |value: f64| {
        tracing::trace!(path = %path, progress = value, "Source progress");
    };

    plan.source
        .read(
            plan.begin,
            plan.end,
            &mut requests,
            handler.as_ref(),
            &source_progress,
            &cancel,
        )
        .await
        .map_err(|err| PipelineError::backend_read(plan.path.clone(), err))?;

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let request = requests
        .pop()
        .ok_or_else(|| PipelineError::TaskFailed("request was lost".into()))?;

    let index = plan.index;
    let derivation = plan.derivation;
    let output_len = plan.output_len;

    let values = tokio::task::spawn_blocking(move || {
        finish(request, derivation, output_len, &config, &cancel)
    })
    .await??;

    debug!(path = %plan.path, elements = values.len(), "Item read");
    Ok((index, values))
}

/// Convert a filled request into the requested series. The request's
/// buffers go back to the pool when it is dropped here.
fn finish(
    request: ReadRequest,
    derivation: Derivation,
    output_len: usize,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<Vec<f64>> {
    let data_type = request.catalog_item.representation.data_type();
    let chunk = config.cast_chunk_size;
    let options = ReduceOptions {
        nan_threshold: config.aggregation_nan_threshold,
        chunk_size: chunk,
        cancel,
    };

    match derivation {
        Derivation::Native => cast_to_vec(data_type, &request.data, &request.status, chunk, cancel),
        Derivation::Aggregate { kind, window } => {
            let base = cast_to_vec(data_type, &request.data, &request.status, chunk, cancel)?;
            let mut output = vec![0.0; output_len];
            aggregate(kind, &base, window, &mut output, &options)?;
            Ok(output)
        }
        Derivation::Bitwise { kind, window } => {
            let mut output = vec![0.0; output_len];
            aggregate_bitwise(
                kind,
                data_type,
                &request.data,
                &request.status,
                window,
                &mut output,
                &options,
            )?;
            Ok(output)
        }
        Derivation::Resample { factor, offset } => {
            let base = cast_to_vec(data_type, &request.data, &request.status, chunk, cancel)?;
            let mut output = vec![0.0; output_len];
            resample(&base, factor, offset, &mut output, &options)?;
            Ok(output)
        }
    }
}

#[async_trait]
impl ReadDataHandler for ReadOrchestrator {
    async fn read_data(
        &self,
        resource_path: &str,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        buffer: &mut [f64],
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let item = self.catalogs.resolve(resource_path).await?;
        let mut values = self
            .read_many(begin, end, std::slice::from_ref(&item), &|_: f64| {}, cancel)
            .await?;

        let values = values
            .pop()
            .ok_or_else(|| PipelineError::TaskFailed("missing result".into()))?;

        if values.len() != buffer.len() {
            return Err(PipelineError::buffer_size(format!(
                "'{}' has {} elements, the buffer {}",
                resource_path,
                values.len(),
                buffer.len()
            ))
            .into());
        }

        buffer.copy_from_slice(&values);
        Ok(())
    }
}
