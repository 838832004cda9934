//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use nexus_catalog::{merge, ResolvedItem, ResourceCatalog};
use nexus_pipeline::{
    CatalogCache, CatalogTimeRange, DataSource, DataSourceRegistry, ReadOrchestrator,
    SampleDataSource, SAMPLE_CATALOG_ID,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::CliConfig;

/// One line of `nexus list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub id: String,
    pub title: Option<String>,
    pub resource_count: usize,
    pub time_range: CatalogTimeRange,
    pub availability: f64,
}

fn load_catalog(path: &Path) -> Result<ResourceCatalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file {}", path.display()))?;

    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse catalog file {}", path.display()))
}

/// Merge the catalogs stored in `files`, left to right.
pub fn merge_files(files: &[PathBuf]) -> Result<ResourceCatalog> {
    let Some((first, rest)) = files.split_first() else {
        bail!("at least one catalog file is required");
    };

    let mut merged = load_catalog(first)?;
    for file in rest {
        let next = load_catalog(file)?;
        merged = merge(&merged, &next)
            .with_context(|| format!("failed to merge {}", file.display()))?;
        debug!(file = %file.display(), "Merged catalog file");
    }

    Ok(merged)
}

/// Resolve a resource path against the catalog stored in `file`.
pub fn resolve_in_file(file: &Path, path: &str) -> Result<ResolvedItem> {
    let catalog = load_catalog(file)?;
    Ok(catalog.resolve(path)?)
}

/// Parse an RFC 3339 timestamp.
pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    let time = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("'{}' is not an RFC 3339 timestamp", value))?;
    Ok(time.with_timezone(&Utc))
}

async fn sample_setup(
    config: &CliConfig,
    cancel: &CancellationToken,
) -> Result<(Arc<SampleDataSource>, ReadOrchestrator)> {
    let source = Arc::new(SampleDataSource::new());

    let mut registry = DataSourceRegistry::new();
    registry.register(SAMPLE_CATALOG_ID, source.clone())?;

    let cache = Arc::new(CatalogCache::new());
    cache.refresh(source.as_ref(), "/", cancel).await?;

    let orchestrator = ReadOrchestrator::new(Arc::new(registry), cache, config.pipeline.clone())?;
    Ok((source, orchestrator))
}

/// Summaries of the catalogs published by the sample source.
pub async fn list_catalogs(
    config: &CliConfig,
    cancel: &CancellationToken,
) -> Result<Vec<CatalogSummary>> {
    let (source, orchestrator) = sample_setup(config, cancel).await?;
    let registrations = source.get_catalog_registrations("/", cancel).await?;

    let mut summaries = Vec::with_capacity(registrations.len());
    for registration in registrations {
        let id = registration.path.to_absolute("/");
        let Some(catalog) = orchestrator.catalogs().get(&id).await else {
            continue;
        };

        let time_range = source.get_time_range(&id, cancel).await?;
        let availability = source
            .get_availability(&id, time_range.begin, time_range.end, cancel)
            .await?;

        summaries.push(CatalogSummary {
            resource_count: catalog.resources().map_or(0, |resources| resources.len()),
            id,
            title: registration.title,
            time_range,
            availability,
        });
    }

    Ok(summaries)
}

/// Read `paths` from the sample source over `begin..end`.
pub async fn read_sample(
    config: &CliConfig,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
    paths: &[String],
    progress: &(dyn Fn(f64) + Send + Sync),
    cancel: &CancellationToken,
) -> Result<Vec<Vec<f64>>> {
    let (_, orchestrator) = sample_setup(config, cancel).await?;
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();

    let values = orchestrator
        .read_paths(begin, end, &paths, progress, cancel)
        .await?;

    let stats = orchestrator.pool().stats();
    info!(
        items = values.len(),
        allocated = stats.allocated,
        reused = stats.reused,
        "Read finished"
    );

    Ok(values)
}

/// Render read results as a JSON object of path to values; `NaN` becomes `null`.
pub fn render_series(paths: &[String], values: &[Vec<f64>]) -> Result<String> {
    if paths.len() != values.len() {
        bail!("{} paths but {} series", paths.len(), values.len());
    }

    let mut object = Map::new();
    for (path, series) in paths.iter().zip(values) {
        let series = series
            .iter()
            .map(|value| serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number))
            .collect();
        object.insert(path.clone(), Value::Array(series));
    }

    Ok(serde_json::to_string_pretty(&Value::Object(object))?)
}
