//! Integration tests for the data source registry and the catalog cache.

use std::sync::Arc;

use nexus_catalog::{CatalogError, DataType, Representation, ResourceBuilder, ResourceCatalogBuilder};
use nexus_pipeline::{CatalogCache, DataSource, DataSourceRegistry, DataSourceResolver, PipelineError};
use test_utils::fixtures::{ids, paths};
use test_utils::{minutes, mock_catalog, nested_catalog, secs, MockDataSource};
use tokio_util::sync::CancellationToken;

fn same_source(a: &Arc<dyn DataSource>, b: &Arc<MockDataSource>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_registry_longest_prefix_wins() {
    let fallback = Arc::new(MockDataSource::new([mock_catalog()]));
    let outer = Arc::new(MockDataSource::new([mock_catalog()]));
    let inner = Arc::new(MockDataSource::new([mock_catalog()]));

    let mut registry = DataSourceRegistry::new();
    registry.register("/", fallback.clone()).unwrap();
    registry.register("/MOCK", outer.clone()).unwrap();
    registry.register(ids::MOCK_NESTED, inner.clone()).unwrap();

    assert_eq!(registry.len(), 3);
    assert_eq!(
        registry.prefixes().collect::<Vec<_>>(),
        vec!["/", "/MOCK", ids::MOCK_NESTED]
    );

    assert!(same_source(&registry.resolve(ids::MOCK).unwrap(), &outer));
    assert!(same_source(&registry.resolve(ids::MOCK_NESTED).unwrap(), &inner));
    assert!(same_source(&registry.resolve("/MOCKED").unwrap(), &fallback));
    assert!(same_source(&registry.resolve(ids::UNKNOWN).unwrap(), &fallback));
}

#[test]
fn test_registry_without_fallback() {
    let source = Arc::new(MockDataSource::new([mock_catalog()]));

    let mut registry = DataSourceRegistry::new();
    assert!(registry.is_empty());
    registry.register(ids::MOCK, source).unwrap();

    assert!(registry.resolve(ids::MOCK_NESTED).is_some());
    assert!(registry.resolve("/MOCK").is_none());
    assert!(registry.resolve(ids::UNKNOWN).is_none());
}

#[test]
fn test_registry_rejects_invalid_prefix() {
    let mut registry = DataSourceRegistry::new();
    let result = registry.register("MOCK/", Arc::new(MockDataSource::new([mock_catalog()])));
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_refresh_walks_hierarchy() {
    let source = MockDataSource::new([mock_catalog(), nested_catalog()]);
    let cache = CatalogCache::new();

    let mut loaded = cache
        .refresh(&source, "/", &CancellationToken::new())
        .await
        .unwrap();
    loaded.sort();

    assert_eq!(loaded, vec![ids::MOCK.to_string(), ids::MOCK_NESTED.to_string()]);
    assert_eq!(cache.catalog_ids().await, loaded);
    assert_eq!(cache.len().await, 2);
    assert_eq!(cache.get(ids::MOCK).await, Some(mock_catalog()));
}

#[tokio::test]
async fn test_refresh_cancelled() {
    let source = MockDataSource::new([mock_catalog()]);
    let cache = CatalogCache::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = cache.refresh(&source, "/", &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_update_merges_snapshots() {
    let cache = CatalogCache::new();
    cache.update(mock_catalog()).await.unwrap();

    let extra = ResourceBuilder::new("EXTRA")
        .add_representation(Representation::new(DataType::FLOAT32, secs(1)))
        .build()
        .unwrap();
    let later = ResourceCatalogBuilder::new(ids::MOCK)
        .with_license("CC0-1.0")
        .add_resource(extra)
        .build()
        .unwrap();

    let merged = cache.update(later).await.unwrap();

    assert_eq!(merged.resources().unwrap().len(), 4);
    assert_eq!(merged.license(), Some("CC0-1.0"));
    assert_eq!(merged.readme(), Some("Catalog for tests."));
    assert_eq!(cache.get(ids::MOCK).await, Some(merged));
}

#[tokio::test]
async fn test_conflicting_update_keeps_snapshot() {
    let cache = CatalogCache::new();
    cache.update(mock_catalog()).await.unwrap();

    let conflicting = ResourceBuilder::new("SLOW")
        .add_representation(Representation::new(DataType::INT64, minutes(1)))
        .build()
        .unwrap();
    let later = ResourceCatalogBuilder::new(ids::MOCK)
        .add_resource(conflicting)
        .build()
        .unwrap();

    let err = cache.update(later).await.unwrap_err();
    assert!(matches!(err, PipelineError::Catalog(CatalogError::MergeConflict(_))));
    assert_eq!(cache.get(ids::MOCK).await, Some(mock_catalog()));
}

#[tokio::test]
async fn test_resolve_through_cache() {
    let cache = CatalogCache::new();
    cache.update(mock_catalog()).await.unwrap();

    let resolved = cache.resolve(paths::T1_MEAN_5MIN).await.unwrap();
    assert!(resolved.is_derived());
    assert_eq!(resolved.native_item().to_path(), paths::T1_NATIVE);

    let err = cache.resolve("/UNKNOWN/T1/1_s").await.unwrap_err();
    assert!(matches!(err, PipelineError::Catalog(CatalogError::CatalogNotFound(_))));

    assert!(cache.remove(ids::MOCK).await.is_some());
    assert!(cache.resolve(paths::T1_NATIVE).await.is_err());
}
