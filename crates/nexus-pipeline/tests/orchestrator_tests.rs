//! Integration tests for batch reads through the orchestrator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use nexus_pipeline::{
    BufferPool, CatalogCache, DataSourceRegistry, PipelineConfig, PipelineError, ReadOrchestrator,
};
use test_utils::fixtures::{ids, paths};
use test_utils::{
    assert_series_approx_eq, mock_catalog, nested_catalog, ramp, time_range, unaligned_time,
    MockBehavior, MockDataSource,
};
use tokio_util::sync::CancellationToken;

async fn setup(source: MockDataSource) -> (ReadOrchestrator, Arc<MockDataSource>) {
    let source = Arc::new(source);

    let mut registry = DataSourceRegistry::new();
    registry.register(ids::MOCK, source.clone()).unwrap();

    let cache = Arc::new(CatalogCache::new());
    cache
        .refresh(source.as_ref(), "/", &CancellationToken::new())
        .await
        .unwrap();

    let orchestrator =
        ReadOrchestrator::new(Arc::new(registry), cache, PipelineConfig::default()).unwrap();

    (orchestrator, source)
}

fn mock() -> MockDataSource {
    MockDataSource::new([mock_catalog(), nested_catalog()])
}

async fn wait_for_pool_drain(pool: &BufferPool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while pool.stats().outstanding != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("buffers were not returned to the pool");
}

// ============================================================================
// Native and derived reads
// ============================================================================

#[tokio::test]
async fn test_native_read() {
    let (orchestrator, _) = setup(mock()).await;
    let (begin, end) = time_range(10);
    let cancel = CancellationToken::new();

    let values = orchestrator
        .read_paths(begin, end, &[paths::T1_NATIVE], &|_: f64| {}, &cancel)
        .await
        .unwrap();

    assert_eq!(values, vec![ramp(10)]);
    assert_eq!(orchestrator.pool().stats().outstanding, 0);
}

#[tokio::test]
async fn test_cast_with_invalid_status() {
    let source = mock().with_behavior(
        "FLAGS",
        MockBehavior::Values {
            values: vec![10.0, -5.0, 0.0, 32767.0],
            status: vec![1, 1, 0, 1],
        },
    );
    let (orchestrator, _) = setup(source).await;
    let (begin, end) = time_range(4);

    let values = orchestrator
        .read_paths(begin, end, &[paths::FLAGS_NATIVE], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap();

    assert_series_approx_eq!(&values[0], &[10.0, -5.0, f64::NAN, 32767.0], 0.0);
}

#[tokio::test]
async fn test_derived_mean() {
    let (orchestrator, _) = setup(mock()).await;
    let (begin, end) = time_range(600);

    let values = orchestrator
        .read_paths(begin, end, &[paths::T1_MEAN_5MIN], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap();

    // ramp 0..600 in windows of 300
    assert_series_approx_eq!(&values[0], &[149.5, 449.5], 1e-9);
}

#[tokio::test]
async fn test_derived_mean_below_nan_threshold() {
    let source = mock().with_behavior(
        "T1",
        MockBehavior::Values {
            values: vec![1.0],
            status: vec![1, 1, 1, 0],
        },
    );
    let (orchestrator, _) = setup(source).await;
    let (begin, end) = time_range(120);

    let values = orchestrator
        .read_paths(begin, end, &["/MOCK/DATA/T1/1_min_mean"], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap();

    assert!(values[0].iter().all(|v| v.is_nan()));
}

#[tokio::test]
async fn test_bitwise_aggregation() {
    let source = mock().with_behavior(
        "FLAGS",
        MockBehavior::Values {
            values: vec![1.0, 2.0, 4.0],
            status: Vec::new(),
        },
    );
    let (orchestrator, _) = setup(source).await;
    let (begin, end) = time_range(120);

    let values = orchestrator
        .read_paths(
            begin,
            end,
            &["/MOCK/DATA/FLAGS/1_min_max_bitwise", "/MOCK/DATA/FLAGS/1_min_min_bitwise"],
            &|_: f64| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(values[0], vec![7.0, 7.0]);
    assert_eq!(values[1], vec![0.0, 0.0]);
}

#[tokio::test]
async fn test_resampled() {
    let (orchestrator, _) = setup(mock()).await;
    let (begin, end) = time_range(120);

    let values = orchestrator
        .read_paths(begin, end, &[paths::SLOW_RESAMPLED], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap();

    let expected: Vec<f64> = [0.0; 6].into_iter().chain([1.0; 6]).collect();
    assert_eq!(values[0], expected);
}

#[tokio::test]
async fn test_results_in_input_order() {
    let source = mock().with_behavior("T1", MockBehavior::Delay(Duration::from_millis(50)));
    let (orchestrator, _) = setup(source).await;
    let (begin, end) = time_range(60);

    let values = orchestrator
        .read_paths(
            begin,
            end,
            &[paths::T1_NATIVE, paths::SLOW_NATIVE, paths::FLAGS_NATIVE],
            &|_: f64| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(values.len(), 3);
    assert_eq!(values[0].len(), 60);
    assert_eq!(values[1], vec![0.0]);
    assert_eq!(values[2].len(), 60);
}

#[tokio::test]
async fn test_nested_read_through_handler() {
    let source = mock().with_behavior("P1", MockBehavior::ReadThrough(paths::T1_NATIVE.to_string()));
    let (orchestrator, _) = setup(source).await;
    let (begin, end) = time_range(5);

    let values = orchestrator
        .read_paths(begin, end, &["/MOCK/DATA/NESTED/P1/1_s"], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(values[0], ramp(5));
    wait_for_pool_drain(orchestrator.pool()).await;
}

#[tokio::test]
async fn test_empty_batch() {
    let (orchestrator, source) = setup(mock()).await;
    let (begin, end) = time_range(10);

    let values = orchestrator
        .read_many(begin, end, &[], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap();

    assert!(values.is_empty());
    assert_eq!(source.stats().reads_started, 0);
}

// ============================================================================
// Progress
// ============================================================================

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let source = mock().with_behavior("SLOW", MockBehavior::Delay(Duration::from_millis(20)));
    let (orchestrator, _) = setup(source).await;
    let (begin, end) = time_range(600);

    let reported = Mutex::new(Vec::new());
    let progress = |value: f64| reported.lock().unwrap().push(value);

    orchestrator
        .read_paths(
            begin,
            end,
            &[paths::T1_NATIVE, paths::SLOW_NATIVE, paths::FLAGS_NATIVE, paths::T1_MEAN_10MIN],
            &progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let reported = reported.into_inner().unwrap();
    assert_eq!(reported.len(), 4);
    assert!(reported.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(reported.iter().all(|value| (0.0..=1.0).contains(value)));
    assert_eq!(reported.last().copied(), Some(1.0));
}

// ============================================================================
// Failures and cancellation
// ============================================================================

#[tokio::test]
async fn test_failing_item_fails_batch_and_returns_buffers() {
    let source = mock()
        .with_behavior("FLAGS", MockBehavior::FailAfter(Duration::from_millis(50), "boom".into()))
        .with_behavior("SLOW", MockBehavior::WaitForCancel);
    let (orchestrator, source) = setup(source).await;
    let (begin, end) = time_range(120);

    let err = orchestrator
        .read_paths(
            begin,
            end,
            &[paths::T1_NATIVE, paths::FLAGS_NATIVE, paths::SLOW_NATIVE],
            &|_: f64| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match &err {
        PipelineError::BackendRead { path, source } => {
            assert_eq!(path, paths::FLAGS_NATIVE);
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("expected a backend error, got {:?}", other),
    }

    wait_for_pool_drain(orchestrator.pool()).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while source.stats().cancellations_observed == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("the waiting read never observed the cancellation");

    let stats = orchestrator.pool().stats();
    assert_eq!(stats.rented, stats.returned);
}

#[tokio::test]
async fn test_immediate_failure() {
    let source = mock().with_behavior("T1", MockBehavior::Fail("disk gone".into()));
    let (orchestrator, _) = setup(source).await;
    let (begin, end) = time_range(10);

    let err = orchestrator
        .read_paths(begin, end, &[paths::T1_NATIVE], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("disk gone"));
    wait_for_pool_drain(orchestrator.pool()).await;
}

#[tokio::test]
async fn test_caller_cancellation() {
    let source = mock().with_behavior("T1", MockBehavior::WaitForCancel);
    let (orchestrator, source) = setup(source).await;
    let (begin, end) = time_range(10);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = orchestrator
        .read_paths(begin, end, &[paths::T1_NATIVE], &|_: f64| {}, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(source.stats().cancellations_observed, 1);
    wait_for_pool_drain(orchestrator.pool()).await;
}

#[tokio::test]
async fn test_already_cancelled() {
    let (orchestrator, source) = setup(mock()).await;
    let (begin, end) = time_range(10);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator
        .read_paths(begin, end, &[paths::T1_NATIVE], &|_: f64| {}, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(source.stats().reads_finished, 0);
}

// ============================================================================
// Planning errors
// ============================================================================

#[tokio::test]
async fn test_unaligned_time_range() {
    let (orchestrator, source) = setup(mock()).await;
    let (_, end) = time_range(10);

    let err = orchestrator
        .read_paths(unaligned_time(), end, &[paths::T1_NATIVE], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidTimeRange(_)));
    assert_eq!(source.stats().reads_started, 0);
}

#[tokio::test]
async fn test_empty_time_range() {
    let (orchestrator, _) = setup(mock()).await;
    let (begin, _) = time_range(0);

    let err = orchestrator
        .read_paths(begin, begin, &[paths::T1_NATIVE], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidTimeRange(_)));
}

#[tokio::test]
async fn test_unknown_path() {
    let (orchestrator, _) = setup(mock()).await;
    let (begin, end) = time_range(10);

    let err = orchestrator
        .read_paths(begin, end, &["/UNKNOWN/T1/1_s"], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Catalog(_)));
}

#[tokio::test]
async fn test_no_data_source() {
    let source = Arc::new(mock());
    let cache = Arc::new(CatalogCache::new());
    cache
        .refresh(source.as_ref(), "/", &CancellationToken::new())
        .await
        .unwrap();

    let mut registry = DataSourceRegistry::new();
    registry.register("/OTHER", source).unwrap();

    let orchestrator =
        ReadOrchestrator::new(Arc::new(registry), cache, PipelineConfig::default()).unwrap();
    let (begin, end) = time_range(10);

    let err = orchestrator
        .read_paths(begin, end, &[paths::T1_NATIVE], &|_: f64| {}, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoDataSource(id) if id == ids::MOCK));
}

#[test]
fn test_invalid_config_rejected() {
    let config = PipelineConfig {
        max_concurrent_reads: 0,
        ..PipelineConfig::default()
    };

    let result = ReadOrchestrator::new(
        Arc::new(DataSourceRegistry::new()),
        Arc::new(CatalogCache::new()),
        config,
    );

    assert!(matches!(result, Err(PipelineError::Config(_))));
}
