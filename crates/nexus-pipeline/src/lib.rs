//! Buffered read pipeline for catalog items.
//!
//! Reads fan out to data sources concurrently. Each read fills a pooled raw
//! byte buffer plus a validity mask, which are converted into `f64` series
//! (and aggregated or resampled for derived representations) on the
//! blocking thread pool.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nexus_pipeline::{CatalogCache, DataSourceRegistry, PipelineConfig, ReadOrchestrator, SampleDataSource};
//!
//! let source = Arc::new(SampleDataSource::new());
//! let mut registry = DataSourceRegistry::new();
//! registry.register("/SAMPLE", source.clone())?;
//!
//! let catalogs = Arc::new(CatalogCache::new());
//! catalogs.refresh(source.as_ref(), "/", &cancel).await?;
//!
//! let orchestrator = ReadOrchestrator::new(Arc::new(registry), catalogs, PipelineConfig::default())?;
//! let series = orchestrator
//!     .read_paths(begin, end, &["/SAMPLE/LOCAL/T1/1_min_mean"], &|p| println!("{:.0}%", p * 100.0), &cancel)
//!     .await?;
//! ```

pub mod aggregation;
pub mod buffers;
pub mod cache;
pub mod cast;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod registry;
pub mod sample;
pub mod source;

// Re-export commonly used types at crate root
pub use buffers::{create_buffers, element_count, validate_time_range};
pub use cache::CatalogCache;
pub use cast::{cast_to_f64, cast_to_vec};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use orchestrator::ReadOrchestrator;
pub use pool::{BufferPool, PoolStats, PooledBuffer};
pub use registry::{DataSourceRegistry, DataSourceResolver};
pub use sample::{SampleDataSource, SAMPLE_CATALOG_ID};
pub use source::{CatalogTimeRange, DataSource, DataSourceContext, ReadDataHandler, ReadRequest};
