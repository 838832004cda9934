//! Configuration for the read pipeline.

use serde::{Deserialize, Serialize};

/// Configuration for the read pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of data source reads running at once within a batch.
    pub max_concurrent_reads: usize,

    /// Number of elements converted between two cancellation checks.
    pub cast_chunk_size: usize,

    /// Minimum fraction of valid base samples for an aggregated value.
    pub aggregation_nan_threshold: f64,

    /// Number of released buffers kept for reuse.
    pub pool_max_retained: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reads: 16,
            cast_chunk_size: 65536,
            aggregation_nan_threshold: 0.99,
            pool_max_retained: 64,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("NEXUS_MAX_CONCURRENT_READS") {
            if let Ok(count) = val.parse() {
                config.max_concurrent_reads = count;
            }
        }

        if let Ok(val) = std::env::var("NEXUS_CAST_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.cast_chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("NEXUS_AGGREGATION_NAN_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                config.aggregation_nan_threshold = threshold;
            }
        }

        if let Ok(val) = std::env::var("NEXUS_POOL_MAX_RETAINED") {
            if let Ok(count) = val.parse() {
                config.pool_max_retained = count;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_reads == 0 {
            return Err("max_concurrent_reads must be > 0".to_string());
        }

        if self.cast_chunk_size == 0 {
            return Err("cast_chunk_size must be > 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.aggregation_nan_threshold) {
            return Err("aggregation_nan_threshold must be within 0.0-1.0".to_string());
        }

        Ok(())
    }
}
