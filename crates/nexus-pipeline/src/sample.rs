//! Built-in data source with synthetic series.
//!
//! Publishes the catalog `/SAMPLE/LOCAL`. Values are pure functions of the
//! sample timestamp, so any range can be read and the result is reproducible.

use std::f64::consts::PI;

use anyhow::bail;
use async_trait::async_trait;
use bytemuck::Pod;
use chrono::{DateTime, TimeZone, Utc};
use nexus_catalog::{
    CatalogRegistration, DataType, Representation, ResourceBuilder, ResourceCatalog,
    ResourceCatalogBuilder, SamplePeriod,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::PipelineError;
use crate::source::{CatalogTimeRange, DataSource, DataSourceContext, ReadDataHandler, ReadRequest};

/// Id of the published catalog.
pub const SAMPLE_CATALOG_ID: &str = "/SAMPLE/LOCAL";

/// Period of the sine series in seconds.
const SINE_PERIOD_SECS: f64 = 600.0;

/// Synthetic data source.
#[derive(Debug, Default)]
pub struct SampleDataSource {
    context: DataSourceContext,
}

impl SampleDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &DataSourceContext {
        &self.context
    }

    /// The published catalog.
    pub fn catalog() -> nexus_catalog::Result<ResourceCatalog> {
        let one_second = SamplePeriod::from_secs(1)?;

        let resources = vec![
            ResourceBuilder::new("T1")
                .with_unit("°C")
                .with_description("Sine wave around 20 °C with a 10 minute period")
                .with_groups(["Environment"])
                .add_representation(Representation::new(DataType::FLOAT64, one_second))
                .build()?,
            ResourceBuilder::new("V1")
                .with_unit("m/s")
                .with_description("Sine wave between 0 and 5 m/s")
                .with_groups(["Environment"])
                .add_representation(Representation::new(DataType::FLOAT32, one_second))
                .build()?,
            ResourceBuilder::new("COUNTER")
                .with_description("Seconds within the current hour")
                .with_groups(["Diagnostics"])
                .add_representation(Representation::new(DataType::INT32, one_second))
                .build()?,
            ResourceBuilder::new("FLAGS")
                .with_description("Rotating single-bit status word")
                .with_groups(["Diagnostics"])
                .add_representation(Representation::new(DataType::UINT8, one_second))
                .build()?,
        ];

        ResourceCatalogBuilder::new(SAMPLE_CATALOG_ID)
            .with_readme("Synthetic series for testing the read pipeline.")
            .with_license("CC0-1.0")
            .add_resources(resources)
            .build()
    }
}

/// Seconds since the epoch of each sample in `begin..end`.
fn sample_times(begin: DateTime<Utc>, period: SamplePeriod, count: usize) -> impl Iterator<Item = f64> {
    let begin = begin.timestamp() as f64 + f64::from(begin.timestamp_subsec_nanos()) / 1e9;
    let step = period.as_nanos() as f64 / 1e9;
    (0..count).map(move |index| begin + index as f64 * step)
}

fn write_values<T: Pod>(data: &mut [u8], values: impl Iterator<Item = T>) {
    let width = std::mem::size_of::<T>();
    for (chunk, value) in data.chunks_exact_mut(width).zip(values) {
        chunk.copy_from_slice(bytemuck::bytes_of(&value));
    }
}

fn sine(seconds: f64) -> f64 {
    (2.0 * PI * seconds / SINE_PERIOD_SECS).sin()
}

#[async_trait]
impl DataSource for SampleDataSource {
    async fn set_context(&mut self, context: DataSourceContext) -> anyhow::Result<()> {
        self.context = context;
        Ok(())
    }

    async fn get_catalog_registrations(
        &self,
        path: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<CatalogRegistration>> {
        if path == "/" {
            Ok(vec![CatalogRegistration::new(
                SAMPLE_CATALOG_ID,
                Some("Simulates a local database".to_string()),
            )?])
        } else {
            Ok(Vec::new())
        }
    }

    async fn get_catalog(
        &self,
        catalog_id: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<ResourceCatalog> {
        if catalog_id != SAMPLE_CATALOG_ID {
            bail!("unknown catalog '{}'", catalog_id);
        }
        Ok(Self::catalog()?)
    }

    async fn get_time_range(
        &self,
        _catalog_id: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<CatalogTimeRange> {
        let begin = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single();
        let end = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single();

        match (begin, end) {
            (Some(begin), Some(end)) => Ok(CatalogTimeRange { begin, end }),
            _ => bail!("invalid sample time range"),
        }
    }

    async fn get_availability(
        &self,
        _catalog_id: &str,
        _begin: DateTime<Utc>,
        _end: DateTime<Utc>,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<f64> {
        Ok(1.0)
    }

    async fn read(
        &self,
        begin: DateTime<Utc>,
        _end: DateTime<Utc>,
        requests: &mut [ReadRequest],
        _read_data: &dyn ReadDataHandler,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let total = requests.len();

        for (index, request) in requests.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled.into());
            }

            let period = request.catalog_item.representation.sample_period();
            let times = sample_times(begin, period, request.element_count());
            let resource_id = request.catalog_item.resource.id().to_string();

            match resource_id.as_str() {
                "T1" => write_values(&mut request.data, times.map(|t| 20.0 + 10.0 * sine(t))),
                "V1" => write_values(&mut request.data, times.map(|t| (2.5 + 2.5 * sine(t)) as f32)),
                "COUNTER" => write_values(&mut request.data, times.map(|t| (t as i64).rem_euclid(3600) as i32)),
                "FLAGS" => write_values(&mut request.data, times.map(|t| 1u8 << ((t as i64).rem_euclid(8)))),
                other => bail!("unknown resource '{}'", other),
            }

            request.mark_all_valid();
            debug!(resource = %resource_id, elements = request.element_count(), "Sample data generated");
            progress((index + 1) as f64 / total as f64);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_valid() {
        let catalog = SampleDataSource::catalog().unwrap();
        assert_eq!(catalog.id(), SAMPLE_CATALOG_ID);
        assert_eq!(catalog.resources().unwrap().len(), 4);
        assert!(catalog.find("/SAMPLE/LOCAL/T1/1_s").is_ok());
    }

    #[test]
    fn test_write_values() {
        let mut data = vec![0u8; 8];
        write_values(&mut data, [1i16, -1, 2, 3].into_iter());
        let values: Vec<i16> = data.chunks_exact(2).map(bytemuck::pod_read_unaligned).collect();
        assert_eq!(values, [1, -1, 2, 3]);
    }

    #[test]
    fn test_sample_times() {
        let begin = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let times: Vec<f64> = sample_times(begin, SamplePeriod::from_millis(500).unwrap(), 3).collect();
        let start = begin.timestamp() as f64;
        assert_eq!(times, [start, start + 0.5, start + 1.0]);
    }

    #[tokio::test]
    async fn test_registrations() {
        let source = SampleDataSource::new();
        let cancel = CancellationToken::new();

        let root = source.get_catalog_registrations("/", &cancel).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].path.as_str(), SAMPLE_CATALOG_ID);

        let children = source.get_catalog_registrations("/SAMPLE/LOCAL/", &cancel).await.unwrap();
        assert!(children.is_empty());

        assert!(source.get_catalog("/OTHER", &cancel).await.is_err());
    }
}
