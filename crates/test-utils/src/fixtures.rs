//! Common test fixtures for nexus tests.
//!
//! This module provides pre-defined catalogs, paths and times that
//! represent common scenarios in catalog resolution and batch reads.

use chrono::{DateTime, Utc};
use nexus_catalog::{
    DataType, Representation, RepresentationKind, Resource, ResourceBuilder, ResourceCatalog,
    ResourceCatalogBuilder, SamplePeriod,
};

/// Catalog ids used across tests.
pub mod ids {
    /// Catalog served by the mock source in most tests
    pub const MOCK: &str = "/MOCK/DATA";

    /// Second catalog, nested below [`MOCK`]
    pub const MOCK_NESTED: &str = "/MOCK/DATA/NESTED";

    /// Catalog nobody serves
    pub const UNKNOWN: &str = "/UNKNOWN";
}

/// Resource paths into the [`mock_catalog`].
pub mod paths {
    /// FLOAT64 sampled every second
    pub const T1_NATIVE: &str = "/MOCK/DATA/T1/1_s";

    /// Five minute mean derived from `T1/1_s`
    pub const T1_MEAN_5MIN: &str = "/MOCK/DATA/T1/5_min_mean";

    /// Stored ten minute mean, next to the one second original
    pub const T1_MEAN_10MIN: &str = "/MOCK/DATA/T1/10_min_mean";

    /// INT16 status word sampled every second
    pub const FLAGS_NATIVE: &str = "/MOCK/DATA/FLAGS/1_s";

    /// UINT16 counter sampled every minute
    pub const SLOW_NATIVE: &str = "/MOCK/DATA/SLOW/1_min";

    /// Ten second resampling of `SLOW/1_min`
    pub const SLOW_RESAMPLED: &str = "/MOCK/DATA/SLOW/10_s_resampled";
}

/// Reference times.
pub mod time {
    use chrono::{DateTime, TimeZone, Utc};

    /// 2020-01-01T00:00:00Z, aligned to every period used in tests
    pub fn begin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    /// `begin()` plus `seconds`
    pub fn after(seconds: i64) -> DateTime<Utc> {
        begin() + chrono::TimeDelta::seconds(seconds)
    }
}

/// A `begin..end` pair spanning `seconds` from [`time::begin`].
pub fn time_range(seconds: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    (time::begin(), time::after(seconds))
}

/// 2020-01-01T00:00:00.5Z, not aligned to whole seconds.
pub fn unaligned_time() -> DateTime<Utc> {
    time::begin() + chrono::TimeDelta::milliseconds(500)
}

/// Shorthand for a period in seconds.
pub fn secs(seconds: i64) -> SamplePeriod {
    SamplePeriod::from_secs(seconds).unwrap()
}

/// Shorthand for a period in minutes.
pub fn minutes(minutes: i64) -> SamplePeriod {
    SamplePeriod::from_minutes(minutes).unwrap()
}

/// A stored mean representation.
pub fn mean(data_type: DataType, period: SamplePeriod) -> Representation {
    Representation::with_details(data_type, period, RepresentationKind::Mean, None).unwrap()
}

/// Resource `T1`: FLOAT64 at 1 s plus a stored 10 min mean.
pub fn temperature_resource() -> Resource {
    ResourceBuilder::new("T1")
        .with_unit("°C")
        .with_description("Air temperature")
        .with_groups(["Environment"])
        .add_representation(Representation::new(DataType::FLOAT64, secs(1)))
        .add_representation(mean(DataType::FLOAT64, minutes(10)))
        .build()
        .unwrap()
}

/// Resource `FLAGS`: INT16 at 1 s.
pub fn flags_resource() -> Resource {
    ResourceBuilder::new("FLAGS")
        .with_description("Status word")
        .add_representation(Representation::new(DataType::INT16, secs(1)))
        .build()
        .unwrap()
}

/// Resource `SLOW`: UINT16 at 1 min.
pub fn slow_resource() -> Resource {
    ResourceBuilder::new("SLOW")
        .with_description("Slow counter")
        .add_representation(Representation::new(DataType::UINT16, minutes(1)))
        .build()
        .unwrap()
}

/// The catalog [`ids::MOCK`] with resources `T1`, `FLAGS` and `SLOW`.
pub fn mock_catalog() -> ResourceCatalog {
    ResourceCatalogBuilder::new(ids::MOCK)
        .with_readme("Catalog for tests.")
        .add_resources([temperature_resource(), flags_resource(), slow_resource()])
        .build()
        .unwrap()
}

/// The catalog [`ids::MOCK_NESTED`] with one resource `P1`.
pub fn nested_catalog() -> ResourceCatalog {
    let resource = ResourceBuilder::new("P1")
        .with_unit("hPa")
        .add_representation(Representation::new(DataType::FLOAT32, secs(1)))
        .build()
        .unwrap();

    ResourceCatalogBuilder::new(ids::MOCK_NESTED)
        .add_resource(resource)
        .build()
        .unwrap()
}
