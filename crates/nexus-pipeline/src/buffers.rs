//! Time range arithmetic and read buffer allocation.

use chrono::{DateTime, TimeDelta, Utc};
use nexus_catalog::{Representation, SamplePeriod};

use crate::error::{PipelineError, Result};
use crate::pool::{BufferPool, PooledBuffer};

/// Nanoseconds since the Unix epoch.
pub(crate) fn epoch_nanos(time: DateTime<Utc>) -> Result<i64> {
    time.timestamp_nanos_opt().ok_or_else(|| {
        PipelineError::invalid_time_range(format!("{} is outside the supported range", time))
    })
}

/// Check that `begin < end` and that both are multiples of `period`.
pub fn validate_time_range(
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
    period: SamplePeriod,
) -> Result<()> {
    if begin >= end {
        return Err(PipelineError::invalid_time_range(format!(
            "the begin {} must be before the end {}",
            begin, end
        )));
    }

    let step = period.as_nanos();
    for (name, time) in [("begin", begin), ("end", end)] {
        if epoch_nanos(time)?.rem_euclid(step) != 0 {
            return Err(PipelineError::invalid_time_range(format!(
                "the {} {} is not a multiple of the sample period {}",
                name, time, period
            )));
        }
    }

    Ok(())
}

/// Number of samples of `period` between `begin` and `end`.
pub fn element_count(
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
    period: SamplePeriod,
) -> Result<usize> {
    validate_time_range(begin, end, period)?;

    let span = epoch_nanos(end)? - epoch_nanos(begin)?;
    usize::try_from(span / period.as_nanos())
        .map_err(|_| PipelineError::invalid_time_range("time range is too large"))
}

/// Round `time` down to a multiple of `period`.
pub(crate) fn floor_to(time: DateTime<Utc>, period: SamplePeriod) -> Result<DateTime<Utc>> {
    let nanos = epoch_nanos(time)?;
    let offset = nanos.rem_euclid(period.as_nanos());
    Ok(time - TimeDelta::nanoseconds(offset))
}

/// Round `time` up to a multiple of `period`.
pub(crate) fn ceil_to(time: DateTime<Utc>, period: SamplePeriod) -> Result<DateTime<Utc>> {
    let floored = floor_to(time, period)?;
    if floored == time {
        Ok(time)
    } else {
        Ok(floored + period.as_time_delta())
    }
}

/// Rent the data and status buffers for reading `representation` over
/// `begin..end`.
///
/// The data buffer holds `element_count * element_size` bytes, the status
/// buffer one byte per element.
pub fn create_buffers(
    pool: &BufferPool,
    representation: &Representation,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(PooledBuffer, PooledBuffer)> {
    let count = element_count(begin, end, representation.sample_period())?;

    let data_len = count
        .checked_mul(representation.element_size())
        .ok_or_else(|| PipelineError::buffer_size(format!("{} elements overflow", count)))?;

    Ok((pool.rent(data_len), pool.rent(count)))
}
