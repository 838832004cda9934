//! Window aggregation and resampling of base series.
//!
//! A derived representation with period `P` over a base with period `p`
//! reduces each window of `P / p` base samples to one value. `NaN` base
//! samples are skipped; when the valid fraction of a window is below the
//! threshold the result is `NaN`.
//!
//! Work is split into blocks of whole windows; each block checks the
//! cancellation token before it starts.

use bytemuck::Pod;
use nexus_catalog::{DataType, RepresentationKind};
use num_traits::{AsPrimitive, PrimInt};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::cast::check_lengths;
use crate::error::{PipelineError, Result};

/// Settings shared by the reductions.
#[derive(Debug, Clone, Copy)]
pub struct ReduceOptions<'a> {
    /// Minimum fraction of valid base samples per window.
    pub nan_threshold: f64,
    /// Approximate number of base samples per block.
    pub chunk_size: usize,
    pub cancel: &'a CancellationToken,
}

impl ReduceOptions<'_> {
    /// Output values per block so that a block covers about `chunk_size`
    /// base samples.
    fn windows_per_block(&self, window: usize) -> usize {
        (self.chunk_size / window.max(1)).max(1)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Aggregate `base` window by window into `output`.
///
/// `base.len()` must equal `output.len() * window`. Bitwise kinds are
/// rejected here; use [`aggregate_bitwise`] on the raw buffer instead.
pub fn aggregate(
    kind: RepresentationKind,
    base: &[f64],
    window: usize,
    output: &mut [f64],
    options: &ReduceOptions<'_>,
) -> Result<()> {
    check_window(base.len(), window, output.len())?;

    let reduce: fn(&[f64]) -> f64 = match kind {
        RepresentationKind::Mean => mean,
        RepresentationKind::MeanPolarDeg => mean_polar_deg,
        RepresentationKind::Min => min,
        RepresentationKind::Max => max,
        RepresentationKind::Std => std_dev,
        RepresentationKind::Rms => rms,
        RepresentationKind::Sum => sum,
        other => {
            return Err(PipelineError::config(format!(
                "'{}' is not a floating-point aggregation",
                other
            )))
        }
    };

    let block = options.windows_per_block(window);

    output
        .par_chunks_mut(block)
        .zip(base.par_chunks(block * window))
        .try_for_each_init(Vec::new, |valid, (out, samples)| {
            options.check_cancelled()?;

            for (value, samples) in out.iter_mut().zip(samples.chunks(window)) {
                valid.clear();
                valid.extend(samples.iter().copied().filter(|v| !v.is_nan()));

                *value = if enough_valid(valid.len(), window, options.nan_threshold) {
                    reduce(valid)
                } else {
                    f64::NAN
                };
            }

            Ok(())
        })
}

/// Aggregate raw integer samples with bitwise AND (`MinBitwise`) or OR
/// (`MaxBitwise`).
pub fn aggregate_bitwise(
    kind: RepresentationKind,
    data_type: DataType,
    data: &[u8],
    status: &[u8],
    window: usize,
    output: &mut [f64],
    options: &ReduceOptions<'_>,
) -> Result<()> {
    check_lengths(data_type, data.len(), status.len(), status.len())?;
    check_window(status.len(), window, output.len())?;

    let and = match kind {
        RepresentationKind::MinBitwise => true,
        RepresentationKind::MaxBitwise => false,
        other => {
            return Err(PipelineError::config(format!(
                "'{}' is not a bitwise aggregation",
                other
            )))
        }
    };

    let args = BitwiseArgs {
        data,
        status,
        window,
        and,
        options,
    };

    match data_type {
        DataType::UINT8 => bitwise_typed::<u8>(args, output),
        DataType::INT8 => bitwise_typed::<i8>(args, output),
        DataType::UINT16 => bitwise_typed::<u16>(args, output),
        DataType::INT16 => bitwise_typed::<i16>(args, output),
        DataType::UINT32 => bitwise_typed::<u32>(args, output),
        DataType::INT32 => bitwise_typed::<i32>(args, output),
        DataType::UINT64 => bitwise_typed::<u64>(args, output),
        DataType::INT64 => bitwise_typed::<i64>(args, output),
        DataType::FLOAT32 | DataType::FLOAT64 => Err(PipelineError::config(format!(
            "bitwise aggregation requires integer data, found {}",
            data_type
        ))),
    }
}

/// Repeat each coarse base value `factor` times.
///
/// `offset` is the number of fine samples between the start of the base
/// series and the first output sample.
pub fn resample(
    base: &[f64],
    factor: usize,
    offset: usize,
    output: &mut [f64],
    options: &ReduceOptions<'_>,
) -> Result<()> {
    if factor == 0 {
        return Err(PipelineError::config("resampling factor must be > 0"));
    }

    let needed = (offset + output.len()).div_ceil(factor);
    if base.len() < needed {
        return Err(PipelineError::buffer_size(format!(
            "resampling needs {} base samples, got {}",
            needed,
            base.len()
        )));
    }

    let block = options.chunk_size.max(1);

    output
        .par_chunks_mut(block)
        .enumerate()
        .try_for_each(|(block_index, out)| {
            options.check_cancelled()?;

            let start = offset + block_index * block;
            for (index, value) in out.iter_mut().enumerate() {
                *value = base[(start + index) / factor];
            }

            Ok(())
        })
}

fn check_window(base_len: usize, window: usize, output_len: usize) -> Result<()> {
    if window == 0 || base_len != output_len * window {
        return Err(PipelineError::buffer_size(format!(
            "{} base samples do not form {} windows of {}",
            base_len, output_len, window
        )));
    }
    Ok(())
}

fn enough_valid(valid: usize, window: usize, nan_threshold: f64) -> bool {
    valid > 0 && valid as f64 / window as f64 >= nan_threshold
}

fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

fn mean(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn rms(values: &[f64]) -> f64 {
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

/// Circular mean of angles in degrees, normalized to `[0, 360)`.
fn mean_polar_deg(values: &[f64]) -> f64 {
    let (sin, cos) = values.iter().fold((0.0, 0.0), |(sin, cos), v| {
        let radians = v.to_radians();
        (sin + radians.sin(), cos + radians.cos())
    });

    let degrees = sin.atan2(cos).to_degrees();
    if degrees < 0.0 {
        degrees + 360.0
    } else {
        degrees
    }
}

#[derive(Clone, Copy)]
struct BitwiseArgs<'a> {
    data: &'a [u8],
    status: &'a [u8],
    window: usize,
    and: bool,
    options: &'a ReduceOptions<'a>,
}

fn bitwise_typed<T>(args: BitwiseArgs<'_>, output: &mut [f64]) -> Result<()>
where
    T: Pod + PrimInt + AsPrimitive<f64>,
{
    let width = std::mem::size_of::<T>();
    let window = args.window;
    let block = args.options.windows_per_block(window);

    output
        .par_chunks_mut(block)
        .zip(args.status.par_chunks(block * window))
        .zip(args.data.par_chunks(block * window * width))
        .try_for_each(|((out, status), raw)| {
            args.options.check_cancelled()?;

            for ((value, status), raw) in out
                .iter_mut()
                .zip(status.chunks(window))
                .zip(raw.chunks(window * width))
            {
                let mut valid = 0;
                let mut acc = if args.and { !T::zero() } else { T::zero() };

                for (flag, bytes) in status.iter().zip(raw.chunks_exact(width)) {
                    if *flag != 1 {
                        continue;
                    }
                    let sample: T = bytemuck::pod_read_unaligned(bytes);
                    acc = if args.and { acc & sample } else { acc | sample };
                    valid += 1;
                }

                *value = if enough_valid(valid, window, args.options.nan_threshold) {
                    acc.as_()
                } else {
                    f64::NAN
                };
            }

            Ok(())
        })
}
