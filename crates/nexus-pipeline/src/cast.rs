//! Conversion of raw sample buffers into `f64`.
//!
//! The raw buffer holds native-endian values of the representation's data
//! type; the status buffer holds one byte per element where `1` marks a
//! valid sample. Invalid samples become `NaN`. 64-bit integers beyond 2^53
//! lose precision.

use bytemuck::Pod;
use nexus_catalog::DataType;
use num_traits::AsPrimitive;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};

/// Convert `data` into `output`, masking by `status`.
///
/// The work is split into chunks of `chunk_size` elements converted in
/// parallel; each chunk checks `cancel` before it starts.
pub fn cast_to_f64(
    data_type: DataType,
    data: &[u8],
    status: &[u8],
    output: &mut [f64],
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    check_lengths(data_type, data.len(), status.len(), output.len())?;

    match data_type {
        DataType::UINT8 => cast_typed::<u8>(data, status, output, chunk_size, cancel),
        DataType::INT8 => cast_typed::<i8>(data, status, output, chunk_size, cancel),
        DataType::UINT16 => cast_typed::<u16>(data, status, output, chunk_size, cancel),
        DataType::INT16 => cast_typed::<i16>(data, status, output, chunk_size, cancel),
        DataType::UINT32 => cast_typed::<u32>(data, status, output, chunk_size, cancel),
        DataType::INT32 => cast_typed::<i32>(data, status, output, chunk_size, cancel),
        DataType::UINT64 => cast_typed::<u64>(data, status, output, chunk_size, cancel),
        DataType::INT64 => cast_typed::<i64>(data, status, output, chunk_size, cancel),
        DataType::FLOAT32 => cast_typed::<f32>(data, status, output, chunk_size, cancel),
        DataType::FLOAT64 => cast_typed::<f64>(data, status, output, chunk_size, cancel),
    }
}

/// Convert into a freshly allocated vector.
pub fn cast_to_vec(
    data_type: DataType,
    data: &[u8],
    status: &[u8],
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<Vec<f64>> {
    let mut output = vec![0.0; status.len()];
    cast_to_f64(data_type, data, status, &mut output, chunk_size, cancel)?;
    Ok(output)
}

pub(crate) fn check_lengths(
    data_type: DataType,
    data_len: usize,
    status_len: usize,
    output_len: usize,
) -> Result<()> {
    if status_len != output_len {
        return Err(PipelineError::buffer_size(format!(
            "status buffer has {} elements, output has {}",
            status_len, output_len
        )));
    }

    let expected = output_len * data_type.byte_width();
    if data_len != expected {
        return Err(PipelineError::buffer_size(format!(
            "data buffer has {} bytes, expected {} for {} {} elements",
            data_len, expected, output_len, data_type
        )));
    }

    Ok(())
}

fn cast_typed<T>(
    data: &[u8],
    status: &[u8],
    output: &mut [f64],
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<()>
where
    T: Pod + AsPrimitive<f64>,
{
    let width = std::mem::size_of::<T>();
    let chunk_size = chunk_size.max(1);

    output
        .par_chunks_mut(chunk_size)
        .zip(status.par_chunks(chunk_size))
        .zip(data.par_chunks(chunk_size * width))
        .try_for_each(|((out, status), raw)| {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            for ((value, flag), bytes) in out.iter_mut().zip(status).zip(raw.chunks_exact(width)) {
                *value = if *flag == 1 {
                    bytemuck::pod_read_unaligned::<T>(bytes).as_()
                } else {
                    f64::NAN
                };
            }

            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of<T: Pod>(values: &[T]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn test_int16_with_status() {
        let data = bytes_of(&[10i16, -5, 0, 32767]);
        let status = [1u8, 1, 0, 1];

        let output = cast_to_vec(DataType::INT16, &data, &status, 2, &CancellationToken::new()).unwrap();

        assert_eq!(output[0], 10.0);
        assert_eq!(output[1], -5.0);
        assert!(output[2].is_nan());
        assert_eq!(output[3], 32767.0);
    }

    #[test]
    fn test_status_other_than_one_is_invalid() {
        let data = bytes_of(&[1u32, 2, 3]);
        let status = [1u8, 2, 255];

        let output = cast_to_vec(DataType::UINT32, &data, &status, 64, &CancellationToken::new()).unwrap();

        assert_eq!(output[0], 1.0);
        assert!(output[1].is_nan());
        assert!(output[2].is_nan());
    }

    #[test]
    fn test_all_types() {
        let cancel = CancellationToken::new();
        let status = [1u8, 1];

        let cases: Vec<(DataType, Vec<u8>, [f64; 2])> = vec![
            (DataType::UINT8, bytes_of(&[0u8, 255]), [0.0, 255.0]),
            (DataType::INT8, bytes_of(&[-128i8, 127]), [-128.0, 127.0]),
            (DataType::UINT16, bytes_of(&[0u16, 65535]), [0.0, 65535.0]),
            (DataType::INT32, bytes_of(&[i32::MIN, 7]), [i32::MIN as f64, 7.0]),
            (DataType::UINT64, bytes_of(&[1u64 << 40, 3]), [(1u64 << 40) as f64, 3.0]),
            (DataType::INT64, bytes_of(&[-1i64, 9]), [-1.0, 9.0]),
            (DataType::FLOAT32, bytes_of(&[1.5f32, -0.25]), [1.5, -0.25]),
            (DataType::FLOAT64, bytes_of(&[1e300f64, -2.0]), [1e300, -2.0]),
        ];

        for (data_type, data, expected) in cases {
            let output = cast_to_vec(data_type, &data, &status, 1, &cancel).unwrap();
            assert_eq!(output, expected, "{}", data_type);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let cancel = CancellationToken::new();
        let mut output = [0.0; 2];

        let err = cast_to_f64(DataType::INT16, &[0u8; 3], &[1, 1], &mut output, 8, &cancel).unwrap_err();
        assert!(matches!(err, PipelineError::BufferSize(_)));

        let err = cast_to_f64(DataType::INT16, &[0u8; 4], &[1], &mut output, 8, &cancel).unwrap_err();
        assert!(matches!(err, PipelineError::BufferSize(_)));
    }

    #[test]
    fn test_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let data = bytes_of(&[1.0f64; 16]);
        let err = cast_to_vec(DataType::FLOAT64, &data, &[1u8; 16], 4, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_large_parallel_cast() {
        let values: Vec<i32> = (0..100_000).collect();
        let status: Vec<u8> = values.iter().map(|v| (v % 10 != 0) as u8).collect();

        let output = cast_to_vec(
            DataType::INT32,
            &bytes_of(&values),
            &status,
            1000,
            &CancellationToken::new(),
        )
        .unwrap();

        for (index, value) in output.iter().enumerate() {
            if index % 10 == 0 {
                assert!(value.is_nan());
            } else {
                assert_eq!(*value, index as f64);
            }
        }
    }
}
