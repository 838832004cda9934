//! Test data generators for raw sample buffers.
//!
//! Data sources hand the pipeline native-endian bytes plus a status mask;
//! these helpers build both from plain `f64` values so tests can state their
//! expectations in the same numbers.

use nexus_catalog::DataType;

/// Creates `count` values `0.0, 1.0, 2.0, ...`.
///
/// # Example
///
/// ```
/// use test_utils::ramp;
///
/// assert_eq!(ramp(3), vec![0.0, 1.0, 2.0]);
/// ```
pub fn ramp(count: usize) -> Vec<f64> {
    (0..count).map(|i| i as f64).collect()
}

/// Creates a status mask where every `every`-th element (starting at 0) is
/// invalid. `every == 0` marks everything valid.
///
/// # Example
///
/// ```
/// use test_utils::status_with_gaps;
///
/// assert_eq!(status_with_gaps(5, 2), vec![0, 1, 0, 1, 0]);
/// ```
pub fn status_with_gaps(count: usize, every: usize) -> Vec<u8> {
    (0..count)
        .map(|i| if every != 0 && i % every == 0 { 0 } else { 1 })
        .collect()
}

/// Encodes `values` as native-endian bytes of `data_type`.
///
/// Values are converted with `as`, so out-of-range values saturate and
/// fractions are truncated for integer types.
pub fn encode_as(data_type: DataType, values: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * data_type.byte_width());

    for &value in values {
        match data_type {
            DataType::UINT8 => bytes.extend_from_slice(&(value as u8).to_ne_bytes()),
            DataType::INT8 => bytes.extend_from_slice(&(value as i8).to_ne_bytes()),
            DataType::UINT16 => bytes.extend_from_slice(&(value as u16).to_ne_bytes()),
            DataType::INT16 => bytes.extend_from_slice(&(value as i16).to_ne_bytes()),
            DataType::UINT32 => bytes.extend_from_slice(&(value as u32).to_ne_bytes()),
            DataType::INT32 => bytes.extend_from_slice(&(value as i32).to_ne_bytes()),
            DataType::UINT64 => bytes.extend_from_slice(&(value as u64).to_ne_bytes()),
            DataType::INT64 => bytes.extend_from_slice(&(value as i64).to_ne_bytes()),
            DataType::FLOAT32 => bytes.extend_from_slice(&(value as f32).to_ne_bytes()),
            DataType::FLOAT64 => bytes.extend_from_slice(&value.to_ne_bytes()),
        }
    }

    bytes
}

/// Encodes typed values as their raw bytes.
pub fn bytes_of<T: bytemuck::Pod>(values: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}
