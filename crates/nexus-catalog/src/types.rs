//! Data types and representation kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// The numeric encoding of a representation's samples.
///
/// The discriminant encodes the family in the high byte (1 = unsigned,
/// 2 = signed, 3 = floating point) and the width in bits in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum DataType {
    /// Unsigned 8-bit integer.
    UINT8 = 0x108,
    /// Signed 8-bit integer.
    INT8 = 0x208,
    /// Unsigned 16-bit integer.
    UINT16 = 0x110,
    /// Signed 16-bit integer.
    INT16 = 0x210,
    /// Unsigned 32-bit integer.
    UINT32 = 0x120,
    /// Signed 32-bit integer.
    INT32 = 0x220,
    /// Unsigned 64-bit integer.
    UINT64 = 0x140,
    /// Signed 64-bit integer.
    INT64 = 0x240,
    /// 32-bit floating-point number.
    FLOAT32 = 0x320,
    /// 64-bit floating-point number.
    FLOAT64 = 0x340,
}

impl DataType {
    /// All data types, narrowest integers first.
    pub const ALL: [DataType; 10] = [
        DataType::UINT8,
        DataType::INT8,
        DataType::UINT16,
        DataType::INT16,
        DataType::UINT32,
        DataType::INT32,
        DataType::UINT64,
        DataType::INT64,
        DataType::FLOAT32,
        DataType::FLOAT64,
    ];

    /// The numeric code of this data type.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Number of bytes per element.
    pub fn byte_width(self) -> usize {
        usize::from((self.code() & 0xFF) >> 3)
    }

    /// Whether this is an integer type.
    pub fn is_integer(self) -> bool {
        !matches!(self, DataType::FLOAT32 | DataType::FLOAT64)
    }

    /// Whether this is a signed type.
    pub fn is_signed(self) -> bool {
        self.code() >> 8 != 1
    }

    /// Get the type name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UINT8 => "UINT8",
            Self::INT8 => "INT8",
            Self::UINT16 => "UINT16",
            Self::INT16 => "INT16",
            Self::UINT32 => "UINT32",
            Self::INT32 => "INT32",
            Self::UINT64 => "UINT64",
            Self::INT64 => "INT64",
            Self::FLOAT32 => "FLOAT32",
            Self::FLOAT64 => "FLOAT64",
        }
    }
}

impl TryFrom<u16> for DataType {
    type Error = CatalogError;

    fn try_from(code: u16) -> Result<Self> {
        DataType::ALL
            .iter()
            .copied()
            .find(|data_type| data_type.code() == code)
            .ok_or_else(|| CatalogError::validation(format!("the data type {:#x} is not valid", code)))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a representation was derived from its base.
///
/// Discriminants are spaced by ten; codes outside the table are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u16)]
pub enum RepresentationKind {
    /// Native samples as delivered by the backend.
    #[default]
    Original = 0,
    /// Up-sampled from a coarser base by repetition.
    Resampled = 10,
    /// Arithmetic mean.
    Mean = 20,
    /// Circular mean of angles in degrees.
    MeanPolarDeg = 30,
    /// Minimum.
    Min = 40,
    /// Maximum.
    Max = 50,
    /// Standard deviation.
    Std = 60,
    /// Root mean square.
    Rms = 70,
    /// Bitwise AND over integer samples.
    MinBitwise = 80,
    /// Bitwise OR over integer samples.
    MaxBitwise = 90,
    /// Sum.
    Sum = 100,
}

impl RepresentationKind {
    /// All kinds in code order.
    pub const ALL: [RepresentationKind; 11] = [
        RepresentationKind::Original,
        RepresentationKind::Resampled,
        RepresentationKind::Mean,
        RepresentationKind::MeanPolarDeg,
        RepresentationKind::Min,
        RepresentationKind::Max,
        RepresentationKind::Std,
        RepresentationKind::Rms,
        RepresentationKind::MinBitwise,
        RepresentationKind::MaxBitwise,
        RepresentationKind::Sum,
    ];

    /// The numeric code of this kind.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// The id suffix for this kind, `None` for original data.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Original => None,
            Self::Resampled => Some("resampled"),
            Self::Mean => Some("mean"),
            Self::MeanPolarDeg => Some("mean_polar_deg"),
            Self::Min => Some("min"),
            Self::Max => Some("max"),
            Self::Std => Some("std"),
            Self::Rms => Some("rms"),
            Self::MinBitwise => Some("min_bitwise"),
            Self::MaxBitwise => Some("max_bitwise"),
            Self::Sum => Some("sum"),
        }
    }

    /// Look up a kind by its id suffix.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.suffix() == Some(suffix))
    }

    /// Whether this kind reduces a window of finer samples into one value.
    pub fn is_aggregation(self) -> bool {
        !matches!(self, Self::Original | Self::Resampled)
    }

    /// Whether this kind operates on integer bit patterns.
    pub fn is_bitwise(self) -> bool {
        matches!(self, Self::MinBitwise | Self::MaxBitwise)
    }
}

impl TryFrom<u16> for RepresentationKind {
    type Error = CatalogError;

    fn try_from(code: u16) -> Result<Self> {
        RepresentationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.code() == code)
            .ok_or_else(|| {
                CatalogError::validation(format!("the representation kind {} is not valid", code))
            })
    }
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix().unwrap_or("original"))
    }
}
