//! Numeric tile encoder.
//!
//! Dense tiles are shipped as base64 text over little-endian floats. Each tile
//! picks its own width:
//!
//! - **float16** when every value is finite and both extrema lie strictly
//!   inside the half-precision range. Halves the payload at a precision loss
//!   visualization tolerates.
//! - **float32** otherwise (any NaN or infinity, or values too large).
//!
//! The choice is made per tile from that tile's values alone, never from a
//! neighbour in the same fetch group.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use half::f16;
use serde::Serialize;

use super::raster::DenseGrid;

// =============================================================================
// Encoded Tile
// =============================================================================

/// Float width of an encoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DType {
    #[serde(rename = "float16")]
    Float16,
    #[serde(rename = "float32")]
    Float32,
}

impl DType {
    /// Bytes per value.
    pub fn width(self) -> usize {
        match self {
            DType::Float16 => 2,
            DType::Float32 => 4,
        }
    }
}

/// An encoded tile, the unit returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedTile {
    /// Base64 of the little-endian values
    pub dense: String,

    /// Width of each encoded value
    pub dtype: DType,

    /// Smallest finite value (0 when there is none)
    pub min_value: f32,

    /// Largest finite value, recorded for matrix tiles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f32>,
}

impl EncodedTile {
    /// Decode the payload back to f32 values.
    pub fn decode(&self) -> Result<Vec<f32>, base64::DecodeError> {
        let bytes = STANDARD.decode(&self.dense)?;
        let values = match self.dtype {
            DType::Float16 => bytes
                .chunks_exact(2)
                .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
            DType::Float32 => bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        };
        Ok(values)
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Stateless encoder from [`DenseGrid`] to [`EncodedTile`].
#[derive(Debug, Clone, Default)]
pub struct NumericEncoder {}

impl NumericEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Encode one tile.
    pub fn encode(&self, grid: &DenseGrid) -> EncodedTile {
        let values = grid.values();
        let (min, max) = finite_extrema(values).unwrap_or((0.0, 0.0));
        let dtype = choose_dtype(values);

        let bytes: Vec<u8> = match dtype {
            DType::Float16 => values
                .iter()
                .flat_map(|v| f16::from_f32(*v).to_le_bytes())
                .collect(),
            DType::Float32 => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        };

        EncodedTile {
            dense: STANDARD.encode(bytes),
            dtype,
            min_value: min,
            max_value: grid.is_matrix().then_some(max),
        }
    }
}

/// Pick the narrowest width that represents `values` safely.
pub fn choose_dtype(values: &[f32]) -> DType {
    if values.iter().any(|v| !v.is_finite()) {
        return DType::Float32;
    }
    let Some((min, max)) = finite_extrema(values) else {
        return DType::Float16;
    };

    let lo = f16::MIN.to_f32();
    let hi = f16::MAX.to_f32();
    if min > lo && max < hi {
        DType::Float16
    } else {
        DType::Float32
    }
}

/// Minimum and maximum over the finite values, `None` if there are none.
pub fn finite_extrema(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

// =============================================================================
// Tests
// =============================================================================
