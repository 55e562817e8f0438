pub mod generator;

pub use generator::{generate, TerrainConfig};

use crate::error::TerrainError;

// ---------------------------------------------------------------------------
// Heightfield
// ---------------------------------------------------------------------------

/// One terrain height per integer x column, in world units (y grows down).
///
/// Immutable once built; radar, detector and physics only read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    heights: Vec<f64>,
}

impl Terrain {
    pub fn from_heights(heights: Vec<f64>) -> Result<Self, TerrainError> {
        if heights.len() < 2 {
            return Err(TerrainError::TooNarrow(heights.len()));
        }
        if let Some(column) = heights.iter().position(|h| !h.is_finite()) {
            return Err(TerrainError::NonFinite { column });
        }
        Ok(Self { heights })
    }

    /// Number of columns; matches the world's horizontal extent.
    pub fn width(&self) -> usize {
        self.heights.len()
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Column index under `x`, clamped into the heightfield.
    pub fn column(&self, x: f64) -> usize {
        if x.is_nan() || x <= 0.0 {
            0
        } else {
            (x as usize).min(self.heights.len() - 1)
        }
    }

    /// Terrain height under world x; out-of-range x reads the nearest edge.
    pub fn height_at(&self, x: f64) -> f64 {
        self.heights[self.column(x)]
    }

    /// Number of line segments between consecutive columns.
    pub fn segment_count(&self) -> usize {
        self.heights.len() - 1
    }

    /// Segment `i` joins `(i, h[i])` and `(i + 1, h[i + 1])`.
    pub fn segment(&self, i: usize) -> Option<((f64, f64), (f64, f64))> {
        let a = *self.heights.get(i)?;
        let b = *self.heights.get(i + 1)?;
        Some(((i as f64, a), ((i + 1) as f64, b)))
    }
}
