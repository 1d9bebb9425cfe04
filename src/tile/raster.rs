//! Rasterization of bulk fetch results into fixed-shape tiles.
//!
//! - Vector tiles: the group's fetches already produced one value per bin;
//!   each tile concatenates the runs of bins that cover its own range.
//! - Matrix tiles: the group's fetch produced sparse contact records over the
//!   group's bounding box; each tile scatters the records that fall inside it
//!   into a zeroed `tile_edge × tile_edge` grid (row-major, row = coord2).
//!
//! - Point-density tiles: raw `(x, y)` points are counted on a
//!   `tile_edge × tile_edge` grid over the tile's square in data coordinates.
//!
//! Gaps mean different things in the two shapes. A missing signal bin is
//! unknown and stays NaN. A missing contact is "no contact observed" and is
//! zero, so NaN contact values are zeroed before scattering. An empty density
//! cell has no points to show and is NaN.

use std::ops::Range;

use crate::dataset::ContactRecord;

/// Dense tile values ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseGrid {
    values: Vec<f32>,
    edge: usize,
    dimensions: usize,
}

impl DenseGrid {
    /// A 1-D grid of `edge` values.
    ///
    /// Shorter input is padded with NaN, longer input is truncated.
    pub fn vector(values: &[f32], edge: usize) -> Self {
        let mut values = values[..values.len().min(edge)].to_vec();
        values.resize(edge, f32::NAN);
        Self {
            values,
            edge,
            dimensions: 1,
        }
    }

    /// A zeroed 2-D grid of `edge × edge` values.
    pub fn zeroed_matrix(edge: usize) -> Self {
        Self {
            values: vec![0.0; edge * edge],
            edge,
            dimensions: 2,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn edge(&self) -> usize {
        self.edge
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_matrix(&self) -> bool {
        self.dimensions == 2
    }

    /// Value at row `i`, column `j` of a matrix grid.
    pub fn at(&self, i: usize, j: usize) -> Option<f32> {
        if !self.is_matrix() || i >= self.edge || j >= self.edge {
            return None;
        }
        self.values.get(i * self.edge + j).copied()
    }
}

// =============================================================================
// Vector
// =============================================================================

/// Concatenate the runs of bins covering one tile, in order.
///
/// A tile left short is padded with NaN, one that runs long is cut at `edge`.
pub fn rasterize_vector<'a, I>(pieces: I, edge: usize) -> DenseGrid
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut values = Vec::with_capacity(edge);
    for piece in pieces {
        let room = edge - values.len();
        if room == 0 {
            break;
        }
        values.extend_from_slice(&piece[..piece.len().min(room)]);
    }
    DenseGrid::vector(&values, edge)
}

// =============================================================================
// Matrix
// =============================================================================

/// Placement of one matrix tile on the absolute axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixWindow {
    /// Absolute start along x (`coord1`)
    pub start1: u64,

    /// Absolute start along y (`coord2`)
    pub start2: u64,

    /// Base pairs per bin
    pub resolution: u64,

    /// Bins per tile edge
    pub edge: usize,
}

impl MatrixWindow {
    fn span(&self) -> u64 {
        self.resolution * self.edge as u64
    }

    fn x(&self) -> Range<u64> {
        self.start1..self.start1 + self.span()
    }

    fn y(&self) -> Range<u64> {
        self.start2..self.start2 + self.span()
    }
}

/// Scatter the records inside `window` into a zeroed grid.
///
/// Records are applied in fetch order; a later record for the same cell
/// overwrites an earlier one.
pub fn rasterize_matrix(records: &[ContactRecord], window: MatrixWindow) -> DenseGrid {
    let mut grid = DenseGrid::zeroed_matrix(window.edge);
    let resolution = window.resolution.max(1);
    let (x, y) = (window.x(), window.y());

    for record in records {
        if !x.contains(&record.coord1) || !y.contains(&record.coord2) {
            continue;
        }
        let i = ((record.coord2 - window.start2) / resolution) as usize;
        let j = ((record.coord1 - window.start1) / resolution) as usize;
        let value = if record.value.is_nan() { 0.0 } else { record.value };
        grid.values[i * window.edge + j] = value;
    }

    grid
}

// =============================================================================
// Point Density
// =============================================================================

/// Square of one point-density tile, in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityWindow {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,

    /// Cells per tile edge
    pub edge: usize,
}

impl DensityWindow {
    /// Bounds of tile `(x, y)` at `zoom`.
    ///
    /// `origin` is the tileset's lowest `(x, y)` and `max_width` the width of
    /// the single zoom-0 tile; each zoom halves the tile width.
    pub fn for_tile(
        origin: (f64, f64),
        max_width: f64,
        zoom: u32,
        (x, y): (i64, i64),
        edge: usize,
    ) -> Self {
        let width = max_width * (-f64::from(zoom)).exp2();
        Self {
            x_start: origin.0 + width * x as f64,
            x_end: origin.0 + width * (x as f64 + 1.0),
            y_start: origin.1 + width * y as f64,
            y_end: origin.1 + width * (y as f64 + 1.0),
            edge,
        }
    }

    /// Whether a point lies strictly inside the window.
    pub fn contains(&self, (x, y): (f64, f64)) -> bool {
        self.x_start < x && x < self.x_end && self.y_start < y && y < self.y_end
    }

    fn cell(&self, offset: f64, width: f64) -> usize {
        ((offset / width * self.edge as f64) as usize).min(self.edge.saturating_sub(1))
    }
}

/// Count the points strictly inside `window` on an `edge × edge` grid.
///
/// Row = y cell, column = x cell. Cells without points are NaN.
pub fn rasterize_density(points: &[(f64, f64)], window: DensityWindow) -> DenseGrid {
    let mut grid = DenseGrid::zeroed_matrix(window.edge);
    let width = window.x_end - window.x_start;
    let height = window.y_end - window.y_start;

    for &(x, y) in points {
        if !window.contains((x, y)) {
            continue;
        }
        let i = window.cell(y - window.y_start, height);
        let j = window.cell(x - window.x_start, width);
        grid.values[i * window.edge + j] += 1.0;
    }

    for count in &mut grid.values {
        if *count == 0.0 {
            *count = f32::NAN;
        }
    }
    grid
}

// =============================================================================
// Tests
// =============================================================================
