//! Zoom levels and their resolutions.
//!
//! Zoom 0 is a single tile covering the whole extent; each following zoom
//! halves the bin size until the finest level. Tiles always hold `tile_edge`
//! bins per dimension, so the base-pair span of a tile at zoom `z` is
//! `tile_edge * bin_size(z)`.
//!
//! ```text
//! extent = 3000, tile_edge = 1000
//!
//! zoom 0  |-------------------- 4000 --------------------|      bin 4
//! zoom 1  |-------- 2000 --------|-------- 2000 ---------|      bin 2
//! zoom 2  |-- 1000 --|-- 1000 ---|-- 1000 ---|-- (past) -|      bin 1
//! ```

use std::ops::Range;

/// Per-zoom bin sizes for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomResolutionTable {
    /// Bins per tile edge
    tile_edge: u64,

    /// Base pairs per bin, indexed by zoom (0 = coarsest)
    bin_sizes: Vec<u64>,

    /// Total base pairs covered
    extent: u64,

    /// Whether `bin_sizes` was derived from `extent` (vs. listed explicitly)
    derived_from_extent: bool,
}

impl ZoomResolutionTable {
    /// Derive power-of-two zoom levels from an extent, 1 bp per bin at the
    /// finest zoom.
    pub fn from_extent(extent: u64, tile_edge: u64) -> Self {
        let tile_edge = tile_edge.max(1);
        let max_zoom = max_zoom_for_extent(extent, tile_edge);
        let bin_sizes = (0..=max_zoom).map(|z| 1u64 << (max_zoom - z)).collect();

        Self {
            tile_edge,
            bin_sizes,
            extent,
            derived_from_extent: true,
        }
    }

    /// Use an explicit list of resolutions (bp per bin), e.g. from a
    /// multi-resolution matrix file.
    ///
    /// Zoom `z` maps to the `z`-th coarsest resolution. Returns `None` when no
    /// positive resolution is given.
    pub fn from_resolutions<I>(resolutions: I, tile_edge: u64, extent: u64) -> Option<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut bin_sizes: Vec<u64> = resolutions.into_iter().filter(|&r| r > 0).collect();
        if bin_sizes.is_empty() {
            return None;
        }
        bin_sizes.sort_unstable_by(|a, b| b.cmp(a));
        bin_sizes.dedup();

        Some(Self {
            tile_edge: tile_edge.max(1),
            bin_sizes,
            extent,
            derived_from_extent: false,
        })
    }

    /// Same resolution scheme over a different extent.
    ///
    /// Extent-derived tables are recomputed (the max zoom may change); explicit
    /// resolution lists are kept as they are.
    pub fn with_extent(&self, extent: u64) -> Self {
        if self.derived_from_extent {
            Self::from_extent(extent, self.tile_edge)
        } else {
            Self {
                extent,
                ..self.clone()
            }
        }
    }

    pub fn tile_edge(&self) -> u64 {
        self.tile_edge
    }

    pub fn extent(&self) -> u64 {
        self.extent
    }

    pub fn is_derived_from_extent(&self) -> bool {
        self.derived_from_extent
    }

    /// Highest valid zoom level.
    pub fn max_zoom(&self) -> u32 {
        (self.bin_sizes.len() - 1) as u32
    }

    /// Bin sizes indexed by zoom.
    pub fn bin_sizes(&self) -> &[u64] {
        &self.bin_sizes
    }

    /// Base pairs per bin at `zoom`.
    pub fn bin_size(&self, zoom: u32) -> Option<u64> {
        self.bin_sizes.get(zoom as usize).copied()
    }

    /// Base pairs covered by one tile at `zoom`.
    pub fn tile_span(&self, zoom: u32) -> Option<u64> {
        Some(self.bin_size(zoom)? * self.tile_edge)
    }

    /// Width of the single zoom-0 tile.
    pub fn max_width(&self) -> u64 {
        self.bin_sizes[0] * self.tile_edge
    }

    /// Number of tiles needed to cover the extent at `zoom`.
    pub fn tiles_at_zoom(&self, zoom: u32) -> Option<u64> {
        Some(self.extent.div_ceil(self.tile_span(zoom)?))
    }

    /// Absolute range of the tile at `position`, unclipped.
    pub fn tile_range(&self, zoom: u32, position: u64) -> Option<Range<u64>> {
        let span = self.tile_span(zoom)?;
        let start = position.checked_mul(span)?;
        Some(start..start.checked_add(span)?)
    }
}

/// `ceil(log2(ceil(extent / tile_edge)))`, or 0 when one tile suffices.
pub fn max_zoom_for_extent(extent: u64, tile_edge: u64) -> u32 {
    let tiles = extent.div_ceil(tile_edge.max(1));
    if tiles <= 1 {
        0
    } else {
        u64::BITS - (tiles - 1).leading_zeros()
    }
}

// =============================================================================
// Tests
// =============================================================================
