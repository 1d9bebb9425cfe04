//! Fetch planning.
//!
//! Turns validated tile coordinates into the bulk fetches that serve them,
//! without touching any dataset. [`crate::tile::TileService`] executes these
//! plans; the `plan` CLI command prints them.
//!
//! ```text
//! tiles ─► admit ─► bucket (dataset, options, zoom, transform)
//!                     └─► partition into adjacent groups
//!                           └─► plan_group ─► FetchPlan
//! ```

use std::ops::Range;

use serde::Serialize;

use crate::dataset::{DataKind, DatasetMetadata, FetchRequest};
use crate::error::TileError;
use crate::genome::{segments, GenomicSegment};

use super::id::TileCoordinate;
use super::partition::{bucket_by_zoom_and_transform, partition_by_adjacent_tiles};

// =============================================================================
// Admission
// =============================================================================

/// Why a tile was left out of the output without being an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    /// Zoom is past the dataset's finest level
    ZoomOutOfRange { zoom: u32, max_zoom: u32 },

    /// Position is negative or past the last tile at this zoom
    OutOfBoundsPosition { position: Vec<i64>, tiles_at_zoom: u64 },
}

/// A tile that will not be rendered.
#[derive(Debug, Clone)]
pub enum Rejection {
    Dropped(DropReason),
    Failed(TileError),
}

/// Check a parsed tile against the dataset it addresses.
pub fn admit(metadata: &DatasetMetadata, tile: &TileCoordinate) -> Result<(), Rejection> {
    let max_zoom = metadata.max_zoom();
    let tiles_at_zoom = match metadata.zoom_levels.tiles_at_zoom(tile.zoom) {
        Some(n) if tile.zoom <= max_zoom => n,
        _ => {
            return Err(Rejection::Dropped(DropReason::ZoomOutOfRange {
                zoom: tile.zoom,
                max_zoom,
            }))
        }
    };

    let in_bounds = tile
        .position
        .iter()
        .all(|&p| p >= 0 && (p as u64) < tiles_at_zoom);
    if !in_bounds {
        return Err(Rejection::Dropped(DropReason::OutOfBoundsPosition {
            position: tile.position.clone(),
            tiles_at_zoom,
        }));
    }

    if !metadata.supports_transform(&tile.transform) {
        return Err(Rejection::Failed(TileError::UnknownTransform {
            transform: tile.transform.clone(),
            available: metadata.transforms.clone(),
        }));
    }

    Ok(())
}

// =============================================================================
// Group Plans
// =============================================================================

/// One bulk fetch of a vector group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSegment {
    /// Fetch to issue, `None` for the zero-filled part past the genome end
    pub request: Option<FetchRequest>,

    /// Bins the fetch returns
    pub fetch_bins: usize,
}

impl PlannedSegment {
    fn new(piece: &GenomicSegment<'_>, bin_size: u64, transform: &str) -> Self {
        let fetch_bins = piece.fetch_bins(bin_size);
        let request = match *piece {
            GenomicSegment::Mapped { chrom, start, end } => Some(FetchRequest::Vector {
                chrom: chrom.name.clone(),
                start,
                end,
                bins: fetch_bins,
                transform: transform.to_string(),
            }),
            GenomicSegment::Zeroed { .. } => None,
        };
        Self {
            request,
            fetch_bins,
        }
    }

    /// Extend this fetch over the piece that directly follows it.
    ///
    /// Only possible when both lie in the same chromosome (or both past the
    /// genome end) and this fetch holds whole bins, so the piece's bins land on
    /// the same grid. Returns the index of the piece's first bin.
    fn absorb(&mut self, piece: &GenomicSegment<'_>, bin_size: u64) -> Option<usize> {
        let first_bin = self.fetch_bins;
        let piece_bins = piece.fetch_bins(bin_size);
        match (&mut self.request, piece) {
            (None, GenomicSegment::Zeroed { .. }) => {}
            (
                Some(FetchRequest::Vector {
                    chrom,
                    start,
                    end,
                    bins,
                    ..
                }),
                GenomicSegment::Mapped {
                    chrom: next,
                    start: next_start,
                    end: next_end,
                },
            ) if *chrom == next.name
                && *end == *next_start
                && (*end - *start) % bin_size.max(1) == 0 =>
            {
                *end = *next_end;
                *bins += piece_bins;
            }
            _ => return None,
        }
        self.fetch_bins += piece_bins;
        Some(first_bin)
    }
}

/// A run of bins one tile takes from a segment's fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileSlice {
    /// Index into the plan's segments
    pub segment: usize,
    pub first_bin: usize,
    pub bins: usize,
}

/// Where one vector tile's values come from, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTile {
    pub position: i64,
    pub slices: Vec<TileSlice>,
}

/// The bulk fetch serving one tile group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FetchPlan {
    /// Per-chromosome fetches, sliced back into each tile's own range
    Vector {
        bin_size: u64,
        segments: Vec<PlannedSegment>,
        tiles: Vec<PlannedTile>,
    },

    /// One bounding-box fetch
    Matrix {
        request: FetchRequest,
        resolution: u64,
        tile_span: u64,
    },
}

impl FetchPlan {
    /// Number of collaborator calls this plan makes.
    pub fn request_count(&self) -> usize {
        match self {
            FetchPlan::Vector { segments, .. } => {
                segments.iter().filter(|s| s.request.is_some()).count()
            }
            FetchPlan::Matrix { .. } => 1,
        }
    }
}

/// Absolute range covered by tiles `lo..=hi`, `None` on overflow.
fn span_range((lo, hi): (i64, i64), span: u64) -> Option<Range<u64>> {
    let start = u64::try_from(lo).ok()?.checked_mul(span)?;
    let end = u64::try_from(hi).ok()?.checked_add(1)?.checked_mul(span)?;
    (start < end).then_some(start..end)
}

/// Plan the fetch for a group of admitted tiles.
///
/// `bounds` is the inclusive per-dimension position range of the group.
/// Returns `None` if the zoom is unknown, the bounds do not match the data
/// dimensionality, or they address no valid absolute range.
///
/// Every vector tile takes its bins from fetches laid out over its own range
/// `[p * span, (p + 1) * span)`, so a tile renders the same values whatever
/// neighbours share its batch. Neighbouring pieces share one fetch whenever
/// their bin grids line up.
pub fn plan_group(
    metadata: &DatasetMetadata,
    zoom: u32,
    transform: &str,
    bounds: &[(i64, i64)],
) -> Option<FetchPlan> {
    let bin_size = metadata.zoom_levels.bin_size(zoom)?;
    let span = metadata.zoom_levels.tile_span(zoom)?;
    if bounds.len() != metadata.kind.dimensions() {
        return None;
    }

    match metadata.kind {
        DataKind::Vector => {
            let (lo, hi) = bounds[0];
            // whole group first, so no per-tile walk runs into an overflow
            span_range((lo, hi), span)?;

            let mut planned: Vec<PlannedSegment> = Vec::new();
            let mut tiles = Vec::new();
            for position in lo..=hi {
                let range = span_range((position, position), span)?;
                let mut slices = Vec::new();
                for piece in segments(&metadata.chromosomes, range) {
                    let merged = planned
                        .last_mut()
                        .and_then(|last| last.absorb(&piece, bin_size));
                    let first_bin = match merged {
                        Some(first_bin) => first_bin,
                        None => {
                            planned.push(PlannedSegment::new(&piece, bin_size, transform));
                            0
                        }
                    };
                    slices.push(TileSlice {
                        segment: planned.len() - 1,
                        first_bin,
                        bins: piece.kept_bins(bin_size),
                    });
                }
                tiles.push(PlannedTile { position, slices });
            }

            Some(FetchPlan::Vector {
                bin_size,
                segments: planned,
                tiles,
            })
        }
        DataKind::Matrix => {
            let extent = metadata.extent();
            let clip = |r: Range<u64>| r.start.min(extent)..r.end.min(extent);
            Some(FetchPlan::Matrix {
                request: FetchRequest::Matrix {
                    x: clip(span_range(bounds[0], span)?),
                    y: clip(span_range(bounds[1], span)?),
                    resolution: bin_size,
                    transform: transform.to_string(),
                },
                resolution: bin_size,
                tile_span: span,
            })
        }
    }
}

// =============================================================================
// Batch Plans
// =============================================================================

/// A planned group with its member identifiers.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedGroup {
    pub zoom: u32,
    pub transform: String,
    pub members: Vec<String>,
    pub fetch: FetchPlan,
}

/// A tile that would not be fetched, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedTile {
    pub id: String,
    pub dropped: bool,
    pub reason: String,
}

/// Everything a batch against one dataset would fetch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchPlan {
    pub groups: Vec<PlannedGroup>,
    pub rejected: Vec<RejectedTile>,
}

/// Plan a batch of identifiers against one dataset's metadata.
pub fn plan_batch<S: AsRef<str>>(metadata: &DatasetMetadata, ids: &[S]) -> BatchPlan {
    let mut plan = BatchPlan::default();
    let mut admitted = Vec::new();

    for id in ids {
        let id = id.as_ref();
        let rejection = match TileCoordinate::parse(id, metadata.kind.dimensions()) {
            Ok(tile) => match admit(metadata, &tile) {
                Ok(()) => {
                    admitted.push(tile);
                    continue;
                }
                Err(rejection) => rejection,
            },
            Err(e) => Rejection::Failed(e),
        };

        let (dropped, reason) = match rejection {
            Rejection::Dropped(reason) => (true, format!("{reason:?}")),
            Rejection::Failed(e) => (false, e.to_string()),
        };
        plan.rejected.push(RejectedTile {
            id: id.to_string(),
            dropped,
            reason,
        });
    }

    for (key, tiles) in bucket_by_zoom_and_transform(admitted) {
        for group in partition_by_adjacent_tiles(tiles) {
            let Some(fetch) = plan_group(metadata, key.zoom, &key.transform, &group.bounds())
            else {
                continue;
            };
            plan.groups.push(PlannedGroup {
                zoom: key.zoom,
                transform: key.transform.clone(),
                members: group.members().iter().map(ToString::to_string).collect(),
                fetch,
            });
        }
    }

    plan
}

// =============================================================================
// Tests
// =============================================================================
