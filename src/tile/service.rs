//! Tile Service for batched tile generation.
//!
//! The TileService is the main entry point for tile requests. One call takes a
//! whole batch of identifiers and runs them through:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                        tiles()                            │  │
//! │  │  1. Parse ids          4. One bulk fetch per group        │  │
//! │  │  2. Resolve layout     5. Rasterize per tile              │  │
//! │  │  3. Admit, bucket,     6. Encode per tile                 │  │
//! │  │     partition                                             │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │  ┌─────────────────┐  ┌────────────────┐  ┌────────────────┐    │
//! │  │ DatasetRegistry │  │ plan / raster  │  │ NumericEncoder │    │
//! │  └─────────────────┘  └────────────────┘  └────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every input identifier gets exactly one [`TileOutcome`], returned in input
//! order. Problems with one tile never abort the batch; a failed bulk fetch
//! fails only the tiles of its own group.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dataset::{
    ContactRecord, Dataset, DatasetMetadata, DatasetOpener, DatasetRegistry, TilesetInfo,
};
use crate::error::{FetchError, TileError};
use crate::genome::ChromosomeOffsetTable;

use super::encoder::{EncodedTile, NumericEncoder};
use super::id::{dataset_of, TileCoordinate};
use super::partition::{bucket_by_zoom_and_transform, partition_by_adjacent_tiles, BucketKey, TileGroup};
use super::plan::{admit, plan_group, DropReason, FetchPlan, PlannedTile, Rejection};
use super::raster::{rasterize_matrix, rasterize_vector, DenseGrid, MatrixWindow};

// =============================================================================
// Tile Outcome
// =============================================================================

/// Result for one requested identifier.
#[derive(Debug, Clone)]
pub enum TileOutcome {
    /// Tile rendered and encoded
    Ready(EncodedTile),

    /// Tile lies outside the dataset; nothing to render
    Dropped(DropReason),

    /// Tile could not be rendered
    Failed(TileError),
}

impl TileOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, TileOutcome::Ready(_))
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, TileOutcome::Dropped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TileOutcome::Failed(_))
    }

    /// The encoded tile, if rendered.
    pub fn tile(&self) -> Option<&EncodedTile> {
        match self {
            TileOutcome::Ready(tile) => Some(tile),
            _ => None,
        }
    }

    /// The error, if the tile failed.
    pub fn error(&self) -> Option<&TileError> {
        match self {
            TileOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Rejection> for TileOutcome {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Dropped(reason) => TileOutcome::Dropped(reason),
            Rejection::Failed(e) => TileOutcome::Failed(e),
        }
    }
}

// =============================================================================
// Batch State
// =============================================================================

/// A tile that passed admission, with everything its group needs.
struct AdmittedTile {
    /// Position in the input batch
    index: usize,
    tile: TileCoordinate,
    handle: Arc<dyn Dataset>,
    metadata: Arc<DatasetMetadata>,
}

impl AsRef<TileCoordinate> for AdmittedTile {
    fn as_ref(&self) -> &TileCoordinate {
        &self.tile
    }
}

/// Per-batch memo of opened handles and resolved chromosome layouts.
#[derive(Default)]
struct BatchContext {
    handles: HashMap<String, Result<Arc<dyn Dataset>, FetchError>>,
    layouts: HashMap<(String, Option<String>), Arc<DatasetMetadata>>,
}

/// Values returned by a group's bulk fetch.
enum GroupValues {
    /// Bins of every vector fetch, with each tile's slices into them
    Dense {
        segments: Vec<Vec<f32>>,
        tiles: Vec<PlannedTile>,
    },

    /// Contact records over the group's bounding box
    Sparse {
        records: Vec<ContactRecord>,
        resolution: u64,
        tile_span: u64,
    },
}

impl GroupValues {
    fn rasterize(&self, tile: &TileCoordinate, edge: usize) -> DenseGrid {
        let position = |d: usize| tile.position.get(d).copied().unwrap_or_default();
        match self {
            GroupValues::Dense { segments, tiles } => {
                let slices = tiles
                    .iter()
                    .find(|planned| planned.position == position(0))
                    .map(|planned| planned.slices.as_slice())
                    .unwrap_or_default();
                let pieces = slices.iter().map(|slice| {
                    segments
                        .get(slice.segment)
                        .and_then(|bins| bins.get(slice.first_bin..slice.first_bin + slice.bins))
                        .unwrap_or_default()
                });
                rasterize_vector(pieces, edge)
            }
            GroupValues::Sparse {
                records,
                resolution,
                tile_span,
            } => {
                let window = MatrixWindow {
                    start1: position(0) as u64 * tile_span,
                    start2: position(1) as u64 * tile_span,
                    resolution: *resolution,
                    edge,
                };
                rasterize_matrix(records, window)
            }
        }
    }
}

// =============================================================================
// Tile Service
// =============================================================================

/// Batched tile generation over a pool of datasets.
///
/// # Type Parameters
///
/// * `O` - The dataset opener backing the registry
///
/// # Example
///
/// ```ignore
/// use genome_tiler::dataset::DatasetRegistry;
/// use genome_tiler::tile::TileService;
///
/// let service = TileService::new(DatasetRegistry::new(opener))
///     .with_chromsizes_set("hg38", hg38_table);
///
/// for (id, outcome) in service.tiles(&["rnaseq.3.5", "rnaseq.3.6"], None).await {
///     println!("{id}: ready={}", outcome.is_ready());
/// }
/// ```
pub struct TileService<O: DatasetOpener> {
    /// Pool of opened datasets
    registry: Arc<DatasetRegistry<O>>,

    /// Alternate chromosome layouts selectable by name
    chromsizes_sets: HashMap<String, Arc<ChromosomeOffsetTable>>,

    encoder: NumericEncoder,
}

impl<O: DatasetOpener> TileService<O> {
    /// Create a tile service that owns its registry.
    pub fn new(registry: DatasetRegistry<O>) -> Self {
        Self::with_shared_registry(Arc::new(registry))
    }

    /// Create a tile service over a registry shared with other components.
    pub fn with_shared_registry(registry: Arc<DatasetRegistry<O>>) -> Self {
        Self {
            registry,
            chromsizes_sets: HashMap::new(),
            encoder: NumericEncoder::new(),
        }
    }

    /// Register an alternate chromosome-size set under `name`.
    ///
    /// Tiles select it with a `cos:<name>` option, or a whole batch with the
    /// selector argument of [`TileService::tiles`].
    pub fn with_chromsizes_set(
        mut self,
        name: impl Into<String>,
        chromosomes: ChromosomeOffsetTable,
    ) -> Self {
        self.chromsizes_sets
            .insert(name.into(), Arc::new(chromosomes));
        self
    }

    /// Get a reference to the underlying registry.
    pub fn registry(&self) -> &Arc<DatasetRegistry<O>> {
        &self.registry
    }

    /// Tileset summary of a dataset, optionally over an alternate layout.
    pub async fn tileset_info(
        &self,
        dataset_id: &str,
        selector: Option<&str>,
    ) -> Result<TilesetInfo, TileError> {
        let mut ctx = BatchContext::default();
        let handle = self.open(dataset_id, &mut ctx).await?;
        let metadata = self.layout(&handle, dataset_id, selector, &mut ctx)?;
        Ok(metadata.tileset_info())
    }

    /// Render a batch of tiles.
    ///
    /// `selector` names an alternate chromosome-size set for every tile that
    /// does not pick one with its own `cos` option.
    ///
    /// Returns one `(id, outcome)` pair per input, in input order.
    pub async fn tiles<S: AsRef<str>>(
        &self,
        ids: &[S],
        selector: Option<&str>,
    ) -> Vec<(String, TileOutcome)> {
        let mut outcomes: Vec<Option<TileOutcome>> = (0..ids.len()).map(|_| None).collect();
        let mut ctx = BatchContext::default();
        let mut admitted = Vec::new();

        for (index, id) in ids.iter().enumerate() {
            let id = id.as_ref();
            match self.admit_id(index, id, selector, &mut ctx).await {
                Ok(tile) => admitted.push(tile),
                Err(rejection) => {
                    if let Rejection::Dropped(reason) = &rejection {
                        warn!(id, ?reason, "dropping tile");
                    }
                    outcomes[index] = Some(rejection.into());
                }
            }
        }

        for (key, tiles) in bucket_by_zoom_and_transform(admitted) {
            for group in partition_by_adjacent_tiles(tiles) {
                for (index, outcome) in self.render_group(&key, group).await {
                    outcomes[index] = Some(outcome);
                }
            }
        }

        ids.iter()
            .zip(outcomes)
            .map(|(id, outcome)| {
                let id = id.as_ref();
                let outcome = outcome.unwrap_or_else(|| {
                    TileOutcome::Failed(TileError::NotRendered(id.to_string()))
                });
                (id.to_string(), outcome)
            })
            .collect()
    }

    /// Parse, resolve and admit one identifier.
    async fn admit_id(
        &self,
        index: usize,
        id: &str,
        selector: Option<&str>,
        ctx: &mut BatchContext,
    ) -> Result<AdmittedTile, Rejection> {
        let dataset_id = dataset_of(id).map_err(Rejection::Failed)?;
        let handle = self
            .open(dataset_id, ctx)
            .await
            .map_err(Rejection::Failed)?;

        let tile = TileCoordinate::parse(id, handle.metadata().kind.dimensions())
            .map_err(Rejection::Failed)?;
        let layout = tile.chromsizes_selector().or(selector);
        let metadata = self
            .layout(&handle, dataset_id, layout, ctx)
            .map_err(Rejection::Failed)?;

        admit(&metadata, &tile)?;

        Ok(AdmittedTile {
            index,
            tile,
            handle,
            metadata,
        })
    }

    /// Open a dataset once per batch; failures are remembered for the batch.
    async fn open(
        &self,
        dataset_id: &str,
        ctx: &mut BatchContext,
    ) -> Result<Arc<dyn Dataset>, TileError> {
        if let Some(result) = ctx.handles.get(dataset_id) {
            return result.clone().map_err(TileError::from);
        }

        let result = self.registry.get_dataset(dataset_id).await;
        if let Err(e) = &result {
            warn!(dataset_id, error = %e, "failed to open dataset");
        }
        ctx.handles.insert(dataset_id.to_string(), result.clone());
        result.map_err(TileError::from)
    }

    /// Dataset metadata laid out over the selected chromosome-size set.
    fn layout(
        &self,
        handle: &Arc<dyn Dataset>,
        dataset_id: &str,
        layout: Option<&str>,
        ctx: &mut BatchContext,
    ) -> Result<Arc<DatasetMetadata>, TileError> {
        let key = (dataset_id.to_string(), layout.map(str::to_string));
        if let Some(metadata) = ctx.layouts.get(&key) {
            return Ok(metadata.clone());
        }

        let metadata = match layout {
            None => handle.metadata().clone(),
            Some(name) => {
                let chromosomes = self
                    .chromsizes_sets
                    .get(name)
                    .ok_or_else(|| TileError::UnknownChromSizes(name.to_string()))?;
                handle.metadata().with_chromosomes(chromosomes.clone())
            }
        };

        let metadata = Arc::new(metadata);
        ctx.layouts.insert(key, metadata.clone());
        Ok(metadata)
    }

    /// Fetch, rasterize and encode one group.
    async fn render_group(
        &self,
        key: &BucketKey,
        group: TileGroup<AdmittedTile>,
    ) -> Vec<(usize, TileOutcome)> {
        let bounds = group.bounds();
        let members = group.into_members();
        let Some(first) = members.first() else {
            return Vec::new();
        };
        let handle = first.handle.clone();
        let metadata = first.metadata.clone();

        let Some(plan) = plan_group(&metadata, key.zoom, &key.transform, &bounds) else {
            let reason = DropReason::ZoomOutOfRange {
                zoom: key.zoom,
                max_zoom: metadata.max_zoom(),
            };
            return members
                .iter()
                .map(|m| (m.index, TileOutcome::Dropped(reason.clone())))
                .collect();
        };

        debug!(
            dataset_id = %key.dataset_id,
            zoom = key.zoom,
            transform = %key.transform,
            tiles = members.len(),
            requests = plan.request_count(),
            "fetching tile group"
        );

        match fetch_group(handle.as_ref(), &plan).await {
            Ok(values) => {
                let edge = metadata.tile_edge();
                members
                    .iter()
                    .map(|m| {
                        let grid = values.rasterize(&m.tile, edge);
                        (m.index, TileOutcome::Ready(self.encoder.encode(&grid)))
                    })
                    .collect()
            }
            Err(e) => {
                warn!(
                    dataset_id = %key.dataset_id,
                    zoom = key.zoom,
                    tiles = members.len(),
                    error = %e,
                    "tile group fetch failed"
                );
                let error = TileError::from(e);
                members
                    .iter()
                    .map(|m| (m.index, TileOutcome::Failed(error.clone())))
                    .collect()
            }
        }
    }
}

/// Run a plan against the dataset.
async fn fetch_group(dataset: &dyn Dataset, plan: &FetchPlan) -> Result<GroupValues, FetchError> {
    match plan {
        FetchPlan::Vector { segments, tiles, .. } => {
            let mut fetched = Vec::with_capacity(segments.len());
            for segment in segments {
                let bins = match &segment.request {
                    Some(request) => dataset
                        .fetch(request)
                        .await?
                        .into_dense(segment.fetch_bins)?,
                    None => vec![0.0; segment.fetch_bins],
                };
                fetched.push(bins);
            }
            Ok(GroupValues::Dense {
                segments: fetched,
                tiles: tiles.clone(),
            })
        }
        FetchPlan::Matrix {
            request,
            resolution,
            tile_span,
        } => {
            let records = dataset.fetch(request).await?.into_sparse()?;
            Ok(GroupValues::Sparse {
                records,
                resolution: *resolution,
                tile_span: *tile_span,
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
