//! Tile layer.
//!
//! This module turns batches of tile identifiers into encoded tiles. It sits
//! between whatever hosts the engine and the dataset collaborators:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Host (server, CLI, tests)        │
//! └────────────────────┬────────────────────┘
//!                      │ ids
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────┐ ┌───────────┐ ┌────────┐  │
//! │  │ id       │ │ partition │ │ plan   │  │
//! │  │ (parse)  │ │ (group)   │ │ (fetch │  │
//! │  └──────────┘ └───────────┘ │ ranges)│  │
//! │  ┌──────────┐ ┌───────────┐ └────────┘  │
//! │  │ raster   │ │ encoder   │             │
//! │  └──────────┘ └───────────┘             │
//! └────────────────────┬────────────────────┘
//!                      │ one bulk fetch per group
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            DatasetRegistry              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: batch entry point, one [`TileOutcome`] per identifier
//! - [`TileCoordinate`]: parsed `dataset[|key:value].zoom.pos[.pos][.transform]`
//! - [`partition_by_adjacent_tiles`]: first-fit grouping of adjacent tiles
//! - [`plan_group`]: bounding fetch for a group
//! - [`DenseGrid`]: fixed-shape tile values, from fetched bins, contacts or
//!   point densities
//! - [`NumericEncoder`]: float16/float32 base64 encoding

mod encoder;
mod id;
mod partition;
mod plan;
mod raster;
mod service;

pub use encoder::{choose_dtype, finite_extrema, DType, EncodedTile, NumericEncoder};
pub use id::{dataset_of, TileCoordinate, TileOption, CHROMSIZES_OPTION, DEFAULT_TRANSFORM};
pub use partition::{bucket_by_zoom_and_transform, partition_by_adjacent_tiles, BucketKey, TileGroup};
pub use plan::{
    admit, plan_batch, plan_group, BatchPlan, DropReason, FetchPlan, PlannedGroup, PlannedSegment,
    PlannedTile, RejectedTile, Rejection, TileSlice,
};
pub use raster::{
    rasterize_density, rasterize_matrix, rasterize_vector, DenseGrid, DensityWindow, MatrixWindow,
};
pub use service::{TileOutcome, TileService};
