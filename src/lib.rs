//! # Genome Tiler
//!
//! A tiling engine for genomic data: 1-D signal tracks and 2-D contact
//! matrices served as fixed-size tiles at any zoom level.
//!
//! Callers ask for tiles by identifier (`dataset.zoom.pos[.pos][.transform]`).
//! The engine parses them, groups adjacent tiles so each group costs one bulk
//! fetch against the backing dataset, cuts the fetched values back into one
//! dense grid per tile and encodes each grid compactly for transport.
//!
//! ## Features
//!
//! - **Batched fetches**: adjacent tiles of the same zoom and transform share a single fetch
//! - **Multi-chromosome ranges**: absolute coordinates are split at chromosome boundaries
//! - **Compact encoding**: float16 when a tile allows it, float32 otherwise, base64 text
//! - **Alternate layouts**: tiles can be served over a different chromosome-size set
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`genome`] - Chromosome offsets, zoom resolutions, absolute → chromosome mapping
//! - [`dataset`] - Collaborator trait for backing stores and the handle registry
//! - [`tile`] - Identifiers, partitioning, fetch planning, rasterization, encoding
//! - [`config`] - Engine settings and CLI types
//! - [`error`] - Error types per layer
//!
//! ## Example
//!
//! ```rust,ignore
//! use genome_tiler::{DatasetRegistry, TileService, TileOutcome};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = TileService::new(DatasetRegistry::new(MyOpener::default()));
//!
//!     for (id, outcome) in service.tiles(&["rnaseq.4.7", "rnaseq.4.8"], None).await {
//!         if let TileOutcome::Ready(tile) = outcome {
//!             println!("{id}: {} ({:?})", tile.dense.len(), tile.dtype);
//!         }
//!     }
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod genome;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, TilingConfig};
pub use dataset::{
    ContactRecord, DataKind, Dataset, DatasetMetadata, DatasetOpener, DatasetRegistry,
    FetchRequest, FetchedValues, TilesetInfo,
};
pub use error::{ChromSizesError, FetchError, TileError};
pub use genome::{read_chromsizes, ChromosomeOffsetTable, GenomicSegment, ZoomResolutionTable};
pub use tile::{
    DType, DenseGrid, DropReason, EncodedTile, NumericEncoder, TileCoordinate, TileOutcome,
    TileService,
};
