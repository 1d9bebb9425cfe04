//! Dataset collaborator interface.
//!
//! The tiling engine never parses signal or matrix files itself. It talks to
//! an opened dataset through the [`Dataset`] trait: descriptive metadata plus a
//! single bulk `fetch` per tile group.
//!
//! # Fetch shapes
//!
//! - Vector datasets (signal tracks) are fetched one chromosome segment at a
//!   time and answer with one value per requested bin ([`FetchedValues::Dense`]).
//!   Missing bins are NaN.
//! - Matrix datasets (contact maps) are fetched by absolute bounding box and
//!   answer with sparse contact records ([`FetchedValues::Sparse`]).

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::FetchError;
use crate::genome::{ChromosomeOffsetTable, ZoomResolutionTable};
use crate::tile::DEFAULT_TRANSFORM;

/// Bins per tile for vector datasets.
pub const DEFAULT_VECTOR_TILE_EDGE: usize = 1024;

/// Bins per tile edge for matrix datasets.
pub const DEFAULT_MATRIX_TILE_EDGE: usize = 256;

// =============================================================================
// Data Kind
// =============================================================================

/// Shape of the data a dataset serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// 1-D signal track
    Vector,
    /// 2-D contact matrix
    Matrix,
}

impl DataKind {
    /// Kind served by a dataset file, judged by its extension.
    ///
    /// Signal tracks: `.bw`, `.bigwig`, `.hitile`. Contact matrices: `.cool`,
    /// `.mcool`. Anything else is unknown.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "bw" | "bigwig" | "hitile" => Some(DataKind::Vector),
            "cool" | "mcool" => Some(DataKind::Matrix),
            _ => None,
        }
    }

    /// Number of position fields in a tile identifier.
    pub fn dimensions(self) -> usize {
        match self {
            DataKind::Vector => 1,
            DataKind::Matrix => 2,
        }
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Descriptive metadata of an opened dataset.
#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    /// Vector or matrix
    pub kind: DataKind,

    /// Chromosome layout on the absolute axis
    pub chromosomes: Arc<ChromosomeOffsetTable>,

    /// Bin size per zoom level
    pub zoom_levels: ZoomResolutionTable,

    /// Named transforms besides `default`
    pub transforms: Vec<String>,
}

impl DatasetMetadata {
    /// Metadata for a signal track, zoom levels derived from the extent.
    pub fn vector(chromosomes: ChromosomeOffsetTable, tile_edge: usize) -> Self {
        Self::derived(DataKind::Vector, chromosomes, tile_edge)
    }

    /// Metadata for a contact matrix, zoom levels derived from the extent.
    pub fn matrix(chromosomes: ChromosomeOffsetTable, tile_edge: usize) -> Self {
        Self::derived(DataKind::Matrix, chromosomes, tile_edge)
    }

    /// Metadata for a multi-resolution contact matrix.
    ///
    /// Returns `None` if `resolutions` holds no positive value.
    pub fn matrix_with_resolutions<I>(
        chromosomes: ChromosomeOffsetTable,
        tile_edge: usize,
        resolutions: I,
    ) -> Option<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let zoom_levels = ZoomResolutionTable::from_resolutions(
            resolutions,
            tile_edge as u64,
            chromosomes.extent(),
        )?;
        Some(Self {
            kind: DataKind::Matrix,
            chromosomes: Arc::new(chromosomes),
            zoom_levels,
            transforms: Vec::new(),
        })
    }

    fn derived(kind: DataKind, chromosomes: ChromosomeOffsetTable, tile_edge: usize) -> Self {
        let zoom_levels = ZoomResolutionTable::from_extent(chromosomes.extent(), tile_edge as u64);
        Self {
            kind,
            chromosomes: Arc::new(chromosomes),
            zoom_levels,
            transforms: Vec::new(),
        }
    }

    /// Declare the transforms the dataset can apply.
    pub fn with_transforms<I, T>(mut self, transforms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.transforms = transforms.into_iter().map(Into::into).collect();
        self
    }

    /// Same dataset laid out over an alternate chromosome-size set.
    pub fn with_chromosomes(&self, chromosomes: Arc<ChromosomeOffsetTable>) -> Self {
        Self {
            kind: self.kind,
            zoom_levels: self.zoom_levels.with_extent(chromosomes.extent()),
            chromosomes,
            transforms: self.transforms.clone(),
        }
    }

    pub fn extent(&self) -> u64 {
        self.chromosomes.extent()
    }

    pub fn max_zoom(&self) -> u32 {
        self.zoom_levels.max_zoom()
    }

    pub fn tile_edge(&self) -> usize {
        self.zoom_levels.tile_edge() as usize
    }

    /// `default` is always supported.
    pub fn supports_transform(&self, transform: &str) -> bool {
        transform == DEFAULT_TRANSFORM || self.transforms.iter().any(|t| t == transform)
    }

    /// Summary handed to clients so they can address tiles.
    pub fn tileset_info(&self) -> TilesetInfo {
        let max_width = self.zoom_levels.max_width();
        let dims = self.kind.dimensions();
        TilesetInfo {
            kind: self.kind,
            min_pos: vec![0; dims],
            max_pos: vec![self.extent(); dims],
            max_width,
            tile_size: self.tile_edge(),
            max_zoom: self.max_zoom(),
            resolutions: self.zoom_levels.bin_sizes().to_vec(),
            transforms: self.transforms.clone(),
        }
    }
}

/// Serializable tileset summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilesetInfo {
    pub kind: DataKind,
    pub min_pos: Vec<u64>,
    pub max_pos: Vec<u64>,
    pub max_width: u64,
    pub tile_size: usize,
    pub max_zoom: u32,
    /// Base pairs per bin, indexed by zoom
    pub resolutions: Vec<u64>,
    pub transforms: Vec<String>,
}

// =============================================================================
// Fetch
// =============================================================================

/// A bulk fetch issued for one tile group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FetchRequest {
    /// `bins` equal-width bins over `[start, end)` of one chromosome
    Vector {
        chrom: String,
        start: u64,
        end: u64,
        bins: usize,
        transform: String,
    },

    /// All contacts with `coord1` in `x` and `coord2` in `y` (absolute bp)
    Matrix {
        x: Range<u64>,
        y: Range<u64>,
        resolution: u64,
        transform: String,
    },
}

/// One sparse contact record, coordinates in absolute base pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactRecord {
    pub coord1: u64,
    pub coord2: u64,
    pub value: f32,
}

impl ContactRecord {
    pub fn new(coord1: u64, coord2: u64, value: f32) -> Self {
        Self {
            coord1,
            coord2,
            value,
        }
    }
}

/// Values returned by a bulk fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedValues {
    Dense(Vec<f32>),
    Sparse(Vec<ContactRecord>),
}

impl FetchedValues {
    /// Take a dense response holding exactly `expected` bins.
    pub fn into_dense(self, expected: usize) -> Result<Vec<f32>, FetchError> {
        match self {
            FetchedValues::Dense(values) if values.len() == expected => Ok(values),
            FetchedValues::Dense(values) => Err(FetchError::BinCountMismatch {
                expected,
                actual: values.len(),
            }),
            FetchedValues::Sparse(_) => Err(FetchError::UnexpectedShape(
                "sparse records returned for a vector fetch".to_string(),
            )),
        }
    }

    /// Take a sparse response.
    pub fn into_sparse(self) -> Result<Vec<ContactRecord>, FetchError> {
        match self {
            FetchedValues::Sparse(records) => Ok(records),
            FetchedValues::Dense(_) => Err(FetchError::UnexpectedShape(
                "dense values returned for a matrix fetch".to_string(),
            )),
        }
    }
}

// =============================================================================
// Dataset Trait
// =============================================================================

/// An opened dataset the engine can tile.
///
/// Implementations wrap a concrete reader (signal file, matrix file, interval
/// database). They may keep file handles open for as long as the handle lives
/// in the [`crate::dataset::DatasetRegistry`].
#[async_trait]
pub trait Dataset: Send + Sync {
    /// Descriptive metadata, fixed for the lifetime of the handle.
    fn metadata(&self) -> &DatasetMetadata;

    /// Execute one bulk fetch.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedValues, FetchError>;
}

// =============================================================================
// Tests
// =============================================================================
