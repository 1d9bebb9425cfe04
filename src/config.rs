//! Configuration management for the genome tiler.
//!
//! Two layers:
//! - [`TilingConfig`]: engine settings (tile edges, handle pool size,
//!   chromosome ordering) with defaults and validation.
//! - [`Cli`]: command-line arguments for the debugging binary via clap, every
//!   option also readable from a `GTILER_`-prefixed environment variable.
//!
//! # Example
//!
//! ```ignore
//! use genome_tiler::config::Cli;
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Command::TilesetInfo(args) => { /* ... */ }
//!     Command::Plan(args) => { /* ... */ }
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `GTILER_CHROMSIZES` - Chromosome sizes TSV (name, length)
//! - `GTILER_KIND` - `vector` or `matrix` (default: from `GTILER_DATASET`, else vector)
//! - `GTILER_DATASET` - Dataset file whose extension implies the kind
//! - `GTILER_TILE_EDGE` - Bins per tile edge (default: 1024 vector, 256 matrix)
//! - `GTILER_RESOLUTIONS` - Comma-separated matrix resolutions in bp
//! - `GTILER_TRAILING_CHROM` - Chromosome sorted last (default: chrM)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::dataset::{DataKind, DatasetMetadata, DEFAULT_MATRIX_TILE_EDGE, DEFAULT_VECTOR_TILE_EDGE};
use crate::genome::{ChromosomeOffsetTable, TRAILING_CHROMOSOME};

// =============================================================================
// Default Values
// =============================================================================

/// Default number of open datasets to keep in the registry.
pub const DEFAULT_DATASET_CACHE_CAPACITY: usize = 100;

/// Largest accepted tile edge.
pub const MAX_TILE_EDGE: usize = 1 << 16;

// =============================================================================
// Engine Configuration
// =============================================================================

/// Settings that shape how datasets are tiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilingConfig {
    /// Maximum number of open dataset handles
    pub dataset_cache_capacity: usize,

    /// Bins per tile for signal tracks
    pub vector_tile_edge: usize,

    /// Bins per tile edge for contact matrices
    pub matrix_tile_edge: usize,

    /// Chromosome sorted after all others, if present
    pub trailing_chromosome: Option<String>,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            dataset_cache_capacity: DEFAULT_DATASET_CACHE_CAPACITY,
            vector_tile_edge: DEFAULT_VECTOR_TILE_EDGE,
            matrix_tile_edge: DEFAULT_MATRIX_TILE_EDGE,
            trailing_chromosome: Some(TRAILING_CHROMOSOME.to_string()),
        }
    }
}

impl TilingConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.dataset_cache_capacity == 0 {
            return Err("dataset_cache_capacity must be greater than 0".to_string());
        }

        for (name, edge) in [
            ("vector_tile_edge", self.vector_tile_edge),
            ("matrix_tile_edge", self.matrix_tile_edge),
        ] {
            if edge == 0 || edge > MAX_TILE_EDGE {
                return Err(format!("{name} must be between 1 and {MAX_TILE_EDGE}"));
            }
        }

        if self.trailing_chromosome.as_deref() == Some("") {
            return Err("trailing_chromosome must not be empty".to_string());
        }

        Ok(())
    }

    /// Tile edge used for datasets of `kind`.
    pub fn tile_edge_for(&self, kind: DataKind) -> usize {
        match kind {
            DataKind::Vector => self.vector_tile_edge,
            DataKind::Matrix => self.matrix_tile_edge,
        }
    }

    /// Order `sizes` into an offset table using the configured trailing
    /// chromosome.
    pub fn chromosome_table(
        &self,
        sizes: Vec<(String, u64)>,
    ) -> Result<ChromosomeOffsetTable, String> {
        ChromosomeOffsetTable::with_trailing(sizes, self.trailing_chromosome.as_deref())
            .map_err(|e| e.to_string())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Genome Tiler - inspect how genomic datasets are cut into tiles.
#[derive(Parser, Debug, Clone)]
#[command(name = "genome-tiler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the tileset summary clients use to address tiles.
    TilesetInfo(TilesetInfoConfig),

    /// Print the bulk fetches a batch of tile ids would issue.
    Plan(PlanConfig),
}

/// Dataset layout shared by all subcommands.
#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    /// Chromosome sizes file (tab-separated name and length).
    #[arg(long, env = "GTILER_CHROMSIZES")]
    pub chromsizes: PathBuf,

    /// Kind of data the dataset serves; inferred from `--dataset` when omitted.
    #[arg(long, value_enum, env = "GTILER_KIND")]
    pub kind: Option<DataKind>,

    /// Dataset file whose extension selects the kind (.bw, .bigwig, .hitile, .cool, .mcool).
    #[arg(long, env = "GTILER_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Bins per tile edge; defaults depend on the kind.
    #[arg(long, env = "GTILER_TILE_EDGE")]
    pub tile_edge: Option<usize>,

    /// Explicit matrix resolutions in bp per bin (comma-separated).
    #[arg(long, env = "GTILER_RESOLUTIONS", value_delimiter = ',')]
    pub resolutions: Option<Vec<u64>>,

    /// Chromosome sorted after all others.
    #[arg(long, default_value = TRAILING_CHROMOSOME, env = "GTILER_TRAILING_CHROM")]
    pub trailing_chrom: String,
}

impl LayoutArgs {
    /// Kind named by `--kind`, else inferred from `--dataset`, else vector.
    pub fn data_kind(&self) -> Result<DataKind, String> {
        match (self.kind, &self.dataset) {
            (Some(kind), _) => Ok(kind),
            (None, Some(path)) => DataKind::from_path(path).ok_or_else(|| {
                format!("cannot infer data kind from {}; pass --kind", path.display())
            }),
            (None, None) => Ok(DataKind::Vector),
        }
    }

    /// Engine settings implied by these arguments.
    pub fn tiling_config(&self) -> Result<TilingConfig, String> {
        let mut config = TilingConfig {
            trailing_chromosome: Some(self.trailing_chrom.clone()),
            ..TilingConfig::default()
        };
        if let Some(edge) = self.tile_edge {
            match self.data_kind()? {
                DataKind::Vector => config.vector_tile_edge = edge,
                DataKind::Matrix => config.matrix_tile_edge = edge,
            }
        }
        Ok(config)
    }

    /// Validate the arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.tiling_config()?.validate()?;

        if let Some(resolutions) = &self.resolutions {
            if self.data_kind()? != DataKind::Matrix {
                return Err("--resolutions only applies to matrix datasets".to_string());
            }
            if resolutions.is_empty() || resolutions.contains(&0) {
                return Err("resolutions must be positive integers".to_string());
            }
        }

        Ok(())
    }

    /// Build dataset metadata over the given chromosome sizes.
    pub fn metadata(&self, sizes: Vec<(String, u64)>) -> Result<DatasetMetadata, String> {
        let config = self.tiling_config()?;
        let kind = self.data_kind()?;
        let chromosomes = config.chromosome_table(sizes)?;
        let edge = config.tile_edge_for(kind);

        match (kind, &self.resolutions) {
            (DataKind::Vector, _) => Ok(DatasetMetadata::vector(chromosomes, edge)),
            (DataKind::Matrix, None) => Ok(DatasetMetadata::matrix(chromosomes, edge)),
            (DataKind::Matrix, Some(resolutions)) => DatasetMetadata::matrix_with_resolutions(
                chromosomes,
                edge,
                resolutions.iter().copied(),
            )
            .ok_or_else(|| "resolutions must be positive integers".to_string()),
        }
    }
}

/// Arguments of the `tileset-info` command.
#[derive(Args, Debug, Clone)]
pub struct TilesetInfoConfig {
    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Pretty-print the JSON output.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

/// Arguments of the `plan` command.
#[derive(Args, Debug, Clone)]
pub struct PlanConfig {
    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Pretty-print the JSON output.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Tile ids to plan, e.g. `track.3.5` or `hic.4.2.3.KR`.
    #[arg(required = true)]
    pub tile_ids: Vec<String>,
}

// =============================================================================
// Tests
// =============================================================================
