use thiserror::Error;

/// Errors reported by a dataset collaborator while opening or fetching.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Dataset could not be found by the opener
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// Error from the underlying store (file reader, database, ...)
    #[error("Backing store error: {0}")]
    Store(String),

    /// Dense response did not carry one value per requested bin
    #[error("Expected {expected} bins from fetch, got {actual}")]
    BinCountMismatch { expected: usize, actual: usize },

    /// Response shape does not match the request (dense vs sparse)
    #[error("Unexpected fetch response: {0}")]
    UnexpectedShape(String),
}

/// Errors raised while loading a chromosome-size set.
#[derive(Debug, Clone, Error)]
pub enum ChromSizesError {
    /// A line did not have a name and a length column
    #[error("Malformed chromsizes line {line}: {content:?}")]
    MalformedLine { line: usize, content: String },

    /// Length column is not a non-negative integer
    #[error("Invalid length for chromosome {chrom}: {value:?}")]
    InvalidLength { chrom: String, value: String },

    /// Same chromosome listed twice
    #[error("Duplicate chromosome: {0}")]
    DuplicateChromosome(String),

    /// Reading the source failed
    #[error("Failed to read chromsizes: {0}")]
    Read(String),
}

impl From<std::io::Error> for ChromSizesError {
    fn from(e: std::io::Error) -> Self {
        ChromSizesError::Read(e.to_string())
    }
}

/// Per-tile errors reported back to the caller.
///
/// These are carried inside [`crate::tile::TileOutcome::Failed`] and never
/// abort a batch. The type is `Clone` so a group-level failure can be fanned
/// out to every tile of the group.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Identifier does not follow `dataset.zoom.pos[.pos][.transform]`
    #[error("Malformed tile id {id:?}: {reason}")]
    MalformedTileId { id: String, reason: String },

    /// Collaborator failed while opening the dataset or fetching the group
    #[error("Fetch failed: {0}")]
    FetchFailure(#[from] FetchError),

    /// `cos` option or request selector names an unregistered chrom-sizes set
    #[error("Unknown chromosome-size set: {0}")]
    UnknownChromSizes(String),

    /// Transform is not offered by the dataset
    #[error("Unknown transform {transform:?} (available: {available:?})")]
    UnknownTransform {
        transform: String,
        available: Vec<String>,
    },

    /// Tile was admitted but no group produced an outcome for it
    #[error("Tile {0:?} was not rendered")]
    NotRendered(String),
}

impl TileError {
    pub(crate) fn malformed(id: &str, reason: impl Into<String>) -> Self {
        TileError::MalformedTileId {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
