//! Genomic coordinate layer.
//!
//! Translates between tile addresses and genome coordinates:
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────────┐
//! │   ZoomResolutionTable    │     │    ChromosomeOffsetTable     │
//! │ zoom → bin size, span    │     │ name → (offset, length)      │
//! └────────────┬─────────────┘     └──────────────┬───────────────┘
//!              │ tile → absolute [start, end)     │
//!              └───────────────┬──────────────────┘
//!                              ▼
//!              ┌──────────────────────────────┐
//!              │       GenomicSegments        │
//!              │ absolute → (chrom, s, e)...  │
//!              └──────────────────────────────┘
//! ```

mod chromsizes;
mod mapper;
mod zoom;

pub use chromsizes::{
    natural_cmp, read_chromsizes, Chromosome, ChromosomeOffsetTable, TRAILING_CHROMOSOME,
};
pub use mapper::{segments, GenomicSegment, GenomicSegments};
pub use zoom::{max_zoom_for_extent, ZoomResolutionTable};
