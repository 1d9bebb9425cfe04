//! Absolute → per-chromosome coordinate mapping.
//!
//! A tile covers an absolute range that can start in one chromosome and end in
//! another (or past the end of the genome). [`GenomicSegments`] walks such a
//! range and yields one segment per chromosome it touches, plus a single
//! [`GenomicSegment::Zeroed`] tail for whatever lies beyond the last
//! chromosome.

use std::iter::FusedIterator;
use std::ops::Range;

use super::chromsizes::{Chromosome, ChromosomeOffsetTable};

/// One piece of an absolute range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenomicSegment<'a> {
    /// Part of the range inside `chrom`, in chromosome-relative coordinates
    Mapped {
        chrom: &'a Chromosome,
        start: u64,
        end: u64,
    },

    /// Absolute part of the range past the last chromosome; rasterizes to zeros
    Zeroed { start: u64, end: u64 },
}

impl GenomicSegment<'_> {
    /// Length in base pairs.
    pub fn len(&self) -> u64 {
        match *self {
            GenomicSegment::Mapped { start, end, .. } | GenomicSegment::Zeroed { start, end } => {
                end - start
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bins to request for this segment: `ceil(len / bin_size)`.
    pub fn fetch_bins(&self, bin_size: u64) -> usize {
        self.len().div_ceil(bin_size.max(1)) as usize
    }

    /// Bins kept after fetching.
    ///
    /// A segment that runs to the end of its chromosome drops the trailing
    /// partial bin, so segments from adjacent chromosomes concatenate without
    /// a misaligned short bin between them.
    pub fn kept_bins(&self, bin_size: u64) -> usize {
        let bins = self.fetch_bins(bin_size);
        match *self {
            GenomicSegment::Mapped { chrom, end, .. }
                if end == chrom.length && chrom.length % bin_size.max(1) != 0 =>
            {
                bins.saturating_sub(1)
            }
            _ => bins,
        }
    }
}

/// Lazy walk of an absolute range over a [`ChromosomeOffsetTable`].
///
/// Consumed once; create a new walk with [`segments`] to iterate again.
#[derive(Debug, Clone)]
pub struct GenomicSegments<'a> {
    table: &'a ChromosomeOffsetTable,
    cursor: u64,
    end: u64,
    index: usize,
}

/// Split the absolute range `[range.start, range.end)` at chromosome
/// boundaries.
pub fn segments(table: &ChromosomeOffsetTable, range: Range<u64>) -> GenomicSegments<'_> {
    let index = table.locate(range.start).unwrap_or(table.len());
    GenomicSegments {
        table,
        cursor: range.start,
        end: range.end.max(range.start),
        index,
    }
}

impl<'a> Iterator for GenomicSegments<'a> {
    type Item = GenomicSegment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }

        let Some(chrom) = self.table.get(self.index) else {
            let segment = GenomicSegment::Zeroed {
                start: self.cursor,
                end: self.end,
            };
            self.cursor = self.end;
            return Some(segment);
        };

        let segment_end = self.end.min(chrom.end());
        let segment = GenomicSegment::Mapped {
            chrom,
            start: self.cursor - chrom.offset,
            end: segment_end - chrom.offset,
        };
        self.cursor = segment_end;
        self.index += 1;
        Some(segment)
    }
}

impl FusedIterator for GenomicSegments<'_> {}

// =============================================================================
// Tests
// =============================================================================
