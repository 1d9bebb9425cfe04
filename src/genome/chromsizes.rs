//! Chromosome offset table.
//!
//! Genomic datasets are tiled over a single absolute coordinate axis built by
//! laying chromosomes end to end. This module owns that layout: the ordering of
//! chromosomes, their cumulative offsets, and translation between absolute and
//! per-chromosome coordinates.
//!
//! # Ordering
//!
//! Chromosome names are ordered "naturally" so that numeric runs compare by
//! value (`chr2 < chr10`). One name (by default [`TRAILING_CHROMOSOME`]) is
//! always moved to the end of the table regardless of where it would sort.
//!
//! ```text
//!  chr1          chr2                 chrX      chrM
//! |-------------|--------------------|---------|--|
//! 0             offset(chr2)         ...          extent
//! ```

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use crate::error::ChromSizesError;

/// Chromosome that is always sorted last in a naturally ordered table.
pub const TRAILING_CHROMOSOME: &str = "chrM";

// =============================================================================
// Chromosome
// =============================================================================

/// A chromosome placed on the absolute coordinate axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromosome {
    /// Chromosome name as reported by the dataset
    pub name: String,

    /// Absolute start of this chromosome
    pub offset: u64,

    /// Length in base pairs
    pub length: u64,
}

impl Chromosome {
    /// Absolute end (exclusive) of this chromosome.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

// =============================================================================
// ChromosomeOffsetTable
// =============================================================================

/// Ordered chromosomes with cumulative absolute offsets.
///
/// Offsets are a strictly increasing cumulative sum of lengths. Zero-length
/// chromosomes occupy no space on the axis and are left out of the table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChromosomeOffsetTable {
    chromosomes: Vec<Chromosome>,
    by_name: HashMap<String, usize>,
}

impl ChromosomeOffsetTable {
    /// Build a table in natural order with [`TRAILING_CHROMOSOME`] last.
    pub fn new<N, I>(sizes: I) -> Result<Self, ChromSizesError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, u64)>,
    {
        Self::with_trailing(sizes, Some(TRAILING_CHROMOSOME))
    }

    /// Build a table in natural order, moving `trailing` (if present) last.
    pub fn with_trailing<N, I>(sizes: I, trailing: Option<&str>) -> Result<Self, ChromSizesError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, u64)>,
    {
        let mut sizes: Vec<(String, u64)> = sizes.into_iter().map(|(n, l)| (n.into(), l)).collect();
        sizes.sort_by(|(a, _), (b, _)| {
            let a_last = Some(a.as_str()) == trailing;
            let b_last = Some(b.as_str()) == trailing;
            a_last.cmp(&b_last).then_with(|| natural_cmp(a, b))
        });
        Self::from_ordered(sizes)
    }

    /// Build a table keeping the given chromosome order.
    pub fn from_ordered<N, I>(sizes: I) -> Result<Self, ChromSizesError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, u64)>,
    {
        let mut chromosomes = Vec::new();
        let mut by_name = HashMap::new();
        let mut seen = HashSet::new();
        let mut offset = 0u64;

        for (name, length) in sizes {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(ChromSizesError::DuplicateChromosome(name));
            }
            if length == 0 {
                continue;
            }
            by_name.insert(name.clone(), chromosomes.len());
            chromosomes.push(Chromosome {
                name,
                offset,
                length,
            });
            offset += length;
        }

        Ok(Self {
            chromosomes,
            by_name,
        })
    }

    /// Number of chromosomes.
    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    /// Whether the table has no chromosomes.
    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// Total length of all chromosomes.
    pub fn extent(&self) -> u64 {
        self.chromosomes.last().map_or(0, Chromosome::end)
    }

    /// Chromosome at `index` in table order.
    pub fn get(&self, index: usize) -> Option<&Chromosome> {
        self.chromosomes.get(index)
    }

    /// Look up a chromosome by name.
    pub fn by_name(&self, name: &str) -> Option<&Chromosome> {
        self.by_name.get(name).map(|&i| &self.chromosomes[i])
    }

    /// Iterate chromosomes in table order.
    pub fn iter(&self) -> std::slice::Iter<'_, Chromosome> {
        self.chromosomes.iter()
    }

    /// Index of the chromosome containing absolute position `pos`.
    ///
    /// Returns `None` when `pos` lies at or beyond the extent.
    pub fn locate(&self, pos: u64) -> Option<usize> {
        let index = self.chromosomes.partition_point(|c| c.end() <= pos);
        (index < self.chromosomes.len()).then_some(index)
    }

    /// Translate an absolute position to `(chromosome, relative position)`.
    pub fn to_relative(&self, pos: u64) -> Option<(&Chromosome, u64)> {
        let chrom = &self.chromosomes[self.locate(pos)?];
        Some((chrom, pos - chrom.offset))
    }

    /// Translate a per-chromosome position to an absolute one.
    ///
    /// Positions past the chromosome's end are rejected.
    pub fn to_absolute(&self, name: &str, pos: u64) -> Option<u64> {
        let chrom = self.by_name(name)?;
        (pos <= chrom.length).then(|| chrom.offset + pos)
    }
}

impl<'a> IntoIterator for &'a ChromosomeOffsetTable {
    type Item = &'a Chromosome;
    type IntoIter = std::slice::Iter<'a, Chromosome>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Chrom-sizes files
// =============================================================================

/// Read `name<TAB>length` pairs from a chrom-sizes file.
///
/// Blank lines and `#` comments are skipped; columns past the second are
/// ignored. File order is preserved.
pub fn read_chromsizes<R: BufRead>(reader: R) -> Result<Vec<(String, u64)>, ChromSizesError> {
    let mut sizes = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut columns = trimmed.split_whitespace();
        let (name, value) = match (columns.next(), columns.next()) {
            (Some(name), Some(value)) => (name, value),
            _ => {
                return Err(ChromSizesError::MalformedLine {
                    line: line_no + 1,
                    content: line.clone(),
                })
            }
        };

        let length = value
            .parse::<u64>()
            .map_err(|_| ChromSizesError::InvalidLength {
                chrom: name.to_string(),
                value: value.to_string(),
            })?;
        sizes.push((name.to_string(), length));
    }

    Ok(sizes)
}

// =============================================================================
// Natural ordering
// =============================================================================

/// Compare two names treating runs of ASCII digits as numbers.
///
/// Digit runs sort before text runs at the same position. Names that compare
/// equal chunk by chunk (`chr01` vs `chr1`) fall back to plain byte order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = NaturalChunks { rest: a };
    let mut right = NaturalChunks { rest: b };

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = compare_chunks(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_chunks(l: &str, r: &str) -> Ordering {
    let l_digit = l.starts_with(|c: char| c.is_ascii_digit());
    let r_digit = r.starts_with(|c: char| c.is_ascii_digit());

    match (l_digit, r_digit) {
        (true, true) => {
            // compare by magnitude without parsing, so long runs cannot overflow
            let l = l.trim_start_matches('0');
            let r = r.trim_start_matches('0');
            l.len().cmp(&r.len()).then_with(|| l.cmp(r))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => l.cmp(r),
    }
}

/// Splits a string into alternating digit and non-digit runs.
struct NaturalChunks<'a> {
    rest: &'a str,
}

impl<'a> Iterator for NaturalChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

// =============================================================================
// Tests
// =============================================================================
