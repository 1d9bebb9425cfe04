//! Grouping tile requests for bulk fetches.
//!
//! Requests are first bucketed by everything that must match for two tiles to
//! share a fetch (dataset, options, zoom, transform). Each bucket is then split
//! into groups of adjacent tiles with a single first-fit pass:
//!
//! 1. Sort tiles by position (lexicographic on the position tuple).
//! 2. Put each tile in the first existing group that has a member within
//!    distance 1 in every dimension; otherwise open a new group.
//!
//! Groups are never merged after the fact, so a tile that bridges two groups
//! opened earlier joins the first and leaves the second as it is. Callers rely
//! on this exact grouping; it is not a connected-components pass.

use std::collections::BTreeMap;

use super::id::{TileCoordinate, TileOption};

// =============================================================================
// Buckets
// =============================================================================

/// Everything two tiles must share to be fetched together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub dataset_id: String,
    pub options: Vec<TileOption>,
    pub zoom: u32,
    pub transform: String,
}

impl BucketKey {
    pub fn of(tile: &TileCoordinate) -> Self {
        Self {
            dataset_id: tile.dataset_id.clone(),
            options: tile.options.clone(),
            zoom: tile.zoom,
            transform: tile.transform.clone(),
        }
    }
}

/// Bucket tiles by dataset, options, zoom and transform.
///
/// Buckets iterate in key order; tiles keep their input order within a bucket.
pub fn bucket_by_zoom_and_transform<T, I>(tiles: I) -> BTreeMap<BucketKey, Vec<T>>
where
    T: AsRef<TileCoordinate>,
    I: IntoIterator<Item = T>,
{
    let mut buckets: BTreeMap<BucketKey, Vec<T>> = BTreeMap::new();
    for tile in tiles {
        buckets
            .entry(BucketKey::of(tile.as_ref()))
            .or_default()
            .push(tile);
    }
    buckets
}

// =============================================================================
// Groups
// =============================================================================

/// Tiles that one bulk fetch can serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGroup<T> {
    members: Vec<T>,
}

impl<T: AsRef<TileCoordinate>> TileGroup<T> {
    fn single(tile: T) -> Self {
        Self {
            members: vec![tile],
        }
    }

    /// Whether some member is within distance 1 of `position` in every dimension.
    fn is_adjacent_to(&self, position: &[i64]) -> bool {
        self.members
            .iter()
            .any(|m| within_one(&m.as_ref().position, position))
    }

    pub fn members(&self) -> &[T] {
        &self.members
    }

    pub fn into_members(self) -> Vec<T> {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Inclusive `(min, max)` position per dimension over all members.
    pub fn bounds(&self) -> Vec<(i64, i64)> {
        let mut bounds: Vec<(i64, i64)> = Vec::new();
        for member in &self.members {
            let position = &member.as_ref().position;
            if bounds.is_empty() {
                bounds = position.iter().map(|&p| (p, p)).collect();
                continue;
            }
            for (b, &p) in bounds.iter_mut().zip(position) {
                b.0 = b.0.min(p);
                b.1 = b.1.max(p);
            }
        }
        bounds
    }
}

fn within_one(a: &[i64], b: &[i64]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(*y) <= 1)
}

/// Split same-bucket tiles into groups of adjacent tiles.
///
/// Every input tile ends up in exactly one group.
pub fn partition_by_adjacent_tiles<T: AsRef<TileCoordinate>>(mut tiles: Vec<T>) -> Vec<TileGroup<T>> {
    tiles.sort_by(|a, b| a.as_ref().position.cmp(&b.as_ref().position));

    let mut groups: Vec<TileGroup<T>> = Vec::new();
    for tile in tiles {
        let position = tile.as_ref().position.clone();
        match groups.iter_mut().find(|g| g.is_adjacent_to(&position)) {
            Some(group) => group.members.push(tile),
            None => groups.push(TileGroup::single(tile)),
        }
    }
    groups
}

// =============================================================================
// Tests
// =============================================================================
