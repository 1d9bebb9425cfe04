//! Test utilities for integration tests.
//!
//! This module provides mock datasets that record every fetch they receive,
//! and a mock opener serving them by id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use genome_tiler::dataset::{
    ContactRecord, Dataset, DatasetMetadata, DatasetOpener, DatasetRegistry, FetchRequest,
    FetchedValues,
};
use genome_tiler::config::TilingConfig;
use genome_tiler::error::FetchError;
use genome_tiler::genome::ChromosomeOffsetTable;
use genome_tiler::tile::{EncodedTile, TileOutcome, TileService};

// =============================================================================
// Recording Dataset
// =============================================================================

/// What a mock dataset answers with.
#[derive(Clone)]
enum Values {
    /// Each bin's value is the absolute position of its first base pair
    Ramp,

    /// Fixed contact records, filtered to the requested box
    Contacts(Vec<ContactRecord>),
}

/// A mock dataset that tracks all fetch requests.
pub struct RecordingDataset {
    metadata: DatasetMetadata,
    values: Values,
    failing_transform: Option<String>,
    requests: RwLock<Vec<FetchRequest>>,
}

impl RecordingDataset {
    /// Signal track over `chroms` whose values ramp with position.
    pub fn ramp(chroms: &[(&str, u64)], tile_edge: usize) -> Self {
        Self::new(DatasetMetadata::vector(table(chroms), tile_edge), Values::Ramp)
    }

    /// Contact matrix over `chroms` holding `records`.
    pub fn contacts(chroms: &[(&str, u64)], tile_edge: usize, records: Vec<ContactRecord>) -> Self {
        Self::new(
            DatasetMetadata::matrix(table(chroms), tile_edge),
            Values::Contacts(records),
        )
    }

    /// Contact matrix with an explicit resolution list.
    pub fn multires(
        chroms: &[(&str, u64)],
        tile_edge: usize,
        resolutions: &[u64],
        records: Vec<ContactRecord>,
    ) -> Self {
        let metadata = DatasetMetadata::matrix_with_resolutions(
            table(chroms),
            tile_edge,
            resolutions.iter().copied(),
        )
        .expect("positive resolutions");
        Self::new(metadata, Values::Contacts(records))
    }

    fn new(metadata: DatasetMetadata, values: Values) -> Self {
        Self {
            metadata,
            values,
            failing_transform: None,
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Declare the transforms the dataset offers.
    pub fn with_transforms(mut self, transforms: &[&str]) -> Self {
        self.metadata = self.metadata.with_transforms(transforms.iter().copied());
        self
    }

    /// Fail every fetch that asks for `transform`.
    pub fn failing_on(mut self, transform: &str) -> Self {
        self.failing_transform = Some(transform.to_string());
        self
    }

    pub async fn requests(&self) -> Vec<FetchRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

fn table(chroms: &[(&str, u64)]) -> ChromosomeOffsetTable {
    ChromosomeOffsetTable::new(chroms.iter().copied()).expect("valid chromosome sizes")
}

fn transform_of(request: &FetchRequest) -> &str {
    match request {
        FetchRequest::Vector { transform, .. } | FetchRequest::Matrix { transform, .. } => {
            transform.as_str()
        }
    }
}

#[async_trait]
impl Dataset for RecordingDataset {
    fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedValues, FetchError> {
        self.requests.write().await.push(request.clone());

        if self.failing_transform.as_deref() == Some(transform_of(request)) {
            return Err(FetchError::Store("simulated read failure".to_string()));
        }

        match (request, &self.values) {
            (
                FetchRequest::Vector {
                    chrom,
                    start,
                    end,
                    bins,
                    ..
                },
                Values::Ramp,
            ) => {
                let offset = self
                    .metadata
                    .chromosomes
                    .by_name(chrom)
                    .map(|c| c.offset)
                    .ok_or_else(|| FetchError::NotFound(chrom.clone()))?;
                let width = (end - start).div_ceil(*bins as u64);
                Ok(FetchedValues::Dense(
                    (0..*bins as u64)
                        .map(|b| (offset + start + b * width) as f32)
                        .collect(),
                ))
            }
            (FetchRequest::Matrix { x, y, .. }, Values::Contacts(records)) => {
                Ok(FetchedValues::Sparse(
                    records
                        .iter()
                        .filter(|r| x.contains(&r.coord1) && y.contains(&r.coord2))
                        .copied()
                        .collect(),
                ))
            }
            _ => Err(FetchError::UnexpectedShape(
                "request does not match dataset kind".to_string(),
            )),
        }
    }
}

// =============================================================================
// Mock Opener
// =============================================================================

/// A mock opener serving a fixed set of datasets.
#[derive(Clone, Default)]
pub struct MockOpener {
    datasets: HashMap<String, Arc<RecordingDataset>>,
    open_count: Arc<AtomicUsize>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(
        mut self,
        dataset_id: impl Into<String>,
        dataset: Arc<RecordingDataset>,
    ) -> Self {
        self.datasets.insert(dataset_id.into(), dataset);
        self
    }

    /// Number of `open` calls, successful or not.
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetOpener for MockOpener {
    async fn open(&self, dataset_id: &str) -> Result<Arc<dyn Dataset>, FetchError> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        match self.datasets.get(dataset_id) {
            Some(dataset) => Ok(Arc::clone(dataset) as Arc<dyn Dataset>),
            None => Err(FetchError::NotFound(dataset_id.to_string())),
        }
    }
}

/// Build a service over `opener`.
pub fn service(opener: MockOpener) -> TileService<MockOpener> {
    TileService::new(DatasetRegistry::from_config(opener, &TilingConfig::default()))
}

// =============================================================================
// Outcome Helpers
// =============================================================================

/// The encoded tile of a ready outcome, panicking otherwise.
pub fn ready(outcome: &TileOutcome) -> &EncodedTile {
    match outcome {
        TileOutcome::Ready(tile) => tile,
        other => panic!("expected ready tile, got {other:?}"),
    }
}

/// Decoded values of a ready outcome.
pub fn values(outcome: &TileOutcome) -> Vec<f32> {
    ready(outcome).decode().expect("valid base64 payload")
}
