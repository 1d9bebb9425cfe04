//! Contact-matrix batch integration tests.
//!
//! Tests verify:
//! - One bounding-box fetch per group of adjacent tiles
//! - Scatter of sparse records into each tile's grid
//! - Bounding boxes clipped to the genome extent
//! - Duplicate records, NaN contacts and wide values
//! - Explicit resolution lists

use std::sync::Arc;

use genome_tiler::dataset::{ContactRecord, FetchRequest};
use genome_tiler::error::TileError;
use genome_tiler::tile::{DType, DropReason, TileOutcome};

use super::test_utils::{ready, service, values, MockOpener, RecordingDataset};

/// 60 bp genome, 4 bins per tile edge → max zoom 4, 1 bp bins at zoom 4.
const CHROMS: &[(&str, u64)] = &[("chr1", 40), ("chr2", 20)];

fn hic(records: Vec<ContactRecord>) -> Arc<RecordingDataset> {
    Arc::new(RecordingDataset::contacts(CHROMS, 4, records))
}

fn matrix_request(
    x: std::ops::Range<u64>,
    y: std::ops::Range<u64>,
    resolution: u64,
) -> FetchRequest {
    FetchRequest::Matrix {
        x,
        y,
        resolution,
        transform: "default".to_string(),
    }
}

/// A 4×4 grid with `cells` set and zeros elsewhere.
fn grid(cells: &[(usize, f32)]) -> Vec<f32> {
    let mut values = vec![0.0; 16];
    for &(index, value) in cells {
        values[index] = value;
    }
    values
}

// =============================================================================
// Grouping and Scatter
// =============================================================================

#[tokio::test]
async fn test_single_tile_scatter() {
    let dataset = hic(vec![
        ContactRecord::new(5, 9, 2.0),
        ContactRecord::new(4, 8, f32::NAN),
        ContactRecord::new(0, 0, 9.0),
    ]);
    let service = service(MockOpener::new().with_dataset("hic", dataset.clone()));

    let results = service.tiles(&["hic.4.1.2"], None).await;

    assert_eq!(dataset.requests().await, vec![matrix_request(4..8, 8..12, 1)]);

    let tile = ready(&results[0].1);
    assert_eq!(tile.dtype, DType::Float16);
    assert_eq!(tile.min_value, 0.0);
    assert_eq!(tile.max_value, Some(2.0));
    // row = coord2 offset, column = coord1 offset
    assert_eq!(tile.decode().unwrap(), grid(&[(5, 2.0)]));
}

#[tokio::test]
async fn test_square_group_one_fetch() {
    let dataset = hic(vec![ContactRecord::new(1, 5, 1.0)]);
    let service = service(MockOpener::new().with_dataset("hic", dataset.clone()));

    let results = service
        .tiles(&["hic.4.0.0", "hic.4.0.1", "hic.4.1.0", "hic.4.1.1"], None)
        .await;

    assert_eq!(dataset.requests().await, vec![matrix_request(0..8, 0..8, 1)]);
    assert_eq!(values(&results[1].1), grid(&[(5, 1.0)]));
    for i in [0, 2, 3] {
        assert_eq!(values(&results[i].1), grid(&[]));
    }
}

#[tokio::test]
async fn test_bridge_tile_keeps_separate_groups() {
    let dataset = hic(Vec::new());
    let service = service(MockOpener::new().with_dataset("hic", dataset.clone()));

    let results = service
        .tiles(&["hic.4.1.1", "hic.4.0.2", "hic.4.0.0"], None)
        .await;

    assert!(results.iter().all(|(_, outcome)| outcome.is_ready()));
    assert_eq!(
        dataset.requests().await,
        vec![
            matrix_request(0..8, 0..8, 1),
            matrix_request(0..4, 8..12, 1),
        ]
    );
}

#[tokio::test]
async fn test_box_clipped_to_extent() {
    // zoom 1: 8 bp bins, tiles span 32 bp, the second tile ends at 60
    let dataset = hic(vec![ContactRecord::new(56, 40, 5.0)]);
    let service = service(MockOpener::new().with_dataset("hic", dataset.clone()));

    let results = service.tiles(&["hic.1.1.1"], None).await;

    assert_eq!(dataset.requests().await, vec![matrix_request(32..60, 32..60, 8)]);
    assert_eq!(values(&results[0].1), grid(&[(7, 5.0)]));
}

// =============================================================================
// Values
// =============================================================================

#[tokio::test]
async fn test_duplicate_cell_last_record_wins() {
    let dataset = hic(vec![
        ContactRecord::new(5, 5, 3.0),
        ContactRecord::new(5, 5, f32::NAN),
        ContactRecord::new(6, 6, f32::NAN),
        ContactRecord::new(6, 6, 4.0),
    ]);
    let service = service(MockOpener::new().with_dataset("hic", dataset));

    let results = service.tiles(&["hic.4.1.1"], None).await;

    assert_eq!(values(&results[0].1), grid(&[(10, 4.0)]));
}

#[tokio::test]
async fn test_large_counts_use_float32() {
    let dataset = hic(vec![ContactRecord::new(0, 0, 100_000.0)]);
    let service = service(MockOpener::new().with_dataset("hic", dataset));

    let results = service.tiles(&["hic.4.0.0", "hic.4.1.1"], None).await;

    let wide = ready(&results[0].1);
    assert_eq!(wide.dtype, DType::Float32);
    assert_eq!(wide.max_value, Some(100_000.0));
    assert_eq!(wide.decode().unwrap()[0], 100_000.0);

    // same group, chosen independently
    assert_eq!(ready(&results[1].1).dtype, DType::Float16);
}

// =============================================================================
// Transforms and Resolutions
// =============================================================================

#[tokio::test]
async fn test_transforms_bucket_separately() {
    let dataset = Arc::new(RecordingDataset::contacts(CHROMS, 4, Vec::new()).with_transforms(&["KR"]));
    let service = service(MockOpener::new().with_dataset("hic", dataset.clone()));

    let results = service
        .tiles(&["hic.4.0.0", "hic.4.0.0.KR", "hic.4.0.1.VC"], None)
        .await;

    assert!(results[0].1.is_ready());
    assert!(results[1].1.is_ready());
    assert!(matches!(
        results[2].1.error(),
        Some(TileError::UnknownTransform { available, .. }) if available == &vec!["KR".to_string()]
    ));

    let transforms: Vec<_> = dataset
        .requests()
        .await
        .into_iter()
        .map(|r| match r {
            FetchRequest::Matrix { transform, .. } => transform,
            FetchRequest::Vector { .. } => panic!("unexpected vector fetch"),
        })
        .collect();
    assert_eq!(transforms, vec!["KR", "default"]);
}

#[tokio::test]
async fn test_explicit_resolutions() {
    // zoom 0 → 16 bp, zoom 1 → 4 bp, zoom 2 → 1 bp
    let dataset = Arc::new(RecordingDataset::multires(CHROMS, 4, &[1, 4, 16], Vec::new()));
    let service = service(MockOpener::new().with_dataset("m", dataset.clone()));

    let results = service
        .tiles(&["m.2.1.1", "m.0.0.0", "m.3.0.0", "m.2.15.0"], None)
        .await;

    assert!(results[0].1.is_ready());
    assert!(results[1].1.is_ready());
    assert!(matches!(
        results[2].1,
        TileOutcome::Dropped(DropReason::ZoomOutOfRange {
            zoom: 3,
            max_zoom: 2
        })
    ));
    assert!(matches!(
        results[3].1,
        TileOutcome::Dropped(DropReason::OutOfBoundsPosition { tiles_at_zoom: 15, .. })
    ));

    assert_eq!(
        dataset.requests().await,
        vec![matrix_request(0..60, 0..60, 16), matrix_request(4..8, 4..8, 1)]
    );
}

#[tokio::test]
async fn test_matrix_ids_need_two_positions() {
    let dataset = hic(Vec::new());
    let service = service(MockOpener::new().with_dataset("hic", dataset.clone()));

    let results = service.tiles(&["hic.4.1", "hic.4.1.2.KR.x"], None).await;

    for (_, outcome) in &results {
        assert!(matches!(
            outcome.error(),
            Some(TileError::MalformedTileId { .. })
        ));
    }
    assert_eq!(dataset.request_count().await, 0);
}
