//! Signal-track batch integration tests.
//!
//! Tests verify:
//! - Adjacent tiles are served by one fetch per chromosome segment
//! - Groups spanning chromosome boundaries split their fetch correctly
//! - Trailing partial bins and the region past the genome end
//! - Dropped and failed tiles, including group-wide fetch failures
//! - Alternate chromosome-size sets and handle reuse

use std::sync::Arc;

use genome_tiler::dataset::FetchRequest;
use genome_tiler::error::{FetchError, TileError};
use genome_tiler::genome::ChromosomeOffsetTable;
use genome_tiler::tile::{DType, DropReason, TileOutcome};

use super::test_utils::{ready, service, values, MockOpener, RecordingDataset};

/// Two 64 bp chromosomes, 8 bins per tile → max zoom 4, 1 bp bins at zoom 4.
fn track() -> Arc<RecordingDataset> {
    Arc::new(RecordingDataset::ramp(&[("chr1", 64), ("chr2", 64)], 8))
}

fn ramp(start: u64, len: u64) -> Vec<f32> {
    (start..start + len).map(|v| v as f32).collect()
}

fn vector_request(chrom: &str, start: u64, end: u64, bins: usize) -> FetchRequest {
    FetchRequest::Vector {
        chrom: chrom.to_string(),
        start,
        end,
        bins,
        transform: "default".to_string(),
    }
}

// =============================================================================
// Batching
// =============================================================================

#[tokio::test]
async fn test_adjacent_tiles_share_one_fetch() {
    let dataset = track();
    let service = service(MockOpener::new().with_dataset("track", dataset.clone()));

    let results = service
        .tiles(&["track.4.0", "track.4.1", "track.4.2", "track.4.9"], None)
        .await;

    assert_eq!(
        dataset.requests().await,
        vec![
            vector_request("chr1", 0, 24, 24),
            vector_request("chr2", 8, 16, 8),
        ]
    );
    assert_eq!(values(&results[1].1), ramp(8, 8));
    assert_eq!(values(&results[3].1), ramp(72, 8));
}

#[tokio::test]
async fn test_group_spans_chromosome_boundary() {
    let dataset = track();
    let service = service(MockOpener::new().with_dataset("track", dataset.clone()));

    let results = service.tiles(&["track.4.7", "track.4.8"], None).await;

    assert_eq!(
        dataset.requests().await,
        vec![
            vector_request("chr1", 56, 64, 8),
            vector_request("chr2", 0, 8, 8),
        ]
    );
    assert_eq!(values(&results[0].1), ramp(56, 8));
    assert_eq!(values(&results[1].1), ramp(64, 8));
}

#[tokio::test]
async fn test_coarsest_tile_covers_genome() {
    let dataset = track();
    let service = service(MockOpener::new().with_dataset("track", dataset.clone()));

    let results = service.tiles(&["track.0.0"], None).await;

    assert_eq!(dataset.request_count().await, 2);
    let tile = ready(&results[0].1);
    assert_eq!(tile.dtype, DType::Float16);
    assert_eq!(tile.min_value, 0.0);
    assert_eq!(tile.max_value, None);
    assert_eq!(
        tile.decode().unwrap(),
        vec![0.0, 16.0, 32.0, 48.0, 64.0, 80.0, 96.0, 112.0]
    );
}

// =============================================================================
// Genome Edges
// =============================================================================

#[tokio::test]
async fn test_trailing_partial_bin_dropped() {
    // extent 32, edge 4 → max zoom 3; zoom 1 has 4 bp bins
    let dataset = Arc::new(RecordingDataset::ramp(&[("chr1", 10), ("chr2", 22)], 4));
    let service = service(MockOpener::new().with_dataset("odd", dataset.clone()));

    let results = service.tiles(&["odd.1.0"], None).await;

    assert_eq!(
        dataset.requests().await,
        vec![vector_request("chr1", 0, 10, 3), vector_request("chr2", 0, 6, 2)]
    );
    // chr1 keeps 2 of its 3 bins; chr2 starts right after
    assert_eq!(values(&results[0].1), vec![0.0, 4.0, 10.0, 13.0]);
}

#[tokio::test]
async fn test_past_genome_end_is_zero_filled() {
    // extent 100, edge 8 → max zoom 4, genome ends inside the last tile
    let dataset = Arc::new(RecordingDataset::ramp(&[("chr1", 100)], 8));
    let service = service(MockOpener::new().with_dataset("short", dataset.clone()));

    let results = service.tiles(&["short.4.12", "short.0.0"], None).await;

    assert_eq!(
        values(&results[0].1),
        vec![96.0, 97.0, 98.0, 99.0, 0.0, 0.0, 0.0, 0.0]
    );
    assert_eq!(
        values(&results[1].1),
        vec![0.0, 15.0, 30.0, 45.0, 60.0, 75.0, 0.0, 0.0]
    );

    // the zero-filled part is never fetched; zoom 0 is planned first
    assert_eq!(
        dataset.requests().await,
        vec![vector_request("chr1", 0, 100, 7), vector_request("chr1", 96, 100, 4)]
    );
}

#[tokio::test]
async fn test_tile_values_independent_of_batch() {
    // chr2 starts at 9, off the 2 bp bin grid of zoom 3
    let chroms = [("chr1", 9), ("chr2", 55)];
    let ids = ["t.3.0", "t.3.1", "t.3.2", "t.3.3"];

    let batched = Arc::new(RecordingDataset::ramp(&chroms, 4));
    let tiler = service(MockOpener::new().with_dataset("t", batched.clone()));
    let together = tiler.tiles(&ids, None).await;

    for (i, id) in ids.iter().enumerate() {
        let single = Arc::new(RecordingDataset::ramp(&chroms, 4));
        let alone = service(MockOpener::new().with_dataset("t", single))
            .tiles(&[*id], None)
            .await;
        assert_eq!(values(&together[i].1), values(&alone[0].1), "tile {id}");
    }

    assert_eq!(values(&together[1].1), vec![9.0, 11.0, 13.0, 15.0]);
    assert_eq!(values(&together[2].1), vec![16.0, 18.0, 20.0, 22.0]);

    // chr2 needs a second fetch once tiles are back on the absolute grid
    assert_eq!(
        batched.requests().await,
        vec![
            vector_request("chr1", 0, 9, 5),
            vector_request("chr2", 0, 7, 4),
            vector_request("chr2", 7, 23, 8),
        ]
    );
}

// =============================================================================
// Dropped and Failed Tiles
// =============================================================================

#[tokio::test]
async fn test_out_of_range_tiles_are_dropped() {
    let dataset = track();
    let service = service(MockOpener::new().with_dataset("track", dataset.clone()));

    let results = service
        .tiles(&["track.5.0", "track.4.16", "track.4.-1", "track.4.15"], None)
        .await;

    assert!(matches!(
        results[0].1,
        TileOutcome::Dropped(DropReason::ZoomOutOfRange {
            zoom: 5,
            max_zoom: 4
        })
    ));
    assert!(matches!(
        &results[1].1,
        TileOutcome::Dropped(DropReason::OutOfBoundsPosition { position, tiles_at_zoom: 16 })
            if position == &vec![16]
    ));
    assert!(results[2].1.is_dropped());
    assert!(results[3].1.is_ready());
    assert_eq!(dataset.request_count().await, 1);
}

#[tokio::test]
async fn test_unknown_transform_fails_without_fetch() {
    let dataset = track();
    let service = service(MockOpener::new().with_dataset("track", dataset.clone()));

    let results = service.tiles(&["track.4.0.KR"], None).await;

    assert!(matches!(
        results[0].1.error(),
        Some(TileError::UnknownTransform { transform, .. }) if transform == "KR"
    ));
    assert_eq!(dataset.request_count().await, 0);
}

#[tokio::test]
async fn test_fetch_failure_fails_whole_group() {
    let dataset = Arc::new(
        RecordingDataset::ramp(&[("chr1", 64), ("chr2", 64)], 8)
            .with_transforms(&["broken"])
            .failing_on("broken"),
    );
    let service = service(MockOpener::new().with_dataset("flaky", dataset.clone()));

    let results = service
        .tiles(
            &["flaky.4.0.broken", "flaky.4.1.broken", "flaky.4.0", "flaky.4.5.broken"],
            None,
        )
        .await;

    for i in [0, 1, 3] {
        assert!(matches!(
            results[i].1.error(),
            Some(TileError::FetchFailure(FetchError::Store(_)))
        ));
    }
    assert_eq!(values(&results[2].1), ramp(0, 8));
    assert_eq!(dataset.request_count().await, 3);
}

#[tokio::test]
async fn test_outcomes_follow_input_order() {
    let dataset = track();
    let service = service(MockOpener::new().with_dataset("track", dataset.clone()));

    let ids = [
        "track.4.3",
        "track.x.1",
        "track.4.3.default",
        "track.4.2",
        "nope.1.1",
    ];
    let results = service.tiles(&ids, None).await;

    let returned: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(returned, ids);

    assert_eq!(values(&results[0].1), ramp(24, 8));
    assert_eq!(values(&results[2].1), ramp(24, 8));
    assert_eq!(values(&results[3].1), ramp(16, 8));
    assert!(matches!(
        results[1].1.error(),
        Some(TileError::MalformedTileId { .. })
    ));
    assert!(matches!(
        results[4].1.error(),
        Some(TileError::FetchFailure(FetchError::NotFound(id))) if id == "nope"
    ));

    // both spellings of tile 3 land in one bucket with tile 2
    assert_eq!(dataset.request_count().await, 1);
}

// =============================================================================
// Chromosome-Size Sets
// =============================================================================

fn alt_layout() -> ChromosomeOffsetTable {
    // extent 32 → max zoom 2 at 8 bins per tile
    ChromosomeOffsetTable::new(vec![("chr1", 32)]).unwrap()
}

#[tokio::test]
async fn test_chromsizes_option_selects_layout() {
    let dataset = track();
    let service = service(MockOpener::new().with_dataset("track", dataset.clone()))
        .with_chromsizes_set("alt", alt_layout());

    let results = service
        .tiles(&["track|cos:alt.2.3", "track|cos:alt.3.0", "track.2.3"], None)
        .await;

    assert_eq!(values(&results[0].1), ramp(24, 8));
    assert!(matches!(
        results[1].1,
        TileOutcome::Dropped(DropReason::ZoomOutOfRange {
            zoom: 3,
            max_zoom: 2
        })
    ));
    assert!(results[2].1.is_ready());

    assert_eq!(
        dataset.requests().await,
        vec![
            // native layout: zoom 2 has 4 bp bins, tile 3 is [96, 128)
            vector_request("chr2", 32, 64, 8),
            vector_request("chr1", 24, 32, 8),
        ]
    );
}

#[tokio::test]
async fn test_request_selector_and_precedence() {
    let dataset = track();
    let service = service(MockOpener::new().with_dataset("track", dataset.clone()))
        .with_chromsizes_set("alt", alt_layout());

    let results = service.tiles(&["track.2.3"], Some("alt")).await;
    assert_eq!(values(&results[0].1), ramp(24, 8));

    let results = service
        .tiles(&["track|cos:alt.2.0", "track.0.0"], Some("missing"))
        .await;
    assert!(results[0].1.is_ready());
    assert!(matches!(
        results[1].1.error(),
        Some(TileError::UnknownChromSizes(name)) if name == "missing"
    ));
}

#[tokio::test]
async fn test_tileset_info_with_layout() {
    let service = service(MockOpener::new().with_dataset("track", track()))
        .with_chromsizes_set("alt", alt_layout());

    let native = service.tileset_info("track", None).await.unwrap();
    assert_eq!(native.max_zoom, 4);
    assert_eq!(native.max_pos, vec![128]);

    let alt = service.tileset_info("track", Some("alt")).await.unwrap();
    assert_eq!(alt.max_zoom, 2);
    assert_eq!(alt.max_width, 32);
    assert_eq!(alt.resolutions, vec![4, 2, 1]);
}

// =============================================================================
// Handle Reuse
// =============================================================================

#[tokio::test]
async fn test_registry_reuses_handles() {
    let opener = MockOpener::new().with_dataset("track", track());
    let service = service(opener.clone());

    service.tiles(&["track.4.0"], None).await;
    service.tiles(&["track.4.1", "track.3.0"], None).await;
    assert_eq!(opener.open_count(), 1);

    // a missing dataset is tried once per batch, never cached
    service.tiles(&["nope.0.0", "nope.0.1"], None).await;
    assert_eq!(opener.open_count(), 2);
    service.tiles(&["nope.0.0"], None).await;
    assert_eq!(opener.open_count(), 3);

    assert_eq!(service.registry().cached_count().await, 1);
}
