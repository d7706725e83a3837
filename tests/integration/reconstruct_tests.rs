//! End-to-end reconstruction tests against a mock HTTP client.
//!
//! Tests verify:
//! - Output dimensions and tile placement
//! - Request pattern (descriptor once, each tile once)
//! - Row spacing choices for non-256 tile sizes
//! - Failure handling and scratch directory cleanup

use std::time::Duration;

use bytes::Bytes;
use image::Rgb;

use zoomify_stitch::error::{FetchError, MetadataError, ReconstructError};
use zoomify_stitch::{ReconstructOptions, Reconstructor, VerticalStep};

use super::test_utils::{
    colors_close, dir_entries, is_valid_jpeg, tile_color, MockHttpClient, SyntheticPyramid,
};

const BASE: &str = "http://zoomify.example.com/images/harbor/";

fn options(concurrency: usize) -> ReconstructOptions {
    ReconstructOptions {
        concurrency,
        ..Default::default()
    }
}

// =============================================================================
// Successful Runs
// =============================================================================

#[tokio::test]
async fn test_reconstruct_512_square() {
    let target = tempfile::tempdir().unwrap();
    let pyramid = SyntheticPyramid::new(512, 512, 256);
    let client = pyramid.client(BASE);

    let reconstructor = Reconstructor::with_options(client.clone(), options(4));
    let report = reconstructor
        .run(BASE, target.path(), "harbor")
        .await
        .unwrap();

    // Descriptor plus the four tiles of tier 1
    assert_eq!(client.request_count(), 5);
    let requests = client.requests();
    assert_eq!(requests[0], format!("{}ImageProperties.xml", BASE));
    let mut tile_requests: Vec<&str> = requests[1..].iter().map(String::as_str).collect();
    tile_requests.sort();
    assert_eq!(
        tile_requests,
        vec![
            format!("{}TileGroup0/1-0-0.jpg", BASE),
            format!("{}TileGroup0/1-0-1.jpg", BASE),
            format!("{}TileGroup0/1-1-0.jpg", BASE),
            format!("{}TileGroup0/1-1-1.jpg", BASE),
        ]
    );

    assert_eq!(report.tiles, 4);
    assert_eq!(report.tier, 1);
    assert_eq!(report.tier_count, 2);

    let data = std::fs::read(&report.output).unwrap();
    assert!(is_valid_jpeg(&data));

    let img = image::load_from_memory(&data).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (512, 512));

    // Only the output remains; the scratch directory is gone
    assert_eq!(dir_entries(target.path()), vec!["harbor.jpg"]);
}

#[tokio::test]
async fn test_reconstruct_places_tiles() {
    let target = tempfile::tempdir().unwrap();
    let pyramid = SyntheticPyramid::new(1000, 700, 256);

    let report = Reconstructor::new(pyramid.client(BASE))
        .run(BASE, target.path(), "placed")
        .await
        .unwrap();

    let img = image::open(&report.output).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (1000, 700));

    for tile in pyramid.tiles(BASE) {
        let w = (1000 - tile.x * 256).min(256);
        let h = (700 - tile.y * 256).min(256);
        let cx = tile.x * 256 + w / 2;
        let cy = tile.y * 256 + h / 2;

        let actual = *img.get_pixel(cx, cy);
        assert!(
            colors_close(actual, tile_color(tile.x, tile.y), 12),
            "tile {} at ({}, {}): got {:?}, expected {:?}",
            tile,
            cx,
            cy,
            actual,
            tile_color(tile.x, tile.y)
        );
    }
}

#[tokio::test]
async fn test_reconstruct_keeps_existing_files() {
    let target = tempfile::tempdir().unwrap();
    std::fs::write(target.path().join("notes.txt"), b"keep me").unwrap();
    std::fs::write(target.path().join("harbor.jpg"), b"stale").unwrap();

    let pyramid = SyntheticPyramid::new(300, 300, 256);
    let report = Reconstructor::new(pyramid.client(BASE))
        .run(BASE, target.path(), "harbor")
        .await
        .unwrap();

    assert_eq!(dir_entries(target.path()), vec!["harbor.jpg", "notes.txt"]);
    assert!(is_valid_jpeg(&std::fs::read(&report.output).unwrap()));
    assert_eq!(
        std::fs::read(target.path().join("notes.txt")).unwrap(),
        b"keep me"
    );
}

// =============================================================================
// Row Spacing
// =============================================================================

#[tokio::test]
async fn test_tile_size_step_with_large_tiles() {
    let target = tempfile::tempdir().unwrap();
    let pyramid = SyntheticPyramid::new(1024, 1024, 512);

    let options = ReconstructOptions {
        vertical_step: VerticalStep::TileSize,
        ..Default::default()
    };
    let report = Reconstructor::with_options(pyramid.client(BASE), options)
        .run(BASE, target.path(), "large")
        .await
        .unwrap();

    let img = image::open(&report.output).unwrap().to_rgb8();
    assert!(colors_close(*img.get_pixel(256, 256), tile_color(0, 0), 12));
    assert!(colors_close(*img.get_pixel(256, 900), tile_color(0, 1), 12));
    assert!(colors_close(*img.get_pixel(900, 900), tile_color(1, 1), 12));
}

#[tokio::test]
async fn test_fixed_step_with_large_tiles() {
    let target = tempfile::tempdir().unwrap();
    let pyramid = SyntheticPyramid::new(1024, 1024, 512);

    // The second row is pasted at y = 256, leaving the bottom band unpainted
    let report = Reconstructor::new(pyramid.client(BASE))
        .run(BASE, target.path(), "large")
        .await
        .unwrap();

    let img = image::open(&report.output).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (1024, 1024));
    assert!(colors_close(*img.get_pixel(256, 128), tile_color(0, 0), 12));
    assert!(colors_close(*img.get_pixel(256, 500), tile_color(0, 1), 12));
    assert!(colors_close(*img.get_pixel(256, 900), Rgb([0, 0, 0]), 12));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_one_failing_tile_produces_nothing() {
    let target = tempfile::tempdir().unwrap();
    let pyramid = SyntheticPyramid::new(512, 512, 256);
    let failing = format!("{}TileGroup0/1-1-1.jpg", BASE);
    let client = pyramid.client(BASE).fail_url(failing.clone());

    let result = Reconstructor::with_options(client, options(2))
        .run(BASE, target.path(), "harbor")
        .await;

    match result {
        Err(ReconstructError::TileFetch { url, source }) => {
            assert_eq!(url, failing);
            assert!(matches!(source, FetchError::Status { status: 500, .. }));
        }
        other => panic!("Expected TileFetch error, got {:?}", other),
    }

    assert!(!target.path().join("harbor.jpg").exists());
    assert!(dir_entries(target.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failures_during_large_writes_leave_nothing() {
    // 4096x4096 @ 256: top tier is 16x16 tiles
    let pyramid = SyntheticPyramid::new(4096, 4096, 256);
    let body = Bytes::from(vec![0x5A; 1024 * 1024]);

    let mut responses = pyramid.responses(BASE);
    for tile in pyramid.tiles(BASE) {
        responses.insert(tile.url, body.clone());
    }

    let tiles = pyramid.tiles(BASE);
    for run in 0..5 {
        let target = tempfile::tempdir().unwrap();
        let client = [5, 40, 77]
            .iter()
            .fold(MockHttpClient::new(responses.clone()), |client, &i| {
                client.fail_url(tiles[i].url.clone())
            })
            .with_latency(Duration::from_millis(20), Duration::from_millis(10));

        let result = Reconstructor::with_options(client, options(64))
            .run(BASE, target.path(), "harbor")
            .await;

        assert!(
            matches!(result, Err(ReconstructError::TileFetch { .. })),
            "run {}: {:?}",
            run,
            result
        );
        assert!(
            dir_entries(target.path()).is_empty(),
            "run {} left {:?}",
            run,
            dir_entries(target.path())
        );
    }
}

#[tokio::test]
async fn test_missing_descriptor_fetches_no_tiles() {
    let target = tempfile::tempdir().unwrap();
    let client = MockHttpClient::default();

    let result = Reconstructor::new(client.clone())
        .run(BASE, target.path(), "harbor")
        .await;

    assert!(matches!(
        result,
        Err(ReconstructError::Metadata(MetadataError::Unavailable { .. }))
    ));
    assert_eq!(client.request_count(), 1);
    assert!(dir_entries(target.path()).is_empty());
}

#[tokio::test]
async fn test_malformed_descriptor() {
    let target = tempfile::tempdir().unwrap();
    let mut pyramid = SyntheticPyramid::new(512, 512, 256);
    pyramid.files.insert(
        "ImageProperties.xml".to_string(),
        Bytes::from_static(br#"<IMAGE_PROPERTIES WIDTH="512" TILESIZE="256" />"#),
    );

    let client = pyramid.client(BASE);
    let result = Reconstructor::new(client.clone())
        .run(BASE, target.path(), "harbor")
        .await;

    assert!(matches!(
        result,
        Err(ReconstructError::Metadata(MetadataError::Malformed { .. }))
    ));
    assert_eq!(client.request_count(), 1);
    assert!(dir_entries(target.path()).is_empty());
}

#[tokio::test]
async fn test_undecodable_tile_cleans_up() {
    let target = tempfile::tempdir().unwrap();
    let mut pyramid = SyntheticPyramid::new(512, 512, 256);
    pyramid.files.insert(
        "TileGroup0/1-0-0.jpg".to_string(),
        Bytes::from_static(b"<html>rate limited</html>"),
    );

    let result = Reconstructor::new(pyramid.client(BASE))
        .run(BASE, target.path(), "harbor")
        .await;

    assert!(matches!(result, Err(ReconstructError::Composite(_))));
    assert!(dir_entries(target.path()).is_empty());
}
