//! Reconstruction over real HTTP.
//!
//! A local axum server publishes a synthetic pyramid and the reqwest-backed
//! client fetches it, exercising the same path the binary uses.
//!
//! Tests verify:
//! - Full reconstruction through `ReqwestHttpClient`
//! - HTTP error statuses surfacing as fetch errors
//! - CLI argument handling feeding the pipeline

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use clap::Parser;
use tokio::net::TcpListener;

use zoomify_stitch::error::{FetchError, MetadataError, ReconstructError};
use zoomify_stitch::{Cli, Reconstructor, ReqwestHttpClient};

use super::test_utils::{dir_entries, is_valid_jpeg, SyntheticPyramid};

// =============================================================================
// Test Server
// =============================================================================

#[derive(Clone)]
struct ServerState {
    files: Arc<HashMap<String, Bytes>>,
    hits: Arc<AtomicUsize>,
}

async fn serve_file(
    State(state): State<ServerState>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    match state.files.get(&path) {
        Some(data) => {
            let content_type = if path.ends_with(".xml") {
                "application/xml"
            } else {
                "image/jpeg"
            };
            ([(header::CONTENT_TYPE, content_type)], data.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve `files` under `/zoomify/` on an ephemeral port.
async fn spawn_server(files: HashMap<String, Bytes>) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = ServerState {
        files: Arc::new(files),
        hits: Arc::clone(&hits),
    };

    let app = Router::new()
        .route("/zoomify/{*path}", get(serve_file))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, hits)
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{}/zoomify/", addr)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_reconstruct_over_http() {
    let pyramid = SyntheticPyramid::new(600, 300, 256);
    let (addr, hits) = spawn_server(pyramid.files.clone()).await;
    let target = tempfile::tempdir().unwrap();

    let client = ReqwestHttpClient::new().unwrap();
    let report = Reconstructor::new(client)
        .run(&base_url(addr), target.path(), "remote")
        .await
        .unwrap();

    // Descriptor plus 3x2 tiles
    assert_eq!(hits.load(Ordering::SeqCst), 7);
    assert_eq!(report.tiles, 6);

    let data = std::fs::read(&report.output).unwrap();
    assert!(is_valid_jpeg(&data));
    let img = image::load_from_memory(&data).unwrap();
    assert_eq!((img.width(), img.height()), (600, 300));

    assert_eq!(dir_entries(target.path()), vec!["remote.jpg"]);
}

#[tokio::test]
async fn test_missing_tile_returns_404() {
    let mut pyramid = SyntheticPyramid::new(600, 300, 256);
    pyramid.files.remove("TileGroup0/2-2-1.jpg");
    let (addr, _) = spawn_server(pyramid.files.clone()).await;
    let target = tempfile::tempdir().unwrap();

    let result = Reconstructor::new(ReqwestHttpClient::new().unwrap())
        .run(&base_url(addr), target.path(), "remote")
        .await;

    match result {
        Err(ReconstructError::TileFetch { url, source }) => {
            assert!(url.ends_with("TileGroup0/2-2-1.jpg"));
            assert!(matches!(source, FetchError::Status { status: 404, .. }));
        }
        other => panic!("Expected TileFetch error, got {:?}", other),
    }
    assert!(dir_entries(target.path()).is_empty());
}

#[tokio::test]
async fn test_unreachable_server() {
    // Bind and immediately release a port so nothing is listening on it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let target = tempfile::tempdir().unwrap();
    let result = Reconstructor::new(ReqwestHttpClient::new().unwrap())
        .run(&base_url(addr), target.path(), "remote")
        .await;

    assert!(matches!(
        result,
        Err(ReconstructError::Metadata(MetadataError::Unavailable {
            source: FetchError::Connection(_),
            ..
        }))
    ));
    assert!(dir_entries(target.path()).is_empty());
}

#[tokio::test]
async fn test_cli_arguments_drive_reconstruction() {
    let pyramid = SyntheticPyramid::new(512, 512, 256);
    let (addr, _) = spawn_server(pyramid.files.clone()).await;
    let target = tempfile::tempdir().unwrap();

    // No trailing slash on the base URL
    let base = format!("http://{}/zoomify", addr);
    let target_arg = target.path().to_string_lossy().into_owned();
    let cli = Cli::try_parse_from([
        "zoomify-stitch",
        base.as_str(),
        target_arg.as_str(),
        "from-cli",
        "--concurrency",
        "2",
        "--jpeg-quality",
        "75",
    ])
    .unwrap();

    cli.validate().unwrap();
    assert_eq!(cli.normalized_base_url(), base_url(addr));

    let report = Reconstructor::with_options(ReqwestHttpClient::new().unwrap(), cli.options())
        .run(&cli.normalized_base_url(), &cli.target_dir, &cli.output_name)
        .await
        .unwrap();

    assert_eq!(report.output, target.path().join("from-cli.jpg"));
    assert_eq!(dir_entries(target.path()), vec!["from-cli.jpg"]);
}
