//! # zoomify-stitch
//!
//! Rebuilds the full-resolution image behind a Zoomify tile pyramid.
//!
//! Zoomify viewers publish an image as a pyramid of 256px JPEG tiles spread
//! across `TileGroupN/` directories, plus an `ImageProperties.xml`
//! descriptor. This library reads the descriptor, works out where every
//! tile of the highest-resolution tier lives, downloads them concurrently
//! and stitches them back into a single JPEG.
//!
//! ## Features
//!
//! - **Pyramid geometry**: Tier sizes, cumulative tile counts and `TileGroup` placement
//! - **Bounded concurrency**: Tiles are fetched by at most N tasks at once
//! - **All-or-nothing**: Any failure aborts the run and leaves no partial image behind
//! - **Scratch hygiene**: Downloaded tiles live in a temporary directory that is always removed
//!
//! ## Architecture
//!
//! - [`io`] - HTTP client abstraction and reqwest implementation
//! - [`metadata`] - `ImageProperties.xml` fetching and parsing
//! - [`pyramid`] - Tier geometry and tile identifiers
//! - [`tile`] - Concurrent tile download and compositing
//! - [`reconstruct`] - End-to-end pipeline
//! - [`config`] - CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zoomify_stitch::{ReconstructOptions, Reconstructor, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ReqwestHttpClient::new()?;
//!     let reconstructor = Reconstructor::with_options(client, ReconstructOptions::default());
//!
//!     let report = reconstructor
//!         .run("http://example.com/zoomify/map/", Path::new("/tmp/out"), "map")
//!         .await?;
//!
//!     println!("{}x{} written to {}", report.width, report.height, report.output.display());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod metadata;
pub mod pyramid;
pub mod reconstruct;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, ReportFormat, VerticalStepArg};
pub use error::{CleanupError, CompositeError, FetchError, MetadataError, ReconstructError};
pub use io::{HttpClient, ReqwestHttpClient, DEFAULT_TIMEOUT_SECS};
pub use metadata::{
    fetch_metadata, image_properties_url, parse_image_properties, PyramidMetadata,
    DEFAULT_TILE_SIZE, IMAGE_PROPERTIES_FILE,
};
pub use pyramid::{
    compute_cumulative_tile_counts, compute_tier_sizes, compute_tile_identifiers,
    PyramidGeometry, TierSize, TileIdentifier,
};
pub use reconstruct::{
    create_scratch_dir, output_path, remove_scratch_dir, ReconstructOptions, Reconstructor,
    RunReport, SCRATCH_PREFIX,
};
pub use tile::{
    TileCompositor, TileFetcher, VerticalStep, DEFAULT_FETCH_CONCURRENCY, DEFAULT_JPEG_QUALITY,
};
