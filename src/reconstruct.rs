//! Reconstruction pipeline.
//!
//! The [`Reconstructor`] is the main entry point. A run:
//!
//! 1. Fetches `ImageProperties.xml`
//! 2. Computes the pyramid geometry
//! 3. Lists the tiles of the full-resolution tier
//! 4. Downloads them into a fresh scratch directory under the target directory
//! 5. Stitches them into `{target_dir}/{output_name}.jpg`
//! 6. Removes the scratch directory, whatever happened in 4 and 5
//!
//! Either a complete, correctly sized image is produced or none is.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{CleanupError, ReconstructError};
use crate::io::HttpClient;
use crate::metadata::{fetch_metadata, PyramidMetadata};
use crate::pyramid::{PyramidGeometry, TileIdentifier};
use crate::tile::{
    FetchSummary, TileCompositor, TileFetcher, VerticalStep, DEFAULT_FETCH_CONCURRENCY,
    DEFAULT_JPEG_QUALITY,
};

/// Prefix of scratch directories created under the target directory.
pub const SCRATCH_PREFIX: &str = "tmp_";

/// Extension of the output image.
pub const OUTPUT_EXTENSION: &str = "jpg";

// =============================================================================
// Options and Report
// =============================================================================

/// Tunables for a reconstruction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconstructOptions {
    /// Maximum number of tiles fetched at once
    pub concurrency: usize,

    /// JPEG quality of the output image
    pub jpeg_quality: u8,

    /// Row spacing used when pasting tiles
    pub vertical_step: VerticalStep,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_FETCH_CONCURRENCY,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            vertical_step: VerticalStep::default(),
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Path of the written image
    pub output: PathBuf,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Tile size reported by the descriptor
    pub tile_size: u32,

    /// Number of tiers in the pyramid
    pub tier_count: usize,

    /// Tier that was reconstructed
    pub tier: usize,

    /// Number of tiles fetched
    pub tiles: usize,

    /// Bytes downloaded for tiles
    pub bytes_downloaded: u64,

    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
}

// =============================================================================
// Reconstructor
// =============================================================================

/// Rebuilds the full-resolution image of a remote Zoomify pyramid.
///
/// # Example
///
/// ```ignore
/// use zoomify_stitch::{Reconstructor, ReqwestHttpClient};
///
/// let client = ReqwestHttpClient::new()?;
/// let reconstructor = Reconstructor::new(client);
///
/// let report = reconstructor
///     .run("http://example.com/zoomify/map/", Path::new("/tmp/out"), "map")
///     .await?;
///
/// println!("Wrote {}", report.output.display());
/// ```
pub struct Reconstructor<C: HttpClient + 'static> {
    client: Arc<C>,
    options: ReconstructOptions,
}

impl<C: HttpClient + 'static> Reconstructor<C> {
    /// Create a reconstructor with default options.
    pub fn new(client: C) -> Self {
        Self::with_options(client, ReconstructOptions::default())
    }

    pub fn with_options(client: C, options: ReconstructOptions) -> Self {
        Self::with_shared_client(Arc::new(client), options)
    }

    /// Create a reconstructor sharing an existing client.
    pub fn with_shared_client(client: Arc<C>, options: ReconstructOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    /// Reconstruct the pyramid at `base_url` into
    /// `{target_dir}/{output_name}.jpg`.
    ///
    /// `base_url` must end with a separator; `target_dir` must exist.
    ///
    /// # Errors
    ///
    /// Any metadata, fetch or composite failure aborts the run. The scratch
    /// directory is removed on every path; failing to remove it is only
    /// logged.
    pub async fn run(
        &self,
        base_url: &str,
        target_dir: &Path,
        output_name: &str,
    ) -> Result<RunReport, ReconstructError> {
        let started = Instant::now();
        info!(base_url = base_url, "Reconstructing Zoomify pyramid");

        let metadata = fetch_metadata(self.client.as_ref(), base_url).await?;
        let geometry = build_geometry(&metadata)?;

        let tier = geometry.max_tier();
        let identifiers = geometry
            .tile_identifiers(tier, base_url)
            .ok_or_else(|| ReconstructError::InvalidGeometry {
                reason: format!("tier {} does not exist", tier),
            })?;

        info!(
            tiers = geometry.tier_count(),
            tier = tier,
            tiles = identifiers.len(),
            "Pyramid geometry computed"
        );

        let output = output_path(target_dir, output_name);
        let scratch = create_scratch_dir(target_dir)?;
        debug!(path = %scratch.path().display(), "Scratch directory created");

        let result = self
            .fetch_and_composite(&geometry, tier, &identifiers, scratch.path(), &output)
            .await;

        let fetched = finish_with_cleanup(result, scratch)?;

        Ok(RunReport {
            output,
            width: geometry.width(),
            height: geometry.height(),
            tile_size: geometry.tile_size(),
            tier_count: geometry.tier_count(),
            tier,
            tiles: fetched.paths.len(),
            bytes_downloaded: fetched.bytes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn fetch_and_composite(
        &self,
        geometry: &PyramidGeometry,
        tier: usize,
        identifiers: &[TileIdentifier],
        scratch: &Path,
        output: &Path,
    ) -> Result<FetchSummary, ReconstructError> {
        let fetcher = TileFetcher::with_concurrency(Arc::clone(&self.client), self.options.concurrency);
        let fetched = fetcher.fetch_tiles(identifiers, scratch).await?;

        let compositor = TileCompositor::new()
            .with_quality(self.options.jpeg_quality)
            .with_vertical_step(self.options.vertical_step);

        let geometry = geometry.clone();
        let scratch = scratch.to_path_buf();
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || {
            compositor.composite(
                &scratch,
                geometry.tiers(),
                tier,
                geometry.width(),
                geometry.height(),
                geometry.tile_size(),
                &output,
            )
        })
        .await
        .map_err(|e| ReconstructError::Task(e.to_string()))??;

        Ok(fetched)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Compute the geometry described by the metadata, cross-checking the
/// server's tile count when it reports one.
fn build_geometry(metadata: &PyramidMetadata) -> Result<PyramidGeometry, ReconstructError> {
    let geometry = PyramidGeometry::new(metadata.width, metadata.height, metadata.tile_size)?;

    if let Some(reported) = metadata.num_tiles {
        let computed = geometry.total_tiles();
        if reported != computed {
            warn!(
                reported = reported,
                computed = computed,
                "NUMTILES does not match computed pyramid; tile URLs may be wrong"
            );
        }
    }

    Ok(geometry)
}

/// Path of the output image, `{target_dir}/{output_name}.jpg`.
pub fn output_path(target_dir: &Path, output_name: &str) -> PathBuf {
    target_dir.join(format!("{}.{}", output_name, OUTPUT_EXTENSION))
}

/// Create a uniquely named scratch directory under `target_dir`.
pub fn create_scratch_dir(target_dir: &Path) -> Result<TempDir, ReconstructError> {
    tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(target_dir)
        .map_err(|e| ReconstructError::Scratch {
            path: target_dir.to_path_buf(),
            message: e.to_string(),
        })
}

/// Remove the scratch directory and hand back the run's result unchanged.
///
/// A cleanup failure is logged and never replaces `result`.
fn finish_with_cleanup<T>(
    result: Result<T, ReconstructError>,
    scratch: TempDir,
) -> Result<T, ReconstructError> {
    if let Err(e) = remove_scratch_dir(scratch) {
        warn!(error = %e, "Scratch directory left behind");
    }
    result
}

/// Remove a scratch directory and everything in it.
pub fn remove_scratch_dir(scratch: TempDir) -> Result<(), CleanupError> {
    let path = scratch.path().to_path_buf();
    scratch.close().map_err(|e| CleanupError {
        path,
        message: e.to_string(),
    })
}
