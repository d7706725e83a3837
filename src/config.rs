//! Command-line configuration for zoomify-stitch.
//!
//! Three positional arguments select what to reconstruct and where; every
//! tunable can also be set through an environment variable with the
//! `ZOOMIFY_` prefix:
//!
//! - `ZOOMIFY_CONCURRENCY` - Tiles fetched at once (default: 8)
//! - `ZOOMIFY_TIMEOUT` - Per-request timeout in seconds (default: 30)
//! - `ZOOMIFY_JPEG_QUALITY` - Output JPEG quality (default: 90)
//! - `ZOOMIFY_VERTICAL_STEP` - Row spacing, `fixed` or `tile-size` (default: fixed)
//!
//! # Example
//!
//! ```text
//! zoomify-stitch http://example.com/zoomify/map/ ./out map --concurrency 16
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use url::Url;

use crate::io::DEFAULT_TIMEOUT_SECS;
use crate::reconstruct::ReconstructOptions;
use crate::tile::{
    is_valid_quality, VerticalStep, DEFAULT_FETCH_CONCURRENCY, DEFAULT_JPEG_QUALITY,
    MAX_FETCH_CONCURRENCY,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Rebuild the full-resolution image of a Zoomify tile pyramid.
///
/// Downloads every tile of the highest-resolution tier and stitches them
/// into `TARGET_DIR/OUTPUT_NAME.jpg`.
#[derive(Parser, Debug, Clone)]
#[command(name = "zoomify-stitch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// URL of the Zoomify directory (the one containing ImageProperties.xml).
    #[arg(value_name = "BASE_URL")]
    pub base_url: String,

    /// Working and target directory; must already exist.
    #[arg(value_name = "TARGET_DIR")]
    pub target_dir: PathBuf,

    /// Name of the output image, without extension.
    #[arg(value_name = "OUTPUT_NAME")]
    pub output_name: String,

    /// Maximum number of tiles fetched at once.
    #[arg(long, default_value_t = DEFAULT_FETCH_CONCURRENCY, env = "ZOOMIFY_CONCURRENCY")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "ZOOMIFY_TIMEOUT")]
    pub timeout: u64,

    /// JPEG quality of the output image (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "ZOOMIFY_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Pixel spacing between tile rows.
    ///
    /// `fixed` always steps 256px (Zoomify's base tile size); `tile-size`
    /// steps by the TILESIZE the descriptor reports.
    #[arg(long, value_enum, default_value_t = VerticalStepArg::Fixed, env = "ZOOMIFY_VERTICAL_STEP")]
    pub vertical_step: VerticalStepArg,

    /// Format of the summary printed on success.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Row spacing choices exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerticalStepArg {
    /// Always 256 pixels
    Fixed,
    /// The descriptor's TILESIZE
    TileSize,
}

impl From<VerticalStepArg> for VerticalStep {
    fn from(arg: VerticalStepArg) -> Self {
        match arg {
            VerticalStepArg::Fixed => VerticalStep::default(),
            VerticalStepArg::TileSize => VerticalStep::TileSize,
        }
    }
}

/// Output format of the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable line
    Text,
    /// JSON object
    Json,
}

impl Cli {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| format!("Invalid base URL '{}': {}", self.base_url, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!(
                "Base URL must use http or https, got '{}'",
                url.scheme()
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(format!(
                "Base URL '{}' must not carry a query string or fragment",
                self.base_url
            ));
        }

        if !self.target_dir.is_dir() {
            return Err(format!(
                "Target directory '{}' does not exist or is not a directory",
                self.target_dir.display()
            ));
        }

        let name = self.output_name.as_str();
        if name.is_empty() || name == "." || name == ".." {
            return Err("Output name must not be empty".to_string());
        }
        if name.contains('/') || name.contains('\\') {
            return Err(format!(
                "Output name '{}' must not contain path separators",
                name
            ));
        }

        if self.concurrency == 0 || self.concurrency > MAX_FETCH_CONCURRENCY {
            return Err(format!(
                "concurrency must be between 1 and {}",
                MAX_FETCH_CONCURRENCY
            ));
        }

        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        Ok(())
    }

    /// Base URL with a guaranteed trailing `/`, ready for appending
    /// `ImageProperties.xml` and `TileGroupN/...`.
    pub fn normalized_base_url(&self) -> String {
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        base
    }

    /// Options for the reconstruction pipeline.
    pub fn options(&self) -> ReconstructOptions {
        ReconstructOptions {
            concurrency: self.concurrency,
            jpeg_quality: self.jpeg_quality,
            vertical_step: self.vertical_step.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
