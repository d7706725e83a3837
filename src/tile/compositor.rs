//! Tile compositor.
//!
//! This module decodes the downloaded tiles of one tier and pastes them into
//! a single canvas, then encodes the canvas as the output JPEG.
//!
//! # Design Decisions
//!
//! - **Natural tile dimensions**: Tiles on the right and bottom edges are
//!   smaller than `tile_size`. Each tile is pasted at its decoded size and
//!   clipped to the canvas, never resized.
//!
//! - **Explicit vertical step**: Rows are placed `vertical_step` pixels
//!   apart. By default this is Zoomify's base tile size (256) regardless of
//!   the descriptor's `TILESIZE`; [`VerticalStep::TileSize`] uses the
//!   descriptor value instead. The two only differ for non-256 tile sets.
//!
//! - **Single-threaded**: The canvas is mutated from one thread only.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ImageReader, RgbImage};
use tracing::{debug, info, warn};

use crate::error::CompositeError;
use crate::metadata::DEFAULT_TILE_SIZE;
use crate::pyramid::{tile_file_name, TierSize};

/// Default JPEG quality of the output image (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Vertical Step
// =============================================================================

/// Pixel distance between tile rows on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalStep {
    /// A fixed number of pixels, independent of the tile size
    Fixed(u32),

    /// The descriptor's tile size, same as the horizontal step
    TileSize,
}

impl VerticalStep {
    /// Resolve the step in pixels for a given tile size.
    pub fn pixels(&self, tile_size: u32) -> u32 {
        match self {
            VerticalStep::Fixed(step) => *step,
            VerticalStep::TileSize => tile_size,
        }
    }
}

impl Default for VerticalStep {
    fn default() -> Self {
        VerticalStep::Fixed(DEFAULT_TILE_SIZE)
    }
}

// =============================================================================
// Compositor
// =============================================================================

/// Stitches the tiles of one tier into a single JPEG.
///
/// # Example
///
/// ```ignore
/// use zoomify_stitch::tile::{TileCompositor, VerticalStep};
///
/// let compositor = TileCompositor::new().with_quality(85);
/// let output = compositor.composite(
///     scratch.path(),
///     geometry.tiers(),
///     geometry.max_tier(),
///     geometry.width(),
///     geometry.height(),
///     geometry.tile_size(),
///     &target_dir.join("image.jpg"),
/// )?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TileCompositor {
    quality: u8,
    vertical_step: VerticalStep,
}

impl Default for TileCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl TileCompositor {
    /// Create a compositor with the default quality and vertical step.
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            vertical_step: VerticalStep::default(),
        }
    }

    /// Set the output JPEG quality, clamped to 1-100.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = clamp_quality(quality);
        self
    }

    pub fn with_vertical_step(mut self, vertical_step: VerticalStep) -> Self {
        self.vertical_step = vertical_step;
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn vertical_step(&self) -> VerticalStep {
        self.vertical_step
    }

    /// Paste every tile of `tier` into a `width` x `height` canvas and write
    /// it to `output` as JPEG.
    ///
    /// Tiles are read from `tile_dir/{tier}-{x}-{y}.jpg`.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::Decode`] if a tile is missing or not a decodable image
    /// - [`CompositeError::Encode`] if the output cannot be written; any
    ///   partially written file is removed
    ///
    /// # Panics
    ///
    /// Panics if `tier` is out of range for `tiers`.
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &self,
        tile_dir: &Path,
        tiers: &[TierSize],
        tier: usize,
        width: u32,
        height: u32,
        tile_size: u32,
        output: &Path,
    ) -> Result<PathBuf, CompositeError> {
        let canvas = self.assemble(tile_dir, tiers[tier], tier, width, height, tile_size)?;
        self.encode(&canvas, output)?;

        info!(
            path = %output.display(),
            width = width,
            height = height,
            "Output image written"
        );

        Ok(output.to_path_buf())
    }

    /// Decode and paste every tile of a tier into a fresh canvas.
    pub fn assemble(
        &self,
        tile_dir: &Path,
        size: TierSize,
        tier: usize,
        width: u32,
        height: u32,
        tile_size: u32,
    ) -> Result<RgbImage, CompositeError> {
        let mut canvas = RgbImage::new(width, height);
        let row_step = self.vertical_step.pixels(tile_size);

        for x in 0..size.tiles_x {
            for y in 0..size.tiles_y {
                let path = tile_dir.join(tile_file_name(tier, x, y));
                let tile = decode_tile(&path)?;

                let offset_x = i64::from(x) * i64::from(tile_size);
                let offset_y = i64::from(y) * i64::from(row_step);
                debug!(
                    tile = %path.display(),
                    x = offset_x,
                    y = offset_y,
                    tile_width = tile.width(),
                    tile_height = tile.height(),
                    "Pasting tile"
                );

                // Clips anything falling outside the canvas
                image::imageops::replace(&mut canvas, &tile, offset_x, offset_y);
            }
        }

        Ok(canvas)
    }

    /// Encode the canvas as JPEG at `output`.
    fn encode(&self, canvas: &RgbImage, output: &Path) -> Result<(), CompositeError> {
        let encode_error = |message: String| CompositeError::Encode {
            path: output.to_path_buf(),
            message,
        };

        let file = File::create(output).map_err(|e| encode_error(e.to_string()))?;
        let mut writer = BufWriter::new(file);

        let encoded = {
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, self.quality);
            encoder.encode_image(canvas)
        };
        let result = encoded
            .map_err(|e| encode_error(e.to_string()))
            .and_then(|()| writer.flush().map_err(|e| encode_error(e.to_string())));
        drop(writer);

        if result.is_err() {
            if let Err(e) = std::fs::remove_file(output) {
                warn!(path = %output.display(), error = %e, "Failed to remove partial output");
            }
        }

        result
    }
}

/// Decode a tile file at its natural dimensions.
fn decode_tile(path: &Path) -> Result<RgbImage, CompositeError> {
    let decode_error = |message: String| CompositeError::Decode {
        path: path.to_path_buf(),
        message,
    };

    let img = ImageReader::open(path)
        .map_err(|e| decode_error(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .decode()
        .map_err(|e| decode_error(e.to_string()))?;

    Ok(img.to_rgb8())
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
