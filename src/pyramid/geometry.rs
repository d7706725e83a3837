//! Zoomify tier geometry.
//!
//! Zoomify numbers its tiers from the coarsest overview to full resolution:
//! - Tier 0 = a single 1x1 tile covering the whole image
//! - Last tier = full resolution, `ceil(width / tile_size)` x `ceil(height / tile_size)` tiles
//!
//! Each coarser tier covers the image with tiles twice as large (in image
//! pixels) as the next finer tier. Tiles of all tiers share a single flat
//! numbering, which is what the server uses to bucket tiles into
//! `TileGroupN` directories.

use crate::error::ReconstructError;

use super::tiles::{compute_tile_identifiers, TileIdentifier};

// =============================================================================
// TierSize
// =============================================================================

/// Number of tiles spanning the image at one resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TierSize {
    /// Tiles across the image horizontally
    pub tiles_x: u32,

    /// Tiles across the image vertically
    pub tiles_y: u32,
}

impl TierSize {
    pub const fn new(tiles_x: u32, tiles_y: u32) -> Self {
        Self { tiles_x, tiles_y }
    }

    /// Total number of tiles in this tier.
    #[inline]
    pub fn tile_count(&self) -> u64 {
        u64::from(self.tiles_x) * u64::from(self.tiles_y)
    }
}

impl From<(u32, u32)> for TierSize {
    fn from((tiles_x, tiles_y): (u32, u32)) -> Self {
        Self::new(tiles_x, tiles_y)
    }
}

// =============================================================================
// Tier Computations
// =============================================================================

/// Compute the tile grid of every tier, coarsest first.
///
/// Starting at `tile_size`, the effective tile size doubles until a single
/// tile covers the image. Each step records
/// `ceil(width / effective) x ceil(height / effective)`; the terminal 1x1
/// overview tier is appended and the list is reversed so index 0 is the
/// coarsest tier.
///
/// If both dimensions fit in one tile the result is just `[(1, 1)]`.
///
/// Inputs must be positive; callers validate that before getting here.
pub fn compute_tier_sizes(width: u32, height: u32, tile_size: u32) -> Vec<TierSize> {
    let width = u64::from(width);
    let height = u64::from(height);
    let mut effective = u64::from(tile_size);

    let mut tiers = Vec::new();
    while width > effective || height > effective {
        tiers.push(TierSize::new(
            width.div_ceil(effective) as u32,
            height.div_ceil(effective) as u32,
        ));
        effective *= 2;
    }
    tiers.push(TierSize::new(1, 1));
    tiers.reverse();

    tiers
}

/// Compute the number of tiles in all tiers coarser than each tier.
///
/// Entry 0 is always 0; entry `i` is entry `i - 1` plus the tile count of
/// tier `i - 1`.
pub fn compute_cumulative_tile_counts(tiers: &[TierSize]) -> Vec<u64> {
    let mut counts = Vec::with_capacity(tiers.len());
    let mut total = 0u64;

    for tier in tiers {
        counts.push(total);
        total += tier.tile_count();
    }

    counts
}

// =============================================================================
// PyramidGeometry
// =============================================================================

/// Derived geometry of a Zoomify pyramid.
///
/// Bundles the tier list and cumulative tile counts computed from the image
/// dimensions. Pure data: recomputed each run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidGeometry {
    width: u32,
    height: u32,
    tile_size: u32,
    tiers: Vec<TierSize>,
    cumulative: Vec<u64>,
}

impl PyramidGeometry {
    /// Compute the geometry for an image of the given size.
    ///
    /// Returns an error if any input is zero.
    pub fn new(width: u32, height: u32, tile_size: u32) -> Result<Self, ReconstructError> {
        if width == 0 || height == 0 || tile_size == 0 {
            return Err(ReconstructError::InvalidGeometry {
                reason: format!(
                    "width, height and tile size must be positive (got {}x{} @ {})",
                    width, height, tile_size
                ),
            });
        }

        let tiers = compute_tier_sizes(width, height, tile_size);
        let cumulative = compute_cumulative_tile_counts(&tiers);

        Ok(Self {
            width,
            height,
            tile_size,
            tiers,
            cumulative,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// All tiers, coarsest first.
    pub fn tiers(&self) -> &[TierSize] {
        &self.tiers
    }

    /// Cumulative tile counts, parallel to [`tiers`](Self::tiers).
    pub fn cumulative_tile_counts(&self) -> &[u64] {
        &self.cumulative
    }

    /// Number of tiers (always at least 1).
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Index of the full-resolution tier.
    pub fn max_tier(&self) -> usize {
        self.tiers.len() - 1
    }

    /// Tile grid of a tier, if it exists.
    pub fn tier(&self, tier: usize) -> Option<TierSize> {
        self.tiers.get(tier).copied()
    }

    /// Total number of tiles across all tiers.
    ///
    /// This is what Zoomify descriptors report as `NUMTILES`.
    pub fn total_tiles(&self) -> u64 {
        let last = self.max_tier();
        self.cumulative[last] + self.tiers[last].tile_count()
    }

    /// Tile identifiers for one tier, in x-major order.
    ///
    /// Returns `None` if the tier does not exist.
    pub fn tile_identifiers(&self, tier: usize, base_url: &str) -> Option<Vec<TileIdentifier>> {
        if tier >= self.tiers.len() {
            return None;
        }
        Some(compute_tile_identifiers(
            &self.tiers,
            &self.cumulative,
            tier,
            base_url,
            self.tile_size,
        ))
    }
}
