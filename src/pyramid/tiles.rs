//! Tile identifiers and the Zoomify `TileGroup` bucketing scheme.
//!
//! Every tile of every tier gets a flat index:
//!
//! ```text
//! flat_index = x + y * tier_width + tiles_in_coarser_tiers
//! ```
//!
//! Zoomify servers store tiles in directories of `tile_size` consecutive flat
//! indices, so the tile group is `flat_index / tile_size` and the tile URL is
//! `{base}TileGroup{group}/{tier}-{x}-{y}.jpg`. This must match the server
//! exactly or every request 404s.

use std::fmt;

use super::geometry::TierSize;

/// A single tile of the pyramid and where to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileIdentifier {
    /// Tier index (0 = coarsest)
    pub tier: usize,

    /// Column within the tier
    pub x: u32,

    /// Row within the tier
    pub y: u32,

    /// `TileGroup` directory the tile lives in
    pub group: u64,

    /// Absolute tile URL
    pub url: String,
}

impl TileIdentifier {
    /// Local file name for the tile, `"{tier}-{x}-{y}.jpg"`.
    pub fn file_name(&self) -> String {
        tile_file_name(self.tier, self.x, self.y)
    }
}

impl fmt::Display for TileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.tier, self.x, self.y)
    }
}

/// File name Zoomify uses for a tile, `"{tier}-{x}-{y}.jpg"`.
pub fn tile_file_name(tier: usize, x: u32, y: u32) -> String {
    format!("{}-{}-{}.jpg", tier, x, y)
}

/// Flat index of a tile across all tiers.
#[inline]
pub fn flat_tile_index(x: u32, y: u32, tier_width: u32, tiles_before_tier: u64) -> u64 {
    u64::from(x) + u64::from(y) * u64::from(tier_width) + tiles_before_tier
}

/// `TileGroup` bucket of a flat tile index.
#[inline]
pub fn tile_group(flat_index: u64, tile_size: u32) -> u64 {
    flat_index / u64::from(tile_size)
}

/// Build the URL of a tile relative to the pyramid base URL.
///
/// `base_url` is used as-is and must end with a separator.
pub fn tile_url(base_url: &str, group: u64, tier: usize, x: u32, y: u32) -> String {
    format!(
        "{}TileGroup{}/{}",
        base_url,
        group,
        tile_file_name(tier, x, y)
    )
}

/// Compute the identifiers of every tile in a tier.
///
/// Iterates columns in the outer loop and rows in the inner loop, producing
/// exactly `tiles_x * tiles_y` identifiers in a reproducible order.
///
/// # Panics
///
/// Panics if `tier` is out of range for `tiers` or `cumulative`.
pub fn compute_tile_identifiers(
    tiers: &[TierSize],
    cumulative: &[u64],
    tier: usize,
    base_url: &str,
    tile_size: u32,
) -> Vec<TileIdentifier> {
    let size = tiers[tier];
    let tiles_before = cumulative[tier];

    let mut identifiers = Vec::with_capacity(size.tile_count() as usize);
    for x in 0..size.tiles_x {
        for y in 0..size.tiles_y {
            let index = flat_tile_index(x, y, size.tiles_x, tiles_before);
            let group = tile_group(index, tile_size);
            identifiers.push(TileIdentifier {
                tier,
                x,
                y,
                group,
                url: tile_url(base_url, group, tier, x, y),
            });
        }
    }

    identifiers
}
