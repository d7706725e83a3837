//! Zoomify pyramid geometry.
//!
//! Pure computations that turn an image size and tile size into the tier
//! layout of a Zoomify pyramid and the URLs of its tiles.
//!
//! # Layout
//!
//! ```text
//!   tier 0        tier 1           tier 2 (full resolution)
//!  ┌─────┐      ┌──┬──┐          ┌──┬──┬──┬──┐
//!  │     │      │  │  │          │  │  │  │  │
//!  │ 1x1 │      ├──┼──┤          ├──┼──┼──┼──┤
//!  │     │      │  │  │          │  │  │  │  │  ...
//!  └─────┘      └──┴──┘          └──┴──┴──┴──┘
//! ```
//!
//! # Example
//!
//! ```
//! use zoomify_stitch::pyramid::PyramidGeometry;
//!
//! let geometry = PyramidGeometry::new(1000, 800, 256).unwrap();
//! assert_eq!(geometry.tier_count(), 3);
//!
//! let tiles = geometry
//!     .tile_identifiers(geometry.max_tier(), "http://example.com/image/")
//!     .unwrap();
//! assert_eq!(tiles.len(), 16);
//! assert_eq!(tiles[0].url, "http://example.com/image/TileGroup0/2-0-0.jpg");
//! ```

mod geometry;
mod tiles;

pub use geometry::{
    compute_cumulative_tile_counts, compute_tier_sizes, PyramidGeometry, TierSize,
};
pub use tiles::{
    compute_tile_identifiers, flat_tile_index, tile_file_name, tile_group, tile_url,
    TileIdentifier,
};
