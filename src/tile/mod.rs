//! Tile download and compositing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Reconstructor              │
//! └──────────┬─────────────────┬────────────┘
//!            │                 │
//!            ▼                 ▼
//! ┌──────────────────┐  ┌──────────────────┐
//! │   TileFetcher    │  │  TileCompositor  │
//! │  (N concurrent   │  │  (decode →       │
//! │   GETs → files)  │  │   paste → JPEG)  │
//! └────────┬─────────┘  └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │    HttpClient    │
//! └──────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileFetcher`]: Downloads tile bytes into a scratch directory with bounded concurrency
//! - [`TileCompositor`]: Pastes decoded tiles into a full-size canvas and encodes it
//! - [`VerticalStep`]: Row spacing used when pasting

mod compositor;
mod fetcher;

pub use compositor::{
    clamp_quality, is_valid_quality, TileCompositor, VerticalStep, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use fetcher::{FetchSummary, TileFetcher, DEFAULT_FETCH_CONCURRENCY, MAX_FETCH_CONCURRENCY};
