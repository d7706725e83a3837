use std::path::PathBuf;

use thiserror::Error;

/// Transport errors that can occur when fetching a remote resource
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Server answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// Response body was empty
    #[error("Empty response body from {url}")]
    EmptyBody { url: String },

    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),
}

/// Errors related to the `ImageProperties.xml` descriptor
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// Descriptor could not be retrieved
    #[error("Image properties unavailable at {url}: {source}")]
    Unavailable {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Descriptor was retrieved but is not usable
    #[error("Malformed image properties at {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Errors that can occur while stitching tiles into the output image
#[derive(Debug, Clone, Error)]
pub enum CompositeError {
    /// A tile file could not be opened or decoded
    #[error("Failed to decode tile {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    /// The canvas could not be written to the output file
    #[error("Failed to encode output {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },
}

/// Top-level errors for a reconstruction run
#[derive(Debug, Clone, Error)]
pub enum ReconstructError {
    /// Descriptor fetch or parse failure
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A tile request failed
    #[error("Failed to fetch tile {url}: {source}")]
    TileFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A fetched tile could not be written to the scratch directory
    #[error("Failed to write tile {}: {message}", .path.display())]
    TileWrite { path: PathBuf, message: String },

    /// Decode or encode failure while compositing
    #[error(transparent)]
    Composite(#[from] CompositeError),

    /// The scratch directory could not be created
    #[error("Failed to create scratch directory in {}: {message}", .path.display())]
    Scratch { path: PathBuf, message: String },

    /// The descriptor describes a pyramid that cannot be reconstructed
    #[error("Invalid pyramid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// A background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Failure to remove the scratch directory.
///
/// Never fatal: the run logs it as a warning and keeps its result.
#[derive(Debug, Clone, Error)]
#[error("Failed to remove scratch directory {}: {message}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    pub message: String,
}
