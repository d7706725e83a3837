//! Zoomify `ImageProperties.xml` descriptor.
//!
//! Every Zoomify tile set publishes a single-element XML descriptor next to
//! its `TileGroup` directories:
//!
//! ```xml
//! <IMAGE_PROPERTIES WIDTH="46920" HEIGHT="33600" NUMTILES="32421"
//!                   NUMIMAGES="1" VERSION="1.8" TILESIZE="256" />
//! ```
//!
//! Only `WIDTH`, `HEIGHT` and `TILESIZE` are required. `NUMTILES`,
//! `NUMIMAGES` and `VERSION` are kept when present; anything else is ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, info};

use crate::error::MetadataError;
use crate::io::HttpClient;

/// File name of the descriptor relative to the pyramid base URL.
pub const IMAGE_PROPERTIES_FILE: &str = "ImageProperties.xml";

/// Zoomify's standard tile size.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Pyramid description read from `ImageProperties.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidMetadata {
    /// Full-resolution width in pixels
    pub width: u32,

    /// Full-resolution height in pixels
    pub height: u32,

    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Total tile count across all tiers, as reported by the server
    pub num_tiles: Option<u64>,

    /// Number of images in the set (always 1 in practice)
    pub num_images: Option<u32>,

    /// Descriptor format version
    pub version: Option<String>,
}

impl PyramidMetadata {
    /// Metadata for an image using the standard 256px tiles.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_tile_size(width, height, DEFAULT_TILE_SIZE)
    }

    pub fn with_tile_size(width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            width,
            height,
            tile_size,
            num_tiles: None,
            num_images: None,
            version: None,
        }
    }
}

/// URL of the descriptor for a pyramid base URL.
pub fn image_properties_url(base_url: &str) -> String {
    format!("{}{}", base_url, IMAGE_PROPERTIES_FILE)
}

/// Fetch and parse the descriptor of the pyramid at `base_url`.
///
/// # Errors
///
/// - [`MetadataError::Unavailable`] if the request fails
/// - [`MetadataError::Malformed`] if the body is not a usable descriptor
pub async fn fetch_metadata<C>(client: &C, base_url: &str) -> Result<PyramidMetadata, MetadataError>
where
    C: HttpClient + ?Sized,
{
    let url = image_properties_url(base_url);
    debug!(url = %url, "Fetching image properties");

    let body = client
        .get(&url)
        .await
        .map_err(|source| MetadataError::Unavailable {
            url: url.clone(),
            source,
        })?;

    let xml = std::str::from_utf8(&body).map_err(|e| MetadataError::Malformed {
        url: url.clone(),
        reason: format!("descriptor is not valid UTF-8: {}", e),
    })?;

    let metadata = parse_image_properties(xml).map_err(|reason| MetadataError::Malformed {
        url: url.clone(),
        reason,
    })?;

    info!(
        width = metadata.width,
        height = metadata.height,
        tile_size = metadata.tile_size,
        "Image properties loaded"
    );

    Ok(metadata)
}

/// Parse the body of an `ImageProperties.xml` descriptor.
///
/// The attributes are read from the first element in the document. Returns a
/// human-readable reason on failure.
pub fn parse_image_properties(xml: &str) -> Result<PyramidMetadata, String> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                return metadata_from_element(&element);
            }
            Ok(Event::Eof) => return Err("document contains no element".to_string()),
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "invalid XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }
}

fn metadata_from_element(element: &BytesStart<'_>) -> Result<PyramidMetadata, String> {
    let mut width = None;
    let mut height = None;
    let mut tile_size = None;
    let mut num_tiles = None;
    let mut num_images = None;
    let mut version = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| format!("invalid attribute: {}", e))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|_| "attribute value is not valid UTF-8".to_string())?
            .trim();

        match attr.key.as_ref() {
            b"WIDTH" => width = Some(value.to_string()),
            b"HEIGHT" => height = Some(value.to_string()),
            b"TILESIZE" => tile_size = Some(value.to_string()),
            b"NUMTILES" => num_tiles = value.parse::<u64>().ok(),
            b"NUMIMAGES" => num_images = value.parse::<u32>().ok(),
            b"VERSION" => version = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(PyramidMetadata {
        width: positive_attribute("WIDTH", width)?,
        height: positive_attribute("HEIGHT", height)?,
        tile_size: positive_attribute("TILESIZE", tile_size)?,
        num_tiles,
        num_images,
        version,
    })
}

fn positive_attribute(name: &str, value: Option<String>) -> Result<u32, String> {
    let value = value.ok_or_else(|| format!("missing {} attribute", name))?;
    match value.parse::<u32>() {
        Ok(0) => Err(format!("{} must be positive", name)),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("{} is not a valid integer: {:?}", name, value)),
    }
}
