//! Source image loading
//!
//! Decodes a file into a [`PixelBuffer`] at the image's natural size. A
//! missing or broken source is replaced by the configured fallback asset.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::display::pixel_buffer::GeometryMismatch;
use crate::display::PixelBuffer;

/// Source value meaning "no image given"
pub const NO_SOURCE: &str = "none";

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Image {0} does not exist")]
    Missing(PathBuf),

    #[error("Failed to read image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image {path} has zero dimensions ({width}x{height})")]
    EmptyImage {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("Decoded image has inconsistent geometry: {0}")]
    Geometry(#[from] GeometryMismatch),
}

/// Decode the image at `path` into RGBA8
pub fn load(path: &Path) -> Result<PixelBuffer, ImageLoadError> {
    if !path.exists() {
        return Err(ImageLoadError::Missing(path.to_path_buf()));
    }

    let decoded = image::open(path).map_err(|source| ImageLoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageLoadError::EmptyImage {
            path: path.to_path_buf(),
            width,
            height,
        });
    }

    let buffer = PixelBuffer::from_rgba(width, height, rgba.into_raw())?;
    tracing::info!(path = %path.display(), width, height, "Image loaded");
    Ok(buffer)
}

/// Resolve a user-supplied source: `None`, an empty string and `"none"` all
/// mean no image.
pub fn resolve(source: Option<&str>) -> Option<PathBuf> {
    source
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case(NO_SOURCE))
        .map(|s| PathBuf::from(s.strip_prefix("file://").unwrap_or(s)))
}

/// Load `source`, falling back to `fallback` if it is missing or fails to
/// decode. Only the fallback's error is returned. A geometry mismatch is not
/// a bad file but a broken invariant, so it is passed straight up.
pub fn load_with_fallback(
    source: Option<&Path>,
    fallback: &Path,
) -> Result<PixelBuffer, ImageLoadError> {
    load_or_fallback_with(source, fallback, load)
}

fn load_or_fallback_with(
    source: Option<&Path>,
    fallback: &Path,
    load: impl Fn(&Path) -> Result<PixelBuffer, ImageLoadError>,
) -> Result<PixelBuffer, ImageLoadError> {
    match source.map(&load) {
        Some(Ok(buffer)) => return Ok(buffer),
        Some(Err(e @ ImageLoadError::Geometry(_))) => return Err(e),
        Some(Err(e)) => {
            tracing::warn!(error = %e, fallback = %fallback.display(), "Source image failed, using fallback");
        }
        None => {
            tracing::warn!(fallback = %fallback.display(), "No source image, using fallback");
        }
    }

    load(fallback).inspect_err(|e| {
        tracing::error!(error = %e, "Fallback image failed to load");
    })
}
