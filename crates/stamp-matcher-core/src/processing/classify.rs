//! Decides which decode path an input buffer takes.
//!
//! Extension wins when it is recognised. Otherwise the leading bytes are
//! sniffed for XML/SVG markup, and finally a raster header probe is tried.

use std::io::Cursor;
use std::path::Path;

use log::debug;

use crate::types::AssetKind;

/// Extensions treated as vector markup
pub const VECTOR_EXTENSIONS: &[&str] = &["svg", "svgz"];

/// Extensions treated as raster images
pub const RASTER_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff",
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const MARKUP_PREFIXES: &[&[u8]] = &[b"<?xml", b"<svg", b"<!DOCTYPE svg"];

/// Classify an input buffer. Never fails; anything unrecognised is `Unknown`.
pub fn classify(name: &str, content: &[u8]) -> AssetKind {
    let kind = classify_inner(name, content);
    debug!("Classified '{}' as {:?}", name, kind);
    kind
}

fn classify_inner(name: &str, content: &[u8]) -> AssetKind {
    let ext = get_file_extension(name);

    if VECTOR_EXTENSIONS.contains(&ext.as_str()) {
        return AssetKind::VectorGraphic;
    }
    if RASTER_EXTENSIONS.contains(&ext.as_str()) {
        return AssetKind::RasterImage;
    }
    if looks_like_markup(content) {
        return AssetKind::VectorGraphic;
    }
    if probe_raster(content) {
        return AssetKind::RasterImage;
    }

    AssetKind::Unknown
}

/// Get file extension as lowercase string
pub fn get_file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// True if the name carries an extension the classifier knows about
pub fn has_known_extension(name: &str) -> bool {
    let ext = get_file_extension(name);
    VECTOR_EXTENSIONS.contains(&ext.as_str()) || RASTER_EXTENSIONS.contains(&ext.as_str())
}

fn looks_like_markup(content: &[u8]) -> bool {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let start = content
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(content.len());
    let content = &content[start..];

    MARKUP_PREFIXES.iter().any(|prefix| content.starts_with(prefix))
}

/// Header-only decode probe
fn probe_raster(content: &[u8]) -> bool {
    match image::io::Reader::new(Cursor::new(content)).with_guessed_format() {
        Ok(reader) => reader.format().is_some() && reader.into_dimensions().is_ok(),
        Err(_) => false,
    }
}
