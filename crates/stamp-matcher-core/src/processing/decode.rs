//! Turns classified input bytes into a small luminance grid.
//!
//! Vector markup is rendered with resvg onto an opaque white canvas, raster
//! formats are decoded with the `image` crate. Both then have any alpha
//! flattened onto white, are converted to luminance and downsampled to a
//! `grid × grid` raster with an area-averaging filter.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Rgba, RgbaImage};
use log::{debug, info};
use resvg::{tiny_skia, usvg};

use crate::config::Config;
use crate::error::DecodeError;
use crate::types::AssetKind;

/// Canvas edge used when rasterizing vector graphics
pub const DEFAULT_CANVAS_SIZE: u32 = 256;

/// Edge of the luminance grid
pub const DEFAULT_GRID_SIZE: u32 = 8;

/// How many embedded JPEG start markers to try before giving up
const MAX_RECOVERY_ATTEMPTS: usize = 4;

/// A square single-channel luminance grid, samples in [0, 1], row-major
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRaster {
    side: u32,
    samples: Vec<f32>,
}

impl NormalizedRaster {
    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn mean(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| s as f64).sum();
        (sum / self.samples.len() as f64) as f32
    }

    /// Samples quantized to 8-bit gray levels
    pub fn levels(&self) -> Vec<u8> {
        self.samples
            .iter()
            .map(|&s| (s.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}

/// Decodes assets at a fixed canvas and grid size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    canvas_size: u32,
    grid_size: u32,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIZE, DEFAULT_GRID_SIZE)
    }
}

impl Decoder {
    pub fn new(canvas_size: u32, grid_size: u32) -> Self {
        Self {
            canvas_size,
            grid_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.canvas_size, config.grid_size)
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Decode and reduce to the luminance grid
    pub fn decode(&self, kind: AssetKind, content: &[u8]) -> Result<NormalizedRaster, DecodeError> {
        let img = self.load_image(kind, content)?;
        Ok(normalize(&img, self.grid_size))
    }

    /// Decode to a full-size image without reducing it
    pub fn load_image(&self, kind: AssetKind, content: &[u8]) -> Result<DynamicImage, DecodeError> {
        let img = match kind {
            AssetKind::VectorGraphic => rasterize_svg(content, self.canvas_size)?,
            AssetKind::RasterImage => decode_raster(content)?,
            AssetKind::Unknown => {
                return Err(DecodeError::UnsupportedFormat(
                    "content is neither vector markup nor a known raster format".to_string(),
                ))
            }
        };

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::CorruptData(format!(
                "decoded image has no pixels ({}x{})",
                width, height
            )));
        }

        debug!("Decoded {:?} asset to {}x{}", kind, width, height);
        Ok(img)
    }
}

/// Decode with the default canvas and grid size
pub fn decode(kind: AssetKind, content: &[u8]) -> Result<NormalizedRaster, DecodeError> {
    Decoder::default().decode(kind, content)
}

/// Render SVG markup onto a square opaque white canvas
pub fn rasterize_svg(content: &[u8], canvas_size: u32) -> Result<DynamicImage, DecodeError> {
    let tree = usvg::Tree::from_data(content, &usvg::Options::default())
        .map_err(|e| DecodeError::RasterizationFailed(format!("Failed to parse SVG: {}", e)))?;

    let size = tree.size();
    if size.width() <= 0.0 || size.height() <= 0.0 {
        return Err(DecodeError::RasterizationFailed(format!(
            "Invalid SVG dimensions: {}x{}",
            size.width(),
            size.height()
        )));
    }

    let mut pixmap = tiny_skia::Pixmap::new(canvas_size, canvas_size).ok_or_else(|| {
        DecodeError::RasterizationFailed(format!(
            "Failed to allocate {}x{} canvas",
            canvas_size, canvas_size
        ))
    })?;
    pixmap.fill(tiny_skia::Color::WHITE);

    // Stretch to the canvas; aspect ratio is not preserved
    let transform = tiny_skia::Transform::from_scale(
        canvas_size as f32 / size.width(),
        canvas_size as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // Opaque background, so premultiplied and straight alpha agree
    let rgba = RgbaImage::from_raw(canvas_size, canvas_size, pixmap.take()).ok_or_else(|| {
        DecodeError::RasterizationFailed("Rendered pixmap has unexpected size".to_string())
    })?;

    Ok(DynamicImage::ImageRgba8(rgba))
}

/// Decode a raster image, with a retry for JPEG data behind junk bytes
pub fn decode_raster(content: &[u8]) -> Result<DynamicImage, DecodeError> {
    match image::load_from_memory(content) {
        Ok(img) => Ok(img),
        Err(e) => {
            if let Some(img) = recover_embedded_jpeg(content) {
                return Ok(img);
            }
            Err(e.into())
        }
    }
}

/// Look for a JPEG SOI marker (0xFFD8) past the start of the buffer
fn recover_embedded_jpeg(content: &[u8]) -> Option<DynamicImage> {
    let offsets: Vec<usize> = content
        .windows(2)
        .enumerate()
        .skip(1)
        .filter(|(_, w)| w[0] == 0xFF && w[1] == 0xD8)
        .map(|(i, _)| i)
        .take(MAX_RECOVERY_ATTEMPTS)
        .collect();

    for &offset in &offsets {
        if let Ok(img) = image::load_from_memory(&content[offset..]) {
            info!("Recovered JPEG image after skipping {} bytes", offset);
            return Some(img);
        }
    }

    if !offsets.is_empty() {
        debug!("JPEG recovery failed after {} attempts", offsets.len());
    }
    None
}

/// Flatten onto white, convert to luminance and area-average down to `grid × grid`
pub fn normalize(img: &DynamicImage, grid: u32) -> NormalizedRaster {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let luma: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([luminance(rgba.get_pixel(x, y))]));

    let small = imageops::resize(&luma, grid, grid, FilterType::Triangle);

    NormalizedRaster {
        side: grid,
        samples: small.into_raw(),
    }
}

/// Grayscale formula: 0.299*R + 0.587*G + 0.114*B, after compositing onto white
fn luminance(pixel: &Rgba<u8>) -> f32 {
    let [r, g, b, a] = pixel.0;
    let alpha = a as f32 / 255.0;
    let over_white = |c: u8| c as f32 * alpha + 255.0 * (1.0 - alpha);

    (0.299 * over_white(r) + 0.587 * over_white(g) + 0.114 * over_white(b)) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    const HALF_BLACK_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
        <rect x="0" y="0" width="50" height="100" fill="black"/>
    </svg>"#;

    fn encode(img: &DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_svg_renders_onto_white() {
        let raster = decode(AssetKind::VectorGraphic, HALF_BLACK_SVG.as_bytes()).unwrap();
        assert_eq!(raster.side(), 8);
        assert_eq!(raster.samples().len(), 64);

        // Left half dark, right half white
        let row = &raster.samples()[0..8];
        assert!(row[0] < 0.1);
        assert!(row[7] > 0.9);
    }

    #[test]
    fn test_transparent_svg_uses_white_background() {
        let empty = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;
        let raster = decode(AssetKind::VectorGraphic, empty.as_bytes()).unwrap();
        assert!(raster.samples().iter().all(|&s| s > 0.99));
    }

    #[test]
    fn test_invalid_svg_fails_rasterization() {
        let result = decode(AssetKind::VectorGraphic, b"<svg><unclosed");
        assert!(matches!(result, Err(DecodeError::RasterizationFailed(_))));
    }

    #[test]
    fn test_raster_decode() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }));
        let raster = decode(AssetKind::RasterImage, &encode(&img, ImageOutputFormat::Png)).unwrap();
        assert!(raster.samples()[0] < 0.1);
        assert!(raster.samples()[7] > 0.9);
        assert!((raster.mean() - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_transparent_raster_flattens_to_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])));
        let raster = decode(AssetKind::RasterImage, &encode(&img, ImageOutputFormat::Png)).unwrap();
        assert!(raster.samples().iter().all(|&s| s > 0.99));
    }

    #[test]
    fn test_corrupt_raster() {
        let mut bytes = encode(
            &DynamicImage::ImageRgb8(RgbImage::new(16, 16)),
            ImageOutputFormat::Png,
        );
        bytes.truncate(40);
        let result = decode(AssetKind::RasterImage, &bytes);
        assert!(matches!(result, Err(DecodeError::CorruptData(_))));
    }

    #[test]
    fn test_jpeg_behind_junk_is_recovered() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([200, 10, 10])));
        let mut bytes = b"JUNKHEADER".to_vec();
        bytes.extend(encode(&img, ImageOutputFormat::Jpeg(90)));

        let raster = decode(AssetKind::RasterImage, &bytes).unwrap();
        assert_eq!(raster.samples().len(), 64);
    }

    #[test]
    fn test_flat_raster_levels_are_uniform() {
        for gray in [10u8, 50, 100, 128, 179, 200, 230] {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([gray; 3])));
            let raster =
                decode(AssetKind::RasterImage, &encode(&img, ImageOutputFormat::Png)).unwrap();
            assert!(raster.levels().iter().all(|&level| level == gray), "gray {}", gray);
        }
    }

    #[test]
    fn test_recovery_without_usable_marker() {
        assert!(recover_embedded_jpeg(b"\x89PNG not a jpeg").is_none());
        assert!(recover_embedded_jpeg(b"junk\xFF\xD8 truncated").is_none());
    }

    #[test]
    fn test_unknown_kind_is_unsupported() {
        let result = decode(AssetKind::Unknown, b"whatever");
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_custom_grid_size() {
        let decoder = Decoder::new(64, 16);
        let raster = decoder
            .decode(AssetKind::VectorGraphic, HALF_BLACK_SVG.as_bytes())
            .unwrap();
        assert_eq!(raster.side(), 16);
        assert_eq!(raster.samples().len(), 256);
    }
}
