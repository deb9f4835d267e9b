use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

use stamp_matcher_core::InputAsset;

/// A filled red circle centred on a 100×100 canvas
pub const RED_CIRCLE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
    <circle cx="50" cy="50" r="40" fill="#ff0000"/>
</svg>"##;

/// A filled blue square in the top-left quadrant of a 100×100 canvas
pub const BLUE_SQUARE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
    <rect x="0" y="0" width="50" height="50" fill="#0000ff"/>
</svg>"##;

pub fn svg_asset(name: &str, markup: &str) -> InputAsset {
    InputAsset::new(name, markup.as_bytes().to_vec())
}

pub fn encode_png(img: &DynamicImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Png).unwrap();
    buffer.into_inner()
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))
        .unwrap();
    buffer.into_inner()
}

/// Deterministic per-pixel jitter in [-amplitude, amplitude]
fn jitter(x: u32, y: u32, channel: u32, amplitude: i32) -> i32 {
    let mut h = x
        .wrapping_mul(374_761_393)
        .wrapping_add(y.wrapping_mul(668_265_263))
        .wrapping_add(channel.wrapping_mul(2_147_483_647));
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    (h % (2 * amplitude as u32 + 1)) as i32 - amplitude
}

fn noisy(color: [u8; 3], x: u32, y: u32, amplitude: i32) -> Rgb<u8> {
    let mut out = [0u8; 3];
    for (c, value) in color.iter().enumerate() {
        out[c] = (*value as i32 + jitter(x, y, c as u32, amplitude)).clamp(0, 255) as u8;
    }
    Rgb(out)
}

/// A "photograph" of the red circle: off-white paper, slightly off-centre,
/// duller red, sensor noise, JPEG compressed
pub fn red_circle_photo() -> Vec<u8> {
    let size = 200;
    let img = RgbImage::from_fn(size, size, |x, y| {
        let dx = x as f32 - 101.0;
        let dy = y as f32 - 99.0;
        let inside = (dx * dx + dy * dy).sqrt() < 79.0;
        let color = if inside { [200, 30, 30] } else { [245, 242, 236] };
        noisy(color, x, y, 8)
    });
    encode_jpeg(&DynamicImage::ImageRgb8(img), 85)
}

/// Vertical bands of alternating brightness
pub fn banded_png(width: u32, height: u32, band: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if (x / band) % 2 == 0 {
            Rgb([20, 20, 20])
        } else {
            Rgb([230, 230, 230])
        }
    });
    encode_png(&DynamicImage::ImageRgb8(img))
}

/// Horizontal gradient, dark on the left
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, _| {
        let v = (x * 255 / width.max(1)) as u8;
        Rgb([v, v, v])
    });
    encode_png(&DynamicImage::ImageRgb8(img))
}
