use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use minimlogo_contracts::{LogoError, WhiteThreshold};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripReport {
    pub width: u32,
    pub height: u32,
    pub cleared_pixels: u64,
}

/// Sets alpha to 0 on every pixel whose red, green and blue all exceed
/// `threshold`. Other pixels, including their alpha, are left alone.
///
/// Near-white anti-aliased edge pixels of the mark are stripped as well,
/// which hardens edges. Returns the number of pixels matched.
pub fn strip_near_white(image: &mut RgbaImage, threshold: WhiteThreshold) -> u64 {
    let mut cleared = 0u64;
    for pixel in image.pixels_mut() {
        if threshold.is_background(pixel[0], pixel[1], pixel[2]) {
            pixel[3] = 0;
            cleared += 1;
        }
    }
    cleared
}

/// Decodes `bytes`, strips the near-white background and re-encodes as PNG.
pub fn remove_near_white_background(
    bytes: &[u8],
    threshold: WhiteThreshold,
) -> Result<Vec<u8>, LogoError> {
    remove_near_white_background_with_report(bytes, threshold).map(|(png, _)| png)
}

pub fn remove_near_white_background_with_report(
    bytes: &[u8],
    threshold: WhiteThreshold,
) -> Result<(Vec<u8>, StripReport), LogoError> {
    let mut image = decode_rgba(bytes)?;
    let cleared_pixels = strip_near_white(&mut image, threshold);
    let report = StripReport {
        width: image.width(),
        height: image.height(),
        cleared_pixels,
    };
    Ok((encode_png(&image)?, report))
}

pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, LogoError> {
    image::load_from_memory(bytes)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|err| LogoError::ImageDecode(err.to_string()))
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, LogoError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|err| LogoError::Other(format!("PNG encoding failed: {err}")))?;
    Ok(buf.into_inner())
}
