//! Image and text codecs used at the pipeline edges.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::error::{Result, SliceError};

/// Decode any supported image format into 8-bit RGB. Alpha is dropped, not
/// treated as a mask.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(SliceError::Decode("input image data is empty".to_string()));
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| SliceError::Decode(e.to_string()))?;
    Ok(img.to_rgb8())
}

/// Lossless PNG with maximum compression
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
        .map_err(|e| SliceError::Encode(e.to_string()))?;
    Ok(buffer)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Whitespace anywhere in the text is ignored, so line-wrapped payloads decode.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// PNG-encode an image and wrap it as base64 text for JSON payloads
pub fn encode_png_base64(image: &RgbImage) -> Result<String> {
    Ok(encode_base64(&encode_png(image)?))
}
