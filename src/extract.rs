//! Object extraction: cut the masked object out of a full image, scale it to
//! fit a fixed canvas while keeping its aspect ratio, and center it on a
//! solid background.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::map::map_colors2;
use tracing::{debug, warn};

use crate::error::{Result, SliceError};
use crate::mask::{self, FOREGROUND};
use crate::models::RawMask;

pub const DEFAULT_TARGET_SIZE: (u32, u32) = (1024, 1024);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Where a `width x height` object lands on a `target` canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
}

impl Placement {
    pub fn compute(width: u32, height: u32, target: (u32, u32)) -> Self {
        let (target_w, target_h) = target;

        let (scale, scaled_w, scaled_h) = if width > 0 && height > 0 {
            let scale_w = target_w as f64 / width as f64;
            let scale_h = target_h as f64 / height as f64;
            // The limiting axis fills the target exactly; only the other axis is floored.
            if scale_w <= scale_h {
                (scale_w, target_w, (height as f64 * scale_w).floor() as u32)
            } else {
                (scale_h, (width as f64 * scale_h).floor() as u32, target_h)
            }
        } else {
            (1.0, width, height)
        };

        let scaled_w = scaled_w.clamp(1, target_w.max(1));
        let scaled_h = scaled_h.clamp(1, target_h.max(1));

        Self {
            scale,
            width: scaled_w,
            height: scaled_h,
            x_offset: target_w.saturating_sub(scaled_w) / 2,
            y_offset: target_h.saturating_sub(scaled_h) / 2,
        }
    }
}

/// Produces fixed-size object images from an image and a binary mask
#[derive(Debug, Clone)]
pub struct ObjectExtractor {
    pub target_size: (u32, u32),
    pub background: Rgb<u8>,
}

impl ObjectExtractor {
    pub fn new(target_size: (u32, u32)) -> Self {
        Self {
            target_size,
            background: WHITE,
        }
    }

    pub fn with_background(mut self, background: Rgb<u8>) -> Self {
        self.background = background;
        self
    }

    /// Normalize `raw` and extract the object it covers
    pub fn extract_raw(&self, image: &RgbImage, raw: &RawMask) -> Result<RgbImage> {
        let binary = mask::normalize(raw)?;
        self.extract(image, &binary)
    }

    /// Extract the object covered by a binary (0/255) mask.
    ///
    /// The result is always exactly `target_size`. An empty mask yields a
    /// canvas filled with the background color.
    pub fn extract(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
        if image.dimensions() != mask.dimensions() {
            return Err(SliceError::DimensionMismatch {
                image: image.dimensions(),
                mask: mask.dimensions(),
            });
        }

        let (target_w, target_h) = self.target_size;
        if target_w == 0 || target_h == 0 {
            return Err(SliceError::Config(format!(
                "target size must be non-zero, got {}x{}",
                target_w, target_h
            )));
        }
        let mut canvas = RgbImage::from_pixel(target_w, target_h, self.background);

        let Some(rect) = mask::foreground_bounds(mask) else {
            warn!("Empty mask, returning blank {}x{} canvas", target_w, target_h);
            return Ok(canvas);
        };

        let masked = map_colors2(image, mask, |pixel: Rgb<u8>, m: Luma<u8>| {
            if m[0] > 0 { pixel } else { Rgb([0, 0, 0]) }
        });

        let (x, y) = (rect.left() as u32, rect.top() as u32);
        let (w, h) = (rect.width(), rect.height());
        let cropped_object = imageops::crop_imm(&masked, x, y, w, h).to_image();
        let cropped_mask = imageops::crop_imm(mask, x, y, w, h).to_image();

        let placement = Placement::compute(w, h, self.target_size);
        debug!(
            "Object {}x{} at ({}, {}) -> {}x{} (scale {:.3}) at offset ({}, {})",
            w, h, x, y, placement.width, placement.height, placement.scale,
            placement.x_offset, placement.y_offset
        );

        // Smooth kernel for pixels, nearest for the mask so it stays hard-edged
        let resized_object = imageops::resize(
            &cropped_object,
            placement.width,
            placement.height,
            FilterType::Triangle,
        );
        let resized_mask = mask::binarize(&imageops::resize(
            &cropped_mask,
            placement.width,
            placement.height,
            FilterType::Nearest,
        ));

        for (px, py, m) in resized_mask.enumerate_pixels() {
            if m[0] == FOREGROUND {
                canvas.put_pixel(
                    placement.x_offset + px,
                    placement.y_offset + py,
                    *resized_object.get_pixel(px, py),
                );
            }
        }

        Ok(canvas)
    }
}

impl Default for ObjectExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SIZE)
    }
}

/// Free-function form of [`ObjectExtractor::extract`] with a white background
pub fn extract_object(image: &RgbImage, mask: &GrayImage, target_size: (u32, u32)) -> Result<RgbImage> {
    ObjectExtractor::new(target_size).extract(image, mask)
}
