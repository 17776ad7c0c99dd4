use anyhow::{Context, Result};
use image::{GrayImage, RgbImage};
use tracing::info;

use super::Segmenter;
use super::preprocessing;
use crate::config::Device;
use crate::models::{BoundingBox, MaskCandidates, RawMask};

/// Classical multi-mask segmenter. Inside the prompt box it thresholds the
/// contrast against the background at several levels and scores each
/// candidate by how stable its area is when the threshold moves by `margin`.
pub struct ContrastSegmenter {
    pub levels: Vec<u8>,
    pub margin: u8,
    contrast: Option<GrayImage>,
}

impl ContrastSegmenter {
    pub fn new(device: Device) -> Self {
        if device == Device::Cuda {
            info!("Contrast segmenter runs on the CPU; ignoring device=cuda");
        }
        Self {
            levels: vec![24, 48, 96],
            margin: 8,
            contrast: None,
        }
    }

    fn count_above(&self, contrast: &GrayImage, bounds: (u32, u32, u32, u32), level: i32) -> usize {
        let (x0, y0, x1, y1) = bounds;
        let mut count = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                if contrast.get_pixel(x, y)[0] as i32 > level {
                    count += 1;
                }
            }
        }
        count
    }
}

impl Segmenter for ContrastSegmenter {
    fn set_image(&mut self, image: &RgbImage) -> Result<()> {
        let background = preprocessing::estimate_background(image);
        self.contrast = Some(preprocessing::contrast_map(image, background));
        Ok(())
    }

    fn predict(&mut self, bbox: &BoundingBox) -> Result<MaskCandidates> {
        let contrast = self
            .contrast
            .as_ref()
            .context("predict called before set_image")?;
        let (width, height) = contrast.dimensions();
        let bounds = bbox.pixel_bounds(width, height);
        let (x0, y0, x1, y1) = bounds;

        let mut masks = Vec::with_capacity(self.levels.len());
        let mut scores = Vec::with_capacity(self.levels.len());

        for &level in &self.levels {
            let mut data = vec![false; (width * height) as usize];
            for y in y0..y1 {
                for x in x0..x1 {
                    if contrast.get_pixel(x, y)[0] > level {
                        data[(y * width + x) as usize] = true;
                    }
                }
            }

            let loose = self.count_above(contrast, bounds, level as i32 - self.margin as i32);
            let tight = self.count_above(contrast, bounds, level as i32 + self.margin as i32);
            let score = if loose == 0 { 0.0 } else { tight as f32 / loose as f32 };

            masks.push(RawMask::from_bools(width, height, data));
            scores.push(score);
        }

        Ok(MaskCandidates { masks, scores })
    }

    fn name(&self) -> &str {
        "Contrast Segmenter"
    }
}
