use anyhow::Result;
use image::{GrayImage, Luma, RgbImage};
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::HashMap;
use tracing::{debug, info};

use super::Detector;
use super::preprocessing;
use crate::config::Device;
use crate::models::{BoundingBox, DetectedBox};

/// Connected foreground region
#[derive(Debug, Clone)]
pub struct Region {
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Share of the bounding box covered by the region
    pub fn fill_ratio(&self) -> f32 {
        self.pixel_count as f32 / (self.width() * self.height()) as f32
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_x as f32,
            self.min_y as f32,
            (self.max_x + 1) as f32,
            (self.max_y + 1) as f32,
        )
    }
}

/// Find regions in a binary image using connected components
pub fn find_regions(binary: &GrayImage, min_area: u32) -> Vec<Region> {
    let labeled = connected_components(binary, Connectivity::Eight, Luma([0]));

    let mut regions: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();

    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue; // Skip background
        }

        regions.entry(label_val)
            .and_modify(|(min_x, min_y, max_x, max_y, count)| {
                *min_x = (*min_x).min(x);
                *min_y = (*min_y).min(y);
                *max_x = (*max_x).max(x);
                *max_y = (*max_y).max(y);
                *count += 1;
            })
            .or_insert((x, y, x, y, 1));
    }

    let mut found: Vec<Region> = regions.into_iter()
        .map(|(label, (min_x, min_y, max_x, max_y, count))| Region {
            label,
            min_x,
            min_y,
            max_x,
            max_y,
            pixel_count: count,
        })
        .filter(|r| r.pixel_count >= min_area)
        .collect();

    // Label order depends on hashing; report top-to-bottom, left-to-right
    found.sort_by_key(|r| (r.min_y, r.min_x, r.label));
    found
}

/// Classical detector: objects are regions that stand out from a uniform
/// background. It has no notion of labels, so every box is reported as the
/// first vocabulary class and `text_threshold` is not used.
pub struct ContourDetector {
    pub contrast_threshold: u8,
    pub min_area: u32,
    pub sigma: f32,
}

impl ContourDetector {
    pub fn new(device: Device) -> Self {
        if device == Device::Cuda {
            info!("Contour detector runs on the CPU; ignoring device=cuda");
        }
        Self {
            contrast_threshold: 40,
            min_area: 64,
            sigma: 1.5,
        }
    }

    /// Binary foreground map of the image
    pub fn foreground(&self, img: &RgbImage) -> GrayImage {
        let background = preprocessing::estimate_background(img);
        let contrast = preprocessing::apply_blur(
            &preprocessing::contrast_map(img, background),
            self.sigma,
        );
        let threshold = self.contrast_threshold;
        GrayImage::from_fn(contrast.width(), contrast.height(), |x, y| {
            Luma([if contrast.get_pixel(x, y)[0] > threshold { 255 } else { 0 }])
        })
    }
}

impl Detector for ContourDetector {
    fn predict_with_classes(
        &mut self,
        image: &RgbImage,
        classes: &[String],
        box_threshold: f32,
        _text_threshold: f32,
    ) -> Result<Vec<DetectedBox>> {
        if classes.is_empty() {
            anyhow::bail!("Class vocabulary is empty");
        }

        let regions = find_regions(&self.foreground(image), self.min_area);
        debug!("Found {} candidate regions", regions.len());

        Ok(regions
            .iter()
            .filter(|r| r.fill_ratio() >= box_threshold)
            .map(|r| DetectedBox {
                bbox: r.bbox(),
                class_id: 0,
                confidence: r.fill_ratio(),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Contour Detector"
    }
}
