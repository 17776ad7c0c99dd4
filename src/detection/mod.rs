//! Adapters to the external detection and segmentation models.
//!
//! A [`Detector`] turns an image into labelled boxes. A [`Segmenter`] is
//! stateful: `set_image` installs the image context, then `predict` is
//! called once per box. That pair forms one exclusive session, represented
//! by [`SegmentSession`], which holds the segmenter mutably borrowed for as
//! long as the image context is in use.

pub mod contours;
pub mod contrast;
pub mod preprocessing;

use image::RgbImage;
use tracing::debug;

use crate::error::{Result, SliceError};
use crate::models::{BoundingBox, DetectedBox, MaskCandidates, RawMask};

pub use contours::ContourDetector;
pub use contrast::ContrastSegmenter;

/// Box detector conditioned on a label vocabulary
pub trait Detector: Send {
    /// Boxes whose confidence passes `box_threshold` and whose label match
    /// passes `text_threshold`. `class_id` indexes into `classes`.
    fn predict_with_classes(
        &mut self,
        image: &RgbImage,
        classes: &[String],
        box_threshold: f32,
        text_threshold: f32,
    ) -> anyhow::Result<Vec<DetectedBox>>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

/// Box-prompted multi-mask segmenter
pub trait Segmenter: Send {
    /// Install the image context for subsequent `predict` calls
    fn set_image(&mut self, image: &RgbImage) -> anyhow::Result<()>;

    /// Candidate masks (image-sized) and their scores for one box
    fn predict(&mut self, bbox: &BoundingBox) -> anyhow::Result<MaskCandidates>;

    fn name(&self) -> &str;
}

/// One image context on a segmenter
pub struct SegmentSession<'a> {
    segmenter: &'a mut dyn Segmenter,
    image_size: (u32, u32),
}

impl<'a> SegmentSession<'a> {
    pub fn begin(segmenter: &'a mut dyn Segmenter, image: &RgbImage) -> Result<Self> {
        segmenter
            .set_image(image)
            .map_err(|e| SliceError::segmentation(e.context("set_image failed")))?;
        Ok(Self {
            segmenter,
            image_size: image.dimensions(),
        })
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    /// Predict candidates for `bbox` and keep the highest-scoring mask
    pub fn predict_best(&mut self, bbox: &BoundingBox) -> Result<RawMask> {
        let candidates = self.segmenter.predict(bbox).map_err(SliceError::segmentation)?;
        select_best(candidates)
    }
}

/// Highest-scoring candidate; the first one wins ties
pub fn select_best(candidates: MaskCandidates) -> Result<RawMask> {
    if candidates.masks.len() != candidates.scores.len() {
        return Err(SliceError::Segmentation(format!(
            "segmenter returned {} masks but {} scores",
            candidates.masks.len(),
            candidates.scores.len()
        )));
    }
    let index = candidates
        .best_index()
        .ok_or_else(|| SliceError::Segmentation("segmenter returned no candidate masks".to_string()))?;
    candidates
        .masks
        .into_iter()
        .nth(index)
        .ok_or_else(|| SliceError::Segmentation(format!("no candidate mask at index {}", index)))
}

/// One mask per box, in box order. Any failure aborts the whole image.
pub fn segment(segmenter: &mut dyn Segmenter, image: &RgbImage, boxes: &[BoundingBox]) -> Result<Vec<RawMask>> {
    let mut session = SegmentSession::begin(segmenter, image)?;
    let mut masks = Vec::with_capacity(boxes.len());
    for (i, bbox) in boxes.iter().enumerate() {
        let mask = session.predict_best(bbox).map_err(|e| match e {
            SliceError::Segmentation(msg) => SliceError::Segmentation(format!("box {}: {}", i, msg)),
            other => other,
        })?;
        masks.push(mask);
    }
    debug!("Generated {} masks for {} boxes", masks.len(), boxes.len());
    Ok(masks)
}
