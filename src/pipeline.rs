use image::RgbImage;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::SliceConfig;
use crate::debug::{DebugSink, DirectoryDebugSink, NoopDebugSink};
use crate::detection::{self, Detector, Segmenter};
use crate::error::{ErrorScope, Result, SliceError};
use crate::extract::ObjectExtractor;
use crate::models::{BoundingBox, DetectedBox, RawMask};

/// One object cut out of an image
#[derive(Debug, Clone)]
pub struct ExtractedObject {
    /// Index of the detection that produced it
    pub index: usize,
    pub detection: DetectedBox,
    pub image: RgbImage,
}

/// Something that turns one encoded image into encoded object payloads
pub trait ImageProcessor {
    /// `batch_index` only labels logs and debug artifacts
    fn process_image_at(&mut self, batch_index: usize, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Single-image pipeline: decode, detect, segment, extract, encode.
///
/// The pipeline owns its detector and segmenter and every entry point takes
/// `&mut self`, so one segmenter never serves two images at once. Run
/// independent pipelines for concurrent work.
pub struct Pipeline {
    detector: Box<dyn Detector>,
    segmenter: Box<dyn Segmenter>,
    config: SliceConfig,
    extractor: ObjectExtractor,
    debug: Box<dyn DebugSink>,
}

impl Pipeline {
    /// Create a pipeline with the default configuration
    pub fn new(detector: Box<dyn Detector>, segmenter: Box<dyn Segmenter>) -> Self {
        let config = SliceConfig::default();
        Self {
            detector,
            segmenter,
            extractor: ObjectExtractor::new(config.target_size),
            config,
            debug: Box::new(NoopDebugSink),
        }
    }

    /// Replace the configuration; it is validated and then fixed
    pub fn with_config(mut self, config: SliceConfig) -> Result<Self> {
        config.validate()?;
        self.extractor = ObjectExtractor::new(config.target_size);
        self.config = config;
        Ok(self)
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(self, output_dir: PathBuf) -> Result<Self> {
        let sink = DirectoryDebugSink::new(output_dir)?;
        Ok(self.with_debug_sink(Box::new(sink)))
    }

    pub fn with_debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.debug = sink;
        self
    }

    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    /// Decode and process one image, returning base64 PNG payloads
    pub fn process_image(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.process_image_at(0, bytes)
    }

    /// Detect, segment and extract every object in `image`.
    ///
    /// Detection and segmentation failures abort the image. A detection that
    /// has no mask, or whose extraction fails, is skipped.
    pub fn extract_objects(&mut self, image: &RgbImage) -> Result<Vec<ExtractedObject>> {
        let detections = self
            .detector
            .predict_with_classes(
                image,
                &self.config.classes,
                self.config.box_threshold,
                self.config.text_threshold,
            )
            .map_err(SliceError::detection)?;

        if detections.is_empty() {
            info!("No objects detected matching the criteria");
            return Ok(Vec::new());
        }
        debug!("{} found {} detections", self.detector.name(), detections.len());

        let boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bbox).collect();
        let masks = detection::segment(self.segmenter.as_mut(), image, &boxes)?;

        let mut objects = Vec::new();
        for (i, detection, mask) in pair_detections(detections, masks) {
            match self.extractor.extract_raw(image, &mask) {
                Ok(extracted) => objects.push(ExtractedObject {
                    index: i,
                    detection,
                    image: extracted,
                }),
                Err(e) if e.scope() == ErrorScope::Detection => {
                    warn!("Skipping detection {}: {}", i, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(objects)
    }

    /// Hand one object and its payload to the debug sink. Sink failures are
    /// logged and never fail the caller.
    pub fn save_debug(&mut self, batch_index: usize, object: &ExtractedObject, encoded: &str) {
        if let Err(e) = self.debug.save_image(batch_index, object.index, &object.image) {
            warn!("Failed to save debug image for detection {}: {}", object.index, e);
        }
        if let Err(e) = self.debug.save_encoded(batch_index, object.index, encoded) {
            warn!("Failed to save debug payload for detection {}: {}", object.index, e);
        }
    }
}

/// Pair detections with masks by index. Detections past the end of `masks`
/// are skipped with a warning; extra masks are ignored.
pub fn pair_detections(
    detections: Vec<DetectedBox>,
    masks: Vec<RawMask>,
) -> Vec<(usize, DetectedBox, RawMask)> {
    if masks.len() != detections.len() {
        warn!(
            "Number of masks ({}) does not match number of detections ({})",
            masks.len(),
            detections.len()
        );
    }

    let mut masks = masks.into_iter();
    let mut paired = Vec::with_capacity(detections.len());
    for (i, detection) in detections.into_iter().enumerate() {
        match masks.next() {
            Some(mask) => paired.push((i, detection, mask)),
            None => warn!("Skipping detection {} due to missing mask", i),
        }
    }
    paired
}

impl ImageProcessor for Pipeline {
    fn process_image_at(&mut self, batch_index: usize, bytes: &[u8]) -> Result<Vec<String>> {
        let image = codec::decode_image(bytes)?;
        debug!("Loaded image {}x{}", image.width(), image.height());

        let objects = self.extract_objects(&image)?;

        let mut encoded = Vec::with_capacity(objects.len());
        for object in objects {
            let text = match codec::encode_png_base64(&object.image) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping detection {}: {}", object.index, e);
                    continue;
                }
            };

            self.save_debug(batch_index, &object, &text);
            encoded.push(text);
        }

        debug!("Returning {} encoded objects", encoded.len());
        Ok(encoded)
    }
}
