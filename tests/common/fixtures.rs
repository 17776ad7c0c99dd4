use image::{Rgb, RgbImage};
use maskslice::{
    BoundingBox, DebugSink, DetectedBox, Detector, MaskCandidates, MaskData, Pipeline, RawMask, Segmenter,
    SliceConfig, codec,
};
use std::sync::{Arc, Mutex};

pub const BACKGROUND: Rgb<u8> = Rgb([245, 245, 245]);
pub const RED: Rgb<u8> = Rgb([200, 30, 30]);
pub const BLUE: Rgb<u8> = Rgb([20, 20, 160]);

/// Resampling may shift a channel by a step or two
pub fn near(p: &Rgb<u8>, color: Rgb<u8>) -> bool {
    (0..3).all(|c| (p[c] as i16 - color[c] as i16).abs() <= 3)
}

/// Axis-aligned filled rectangle: (x, y, width, height, color)
pub type Block = (u32, u32, u32, u32, Rgb<u8>);

/// Creates an RGB image with solid rectangles on a light background.
pub fn scene(width: u32, height: u32, blocks: &[Block]) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    for &(x, y, w, h, color) in blocks {
        for py in y..(y + h).min(height) {
            for px in x..(x + w).min(width) {
                img.put_pixel(px, py, color);
            }
        }
    }
    img
}

pub fn scene_png(width: u32, height: u32, blocks: &[Block]) -> Vec<u8> {
    codec::encode_png(&scene(width, height, blocks)).expect("Failed to encode test scene")
}

pub fn scene_base64(width: u32, height: u32, blocks: &[Block]) -> String {
    codec::encode_base64(&scene_png(width, height, blocks))
}

pub fn block_box(block: &Block) -> BoundingBox {
    let &(x, y, w, h, _) = block;
    BoundingBox::new(x as f32, y as f32, (x + w) as f32, (y + h) as f32)
}

/// Returns the same boxes for every image, or fails
pub struct FixedDetector {
    pub boxes: Vec<BoundingBox>,
    pub fail: bool,
}

impl FixedDetector {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self { boxes, fail: false }
    }

    pub fn failing() -> Self {
        Self { boxes: vec![], fail: true }
    }
}

impl Detector for FixedDetector {
    fn predict_with_classes(
        &mut self,
        _image: &RgbImage,
        classes: &[String],
        _box_threshold: f32,
        _text_threshold: f32,
    ) -> anyhow::Result<Vec<DetectedBox>> {
        if self.fail {
            anyhow::bail!("detector out of memory");
        }
        assert!(!classes.is_empty());
        Ok(self
            .boxes
            .iter()
            .map(|b| DetectedBox { bbox: *b, class_id: 0, confidence: 0.9 })
            .collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// How the box segmenter answers for one box index
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaskBehavior {
    /// Full box mask as the best candidate
    Rect,
    /// Mask one pixel narrower than the image
    WrongSize,
    /// Float mask, which the normalizer rejects
    Float,
    /// The model call fails
    Fail,
}

/// Segmenter whose best candidate is the prompt box itself
pub struct BoxSegmenter {
    pub behaviors: Vec<MaskBehavior>,
    size: Option<(u32, u32)>,
    calls: usize,
}

impl BoxSegmenter {
    pub fn new() -> Self {
        Self::with_behaviors(vec![])
    }

    /// Per-box behavior; boxes past the end use `Rect`
    pub fn with_behaviors(behaviors: Vec<MaskBehavior>) -> Self {
        Self { behaviors, size: None, calls: 0 }
    }
}

impl Segmenter for BoxSegmenter {
    fn set_image(&mut self, image: &RgbImage) -> anyhow::Result<()> {
        self.size = Some(image.dimensions());
        self.calls = 0;
        Ok(())
    }

    fn predict(&mut self, bbox: &BoundingBox) -> anyhow::Result<MaskCandidates> {
        let (width, height) = self.size.ok_or_else(|| anyhow::anyhow!("no image set"))?;
        let behavior = self.behaviors.get(self.calls).copied().unwrap_or(MaskBehavior::Rect);
        self.calls += 1;

        let (x0, y0, x1, y1) = bbox.pixel_bounds(width, height);
        let rect: Vec<bool> = (0..height)
            .flat_map(|y| (0..width).map(move |x| x >= x0 && x < x1 && y >= y0 && y < y1))
            .collect();

        let best = match behavior {
            MaskBehavior::Rect => RawMask::from_bools(width, height, rect),
            MaskBehavior::WrongSize => RawMask::from_u8(width - 1, height, vec![255; ((width - 1) * height) as usize]),
            MaskBehavior::Float => RawMask::new(width, height, MaskData::F32(vec![1.0; (width * height) as usize])),
            MaskBehavior::Fail => anyhow::bail!("segmenter crashed"),
        };
        let empty = RawMask::from_bools(width, height, vec![false; (width * height) as usize]);

        Ok(MaskCandidates {
            masks: vec![empty.clone(), best, empty],
            scores: vec![0.2, 0.95, 0.4],
        })
    }

    fn name(&self) -> &str {
        "box"
    }
}

/// Debug sink that remembers what it was given
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub images: Arc<Mutex<Vec<(usize, usize, (u32, u32))>>>,
    pub encoded: Arc<Mutex<Vec<(usize, usize, String)>>>,
}

impl DebugSink for RecordingSink {
    fn save_image(&mut self, batch_index: usize, detection_index: usize, image: &RgbImage) -> maskslice::Result<()> {
        self.images.lock().unwrap().push((batch_index, detection_index, image.dimensions()));
        Ok(())
    }

    fn save_encoded(&mut self, batch_index: usize, detection_index: usize, encoded: &str) -> maskslice::Result<()> {
        self.encoded.lock().unwrap().push((batch_index, detection_index, encoded.to_string()));
        Ok(())
    }
}

/// Pipeline over mock backends with a small canvas
pub fn mock_pipeline(detector: FixedDetector, segmenter: BoxSegmenter, target: u32) -> Pipeline {
    let config = SliceConfig {
        target_size: (target, target),
        ..SliceConfig::default()
    };
    Pipeline::new(Box::new(detector), Box::new(segmenter))
        .with_config(config)
        .expect("Test config is valid")
}

/// Decode a base64 PNG payload back into pixels
pub fn decode_payload(payload: &str) -> RgbImage {
    let bytes = codec::decode_base64(payload).expect("payload is base64");
    codec::decode_image(&bytes).expect("payload is an image")
}
