use serde::{Deserialize, Serialize};

/// Axis-aligned box in image pixel space, as produced by a detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Integer pixel range covered by the box, clamped to an image of the given size.
    /// Returns (x0, y0, x1, y1) with exclusive upper bounds.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let clamp = |v: f32, max: u32| -> u32 {
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as u32).min(max)
            }
        };
        let x0 = clamp(self.x_min.floor(), width);
        let y0 = clamp(self.y_min.floor(), height);
        let x1 = clamp(self.x_max.ceil(), width).max(x0);
        let y1 = clamp(self.y_max.ceil(), height).max(y0);
        (x0, y0, x1, y1)
    }
}

/// One detector output: box, index into the class vocabulary, and confidence
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBox {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub confidence: f32,
}

/// Element buffer of a raw mask as handed over by a segmenter
#[derive(Debug, Clone, PartialEq)]
pub enum MaskData {
    Bool(Vec<bool>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl MaskData {
    pub fn len(&self) -> usize {
        match self {
            MaskData::Bool(v) => v.len(),
            MaskData::U8(v) => v.len(),
            MaskData::U16(v) => v.len(),
            MaskData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element types the normalizer accepts
    pub fn is_supported(&self) -> bool {
        matches!(self, MaskData::Bool(_) | MaskData::U8(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            MaskData::Bool(_) => "bool",
            MaskData::U8(_) => "u8",
            MaskData::U16(_) => "u16",
            MaskData::F32(_) => "f32",
        }
    }
}

/// A mask before normalization. Rows start every `stride` elements.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMask {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub data: MaskData,
}

impl RawMask {
    /// Tightly packed mask (stride == width)
    pub fn new(width: u32, height: u32, data: MaskData) -> Self {
        Self {
            width,
            height,
            stride: width as usize,
            data,
        }
    }

    pub fn from_bools(width: u32, height: u32, values: Vec<bool>) -> Self {
        Self::new(width, height, MaskData::Bool(values))
    }

    pub fn from_u8(width: u32, height: u32, values: Vec<u8>) -> Self {
        Self::new(width, height, MaskData::U8(values))
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Candidate masks returned by a multi-mask prediction for a single box
#[derive(Debug, Clone)]
pub struct MaskCandidates {
    pub masks: Vec<RawMask>,
    pub scores: Vec<f32>,
}

impl MaskCandidates {
    /// Index of the highest score; the first one wins ties.
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &score) in self.scores.iter().enumerate() {
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ if score.is_nan() => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(scores: Vec<f32>) -> MaskCandidates {
        let masks = scores.iter().map(|_| RawMask::from_u8(1, 1, vec![1])).collect();
        MaskCandidates { masks, scores }
    }

    #[test]
    fn test_best_index_first_occurrence_wins() {
        assert_eq!(candidates(vec![0.2, 0.9, 0.9, 0.1]).best_index(), Some(1));
        assert_eq!(candidates(vec![0.5]).best_index(), Some(0));
        assert_eq!(candidates(vec![]).best_index(), None);
    }

    #[test]
    fn test_best_index_skips_nan() {
        assert_eq!(candidates(vec![f32::NAN, 0.3]).best_index(), Some(1));
    }

    #[test]
    fn test_pixel_bounds_clamped() {
        let bbox = BoundingBox::new(-5.0, 2.4, 120.2, 50.0);
        assert_eq!(bbox.pixel_bounds(100, 40), (0, 2, 100, 40));
    }
}
