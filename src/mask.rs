//! Mask normalization: any supported mask representation becomes a hard
//! 0/255 single-channel buffer.

use image::{GrayImage, Luma};
use imageproc::rect::Rect;

use crate::error::{Result, SliceError};
use crate::models::{MaskData, RawMask};

pub const BACKGROUND: u8 = 0;
pub const FOREGROUND: u8 = 255;

/// Convert a raw mask into a freshly allocated, contiguous binary mask.
///
/// `bool` masks map true to 255. `u8` masks map any non-zero value to 255,
/// which collapses anti-aliased or multi-level masks. Other element types
/// are rejected with `UnsupportedMaskType`.
pub fn normalize(mask: &RawMask) -> Result<GrayImage> {
    let (width, height) = mask.dimensions();
    let w = width as usize;
    let h = height as usize;

    if mask.stride < w {
        return Err(SliceError::MaskLayout(format!(
            "row stride {} is smaller than width {}",
            mask.stride, width
        )));
    }

    let required = match h.checked_sub(1) {
        None => Some(0),
        Some(rows) => rows.checked_mul(mask.stride).and_then(|n| n.checked_add(w)),
    };
    let Some(required) = required else {
        return Err(SliceError::MaskLayout(format!(
            "{}x{} with stride {} overflows the address space",
            width, height, mask.stride
        )));
    };
    if mask.data.len() < required && mask.data.is_supported() {
        return Err(SliceError::MaskLayout(format!(
            "buffer holds {} elements, {}x{} with stride {} needs {}",
            mask.data.len(),
            width,
            height,
            mask.stride,
            required
        )));
    }

    let out = match &mask.data {
        MaskData::Bool(values) => compact_rows(values, w, h, mask.stride, |&v| v),
        MaskData::U8(values) => compact_rows(values, w, h, mask.stride, |&v| v > 0),
        other => return Err(SliceError::UnsupportedMaskType(other.type_name())),
    };

    GrayImage::from_raw(width, height, out)
        .ok_or_else(|| SliceError::MaskLayout(format!("cannot build {}x{} mask", width, height)))
}

/// Any non-zero sample becomes foreground.
pub fn binarize(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([to_level(mask.get_pixel(x, y)[0] > 0)])
    })
}

/// Tight rectangle around all foreground pixels, or `None` if there are none.
pub fn foreground_bounds(mask: &GrayImage) -> Option<Rect> {
    let (width, height) = mask.dimensions();
    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut has_content = false;

    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] > 0 {
            has_content = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !has_content {
        return None;
    }

    Some(Rect::at(min_x as i32, min_y as i32).of_size(max_x - min_x + 1, max_y - min_y + 1))
}

pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}

fn compact_rows<T>(
    values: &[T],
    width: usize,
    height: usize,
    stride: usize,
    is_foreground: impl Fn(&T) -> bool,
) -> Vec<u8> {
    // Callers have checked that `height` rows of `width` fit in `values`
    let mut out = Vec::with_capacity(width * height);
    for row in values.chunks(stride.max(1)).take(height) {
        out.extend(row[..width].iter().map(|v| to_level(is_foreground(v))));
    }
    out
}

fn to_level(foreground: bool) -> u8 {
    if foreground { FOREGROUND } else { BACKGROUND }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_mask() {
        let raw = RawMask::from_bools(2, 2, vec![true, false, false, true]);
        let mask = normalize(&raw).unwrap();
        assert_eq!(mask.as_raw(), &vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_u8_mask_collapses_levels() {
        let raw = RawMask::from_u8(4, 1, vec![0, 1, 128, 255]);
        let mask = normalize(&raw).unwrap();
        assert_eq!(mask.as_raw(), &vec![0, 255, 255, 255]);
    }

    #[test]
    fn test_binary_mask_is_unchanged() {
        let values = vec![0, 255, 255, 0, 0, 255];
        let raw = RawMask::from_u8(3, 2, values.clone());
        let once = normalize(&raw).unwrap();
        assert_eq!(once.as_raw(), &values);

        let again = normalize(&RawMask::from_u8(3, 2, once.into_raw())).unwrap();
        assert_eq!(again.as_raw(), &values);
    }

    #[test]
    fn test_unsupported_types() {
        let raw = RawMask::new(1, 1, MaskData::F32(vec![0.5]));
        match normalize(&raw) {
            Err(SliceError::UnsupportedMaskType(name)) => assert_eq!(name, "f32"),
            other => panic!("Expected UnsupportedMaskType, got {:?}", other),
        }

        let raw = RawMask::new(1, 1, MaskData::U16(vec![3]));
        assert!(matches!(normalize(&raw), Err(SliceError::UnsupportedMaskType("u16"))));
    }

    #[test]
    fn test_strided_input_is_compacted() {
        // 2x2 mask stored with one padding element per row
        let raw = RawMask::from_u8(2, 2, vec![1, 0, 9, 0, 1, 9]).with_stride(3);
        let mask = normalize(&raw).unwrap();
        assert_eq!(mask.dimensions(), (2, 2));
        assert_eq!(mask.as_raw(), &vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let raw = RawMask::from_u8(3, 3, vec![0; 5]);
        assert!(matches!(normalize(&raw), Err(SliceError::MaskLayout(_))));

        let raw = RawMask::from_u8(3, 1, vec![0; 3]).with_stride(2);
        assert!(matches!(normalize(&raw), Err(SliceError::MaskLayout(_))));
    }

    #[test]
    fn test_huge_stride_rejected() {
        let raw = RawMask::from_u8(2, 3, vec![1; 6]).with_stride(usize::MAX);
        assert!(matches!(normalize(&raw), Err(SliceError::MaskLayout(_))));

        // A single row never touches the stride
        let raw = RawMask::from_u8(2, 1, vec![1, 0]).with_stride(usize::MAX);
        assert_eq!(normalize(&raw).unwrap().as_raw(), &vec![255, 0]);
    }

    #[test]
    fn test_foreground_bounds() {
        let mut mask = GrayImage::new(10, 8);
        assert!(foreground_bounds(&mask).is_none());

        mask.put_pixel(2, 3, Luma([255]));
        mask.put_pixel(6, 5, Luma([255]));
        let rect = foreground_bounds(&mask).unwrap();
        assert_eq!((rect.left(), rect.top()), (2, 3));
        assert_eq!((rect.width(), rect.height()), (5, 3));
        assert_eq!(foreground_count(&mask), 2);
    }

    #[test]
    fn test_binarize() {
        let mask = GrayImage::from_raw(3, 1, vec![0, 7, 255]).unwrap();
        assert_eq!(binarize(&mask).as_raw(), &vec![0, 255, 255]);
    }
}
