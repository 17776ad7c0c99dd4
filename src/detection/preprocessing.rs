use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;

/// Estimate a uniform background color from the image border
pub fn estimate_background(img: &RgbImage) -> Rgb<u8> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Rgb([255, 255, 255]);
    }

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for (x, y, pixel) in img.enumerate_pixels() {
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            for c in 0..3 {
                sum[c] += pixel[c] as u64;
            }
            count += 1;
        }
    }

    Rgb([
        (sum[0] / count) as u8,
        (sum[1] / count) as u8,
        (sum[2] / count) as u8,
    ])
}

/// Per-pixel distance from the background: the largest channel difference
pub fn contrast_map(img: &RgbImage, background: Rgb<u8>) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let diff = (0..3)
            .map(|c| (p[c] as i16 - background[c] as i16).unsigned_abs() as u8)
            .max()
            .unwrap_or(0);
        Luma([diff])
    })
}

/// Apply Gaussian blur to reduce noise (no-op for non-positive sigma)
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        gaussian_blur_f32(img, sigma)
    } else {
        img.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_from_border() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([250, 250, 250]));
        img.put_pixel(5, 5, Rgb([0, 0, 0]));
        assert_eq!(estimate_background(&img), Rgb([250, 250, 250]));
    }

    #[test]
    fn test_contrast_map() {
        let mut img = RgbImage::from_pixel(3, 1, Rgb([255, 255, 255]));
        img.put_pixel(1, 0, Rgb([255, 100, 200]));
        let map = contrast_map(&img, Rgb([255, 255, 255]));
        assert_eq!(map.as_raw(), &vec![0, 155, 0]);
    }
}
