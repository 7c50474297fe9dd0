use image::{DynamicImage, GrayImage, ImageReader, Luma};
use std::io::Cursor;
use tracing::{debug, warn};

use fieldvision_common::frame::Frame;

use super::traits::FrameFilter;

/// Decode encoded image bytes and compute their focus score.
/// Returns `None` if the bytes are not a decodable image.
pub fn focus_score(bytes: &[u8]) -> Option<f64> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .decode()
        .ok()?;
    Some(laplacian_variance(&bt601_gray(&img)))
}

/// Grayscale with BT.601 luma weights (0.299, 0.587, 0.114) in 14-bit fixed
/// point, rounded. `to_luma8` uses Rec.709 weights, which shifts scores on
/// colour photos.
pub fn bt601_gray(img: &DynamicImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;

    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT;
        Luma([luma as u8])
    })
}

// Mirror index into [0, n) without repeating the edge pixel.
fn reflect101(i: i64, n: i64) -> i64 {
    if n == 1 {
        return 0;
    }
    if i < 0 {
        -i
    } else if i >= n {
        2 * n - 2 - i
    } else {
        i
    }
}

/// Variance of the 4-neighbour Laplacian response over a grayscale image.
///
/// Sharp images have strong second-derivative energy at edges and score high;
/// flat or defocused images score near zero.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let px = |x: i64, y: i64| -> f64 {
        gray.get_pixel(reflect101(x, w) as u32, reflect101(y, h) as u32).0[0] as f64
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let lap = px(x, y - 1) + px(x - 1, y) + px(x + 1, y) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
        }
    }
    let n = (w * h) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Rejects frames whose focus score is below a threshold.
/// Frames that fail to decode count as maximally blurry.
pub struct SharpnessFilter {
    threshold: f64,
}

impl SharpnessFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl FrameFilter for SharpnessFilter {
    fn should_keep(&mut self, frame: &Frame, bytes: &[u8]) -> bool {
        let score = match focus_score(bytes) {
            Some(s) => s,
            None => {
                warn!(frame = frame.display_name(), "failed to decode frame, treating as blurry");
                return false;
            }
        };
        let accepted = score >= self.threshold;
        debug!(
            frame = frame.display_name(),
            score = format!("{:.2}", score),
            threshold = format!("{:.2}", self.threshold),
            accepted,
            "focus check"
        );
        accepted
    }

    fn name(&self) -> &str {
        "sharpness"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{checkerboard, encode_png, flat};
    use fieldvision_common::frame::FrameSource;

    fn frame() -> Frame {
        Frame::from_bytes(FrameSource::NativeImage, 1, Vec::new())
    }

    #[test]
    fn flat_image_has_zero_variance() {
        assert_eq!(laplacian_variance(&flat(32, 128)), 0.0);
    }

    #[test]
    fn checkerboard_scores_high() {
        assert!(laplacian_variance(&checkerboard(64, 8)) > 1000.0);
    }

    #[test]
    fn single_pixel_image_is_flat() {
        assert_eq!(laplacian_variance(&flat(1, 200)), 0.0);
    }

    #[test]
    fn grayscale_uses_bt601_weights() {
        let img = image::RgbImage::from_fn(5, 1, |x, _| {
            image::Rgb(match x {
                0 => [255, 0, 0],
                1 => [0, 255, 0],
                2 => [0, 0, 255],
                3 => [255, 255, 255],
                _ => [0, 0, 0],
            })
        });
        let gray = bt601_gray(&DynamicImage::ImageRgb8(img));
        let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, [76, 150, 29, 255, 0]);
    }

    #[test]
    fn gray_input_is_unchanged() {
        let gray = checkerboard(16, 4);
        assert_eq!(bt601_gray(&DynamicImage::ImageLuma8(gray.clone())), gray);
    }

    #[test]
    fn reflect101_mirrors_without_edge_repeat() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-1, 1), 0);
    }

    #[test]
    fn filter_rejects_flat_and_keeps_checkerboard() {
        let mut filter = SharpnessFilter::new(100.0);
        assert!(!filter.should_keep(&frame(), &encode_png(&flat(64, 90))));
        assert!(filter.should_keep(&frame(), &encode_png(&checkerboard(64, 8))));
    }

    #[test]
    fn undecodable_bytes_are_rejected() {
        let mut filter = SharpnessFilter::new(0.0);
        assert!(!filter.should_keep(&frame(), b"[SIM FRAME PLACEHOLDER] frame_001.jpg\n"));
        assert_eq!(focus_score(b""), None);
    }
}
