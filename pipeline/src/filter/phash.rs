use image::imageops::FilterType;
use image::ImageReader;
use std::io::Cursor;
use tracing::{debug, warn};

use fieldvision_common::frame::Frame;

use super::traits::FrameFilter;

/// Compute an aHash (average hash) for an encoded image at the given hash_size.
/// Returns a binary vector of length hash_size*hash_size, or None if decoding fails.
pub fn compute_ahash(bytes: &[u8], hash_size: u32) -> Option<Vec<bool>> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .decode()
        .ok()?;

    let gray = img
        .resize_exact(hash_size, hash_size, FilterType::Nearest)
        .to_luma8();

    let pixels: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
    let mean: f64 = pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64;
    let hash: Vec<bool> = pixels.iter().map(|&p| p as f64 > mean).collect();
    Some(hash)
}

/// Compute the hamming distance between two binary hashes.
pub fn hamming(a: &[bool], b: &[bool]) -> u32 {
    a.iter().zip(b.iter()).filter(|(a, b)| a != b).count() as u32
}

/// Near-duplicate filter for re-encoded copies of the same shot.
///
/// Keeps a frame only if its aHash is more than `threshold` bits away from
/// every frame accepted before it. Unlike the exact filter this also catches
/// frames that differ only by compression noise.
pub struct PerceptualDuplicateFilter {
    hash_size: u32,
    threshold: u32,
    accepted: Vec<Vec<bool>>,
}

impl PerceptualDuplicateFilter {
    pub fn new(hash_size: u32, threshold: u32) -> Self {
        Self {
            hash_size,
            threshold,
            accepted: Vec::new(),
        }
    }
}

impl FrameFilter for PerceptualDuplicateFilter {
    fn should_keep(&mut self, frame: &Frame, bytes: &[u8]) -> bool {
        let hash = match compute_ahash(bytes, self.hash_size) {
            Some(h) => h,
            None => {
                warn!(frame = frame.display_name(), "failed to decode frame for aHash, skipping");
                return false;
            }
        };

        let nearest = self.accepted.iter().map(|prev| hamming(prev, &hash)).min();
        let accepted = nearest.map_or(true, |d| d > self.threshold);
        debug!(
            frame = frame.display_name(),
            nearest,
            threshold = self.threshold,
            accepted,
            "aHash comparison"
        );
        if accepted {
            self.accepted.push(hash);
        }
        accepted
    }

    fn name(&self) -> &str {
        "perceptual-duplicate"
    }
}
