pub mod fingerprint;
pub mod focus;
pub mod phash;
pub mod traits;

use fieldvision_common::config::{DedupMode, FilterConfig};
use fieldvision_common::frame::Frame;
use tracing::{debug, info, warn};

use fingerprint::ExactDuplicateFilter;
use focus::SharpnessFilter;
use phash::PerceptualDuplicateFilter;
use traits::FrameFilter;

/// Sharpness rejection followed by duplicate rejection.
///
/// `filter` returns an order-preserving subsequence of its input. Every call
/// starts from empty duplicate state, so the result depends only on the
/// input frames and the configuration.
#[derive(Debug, Clone)]
pub struct QualityFilter {
    config: FilterConfig,
}

impl QualityFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Exact-duplicate filtering with the given blur threshold.
    #[cfg(test)]
    pub(crate) fn with_threshold(blur_threshold: f64) -> Self {
        Self::new(FilterConfig {
            blur_threshold,
            ..FilterConfig::default()
        })
    }

    fn stages(&self) -> Vec<Box<dyn FrameFilter>> {
        let dedup: Box<dyn FrameFilter> = match self.config.dedup {
            DedupMode::Exact => Box::new(ExactDuplicateFilter::new()),
            DedupMode::Perceptual => Box::new(PerceptualDuplicateFilter::new(
                self.config.phash_hash_size,
                self.config.phash_threshold,
            )),
        };
        vec![Box::new(SharpnessFilter::new(self.config.blur_threshold)), dedup]
    }

    pub fn filter(&self, frames: &[Frame]) -> Vec<Frame> {
        let mut stages = self.stages();
        let mut kept = Vec::new();

        'frames: for frame in frames {
            let bytes = match frame.read_bytes() {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "unreadable frame, rejecting");
                    continue;
                }
            };
            for stage in stages.iter_mut() {
                if !stage.should_keep(frame, &bytes) {
                    debug!(frame = frame.display_name(), stage = stage.name(), "frame rejected");
                    continue 'frames;
                }
            }
            kept.push(frame.clone());
        }

        info!(candidates = frames.len(), kept = kept.len(), "filtered frames");
        kept
    }
}
