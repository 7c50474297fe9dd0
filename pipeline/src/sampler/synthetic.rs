use std::path::Path;
use std::time::Duration;

use fieldvision_common::frame::Frame;
use tracing::info;

use super::plan::SamplingPlan;
use super::{ensure_output_dir, FrameSampler, SampleError};

/// Marker written into every placeholder frame.
pub const PLACEHOLDER_SENTINEL: &str = "[SIM FRAME PLACEHOLDER]";

/// Number of placeholder frames produced per video (capped by the plan's budget).
pub const PLACEHOLDER_FRAMES: u64 = 3;

/// Stand-in capture used in simulation runs and whenever real decoding is
/// unavailable. Writes small text files, not images, so the quality filter
/// rejects them as undecodable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticSampler;

impl SyntheticSampler {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSampler for SyntheticSampler {
    fn sample(
        &self,
        source: &Path,
        plan: &SamplingPlan,
        out_dir: &Path,
    ) -> Result<Vec<Frame>, SampleError> {
        ensure_output_dir(out_dir)?;

        let count = PLACEHOLDER_FRAMES.min(plan.budget());
        let mut frames = Vec::with_capacity(count as usize);
        for seq in 1..=count {
            let name = Frame::file_name(seq);
            let path = out_dir.join(&name);
            std::fs::write(&path, format!("{PLACEHOLDER_SENTINEL} {name}\n")).map_err(|e| {
                SampleError::WriteFrame {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            info!(path = %path.display(), "generated placeholder frame");
            let offset = Duration::try_from_secs_f64((seq - 1) as f64 / plan.fps())
                .unwrap_or(Duration::MAX);
            frames.push(Frame::sampled(source, seq, path, offset));
        }
        Ok(frames)
    }

    fn name(&self) -> &str {
        "synthetic"
    }

    fn is_synthetic(&self) -> bool {
        true
    }
}
