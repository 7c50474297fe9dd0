pub mod ffmpeg;
pub mod plan;
pub mod synthetic;

use std::path::Path;

use fieldvision_common::config::DepPolicy;
use fieldvision_common::frame::Frame;
use tracing::{info, warn};

pub use ffmpeg::FfmpegSampler;
pub use plan::{FrameSelector, PlanError, SamplingPlan, Selection};
pub use synthetic::{SyntheticSampler, PLACEHOLDER_FRAMES, PLACEHOLDER_SENTINEL};

/// Turns a video into an ordered sequence of frames written under `out_dir`.
///
/// Implementations never fail because of the video itself; an unreadable
/// source degrades to placeholder frames. Only output directory problems
/// surface as errors.
pub trait FrameSampler: Send + Sync {
    fn sample(
        &self,
        source: &Path,
        plan: &SamplingPlan,
        out_dir: &Path,
    ) -> Result<Vec<Frame>, SampleError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// Whether every frame this sampler produces is a placeholder.
    fn is_synthetic(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write frame {path}: {reason}")]
    WriteFrame { path: String, reason: String },
}

pub(crate) fn ensure_output_dir(out_dir: &Path) -> Result<(), SampleError> {
    std::fs::create_dir_all(out_dir).map_err(|e| SampleError::OutputDir {
        path: out_dir.display().to_string(),
        source: e,
    })
}

/// Check the environment once and pick the sampler for this process.
pub fn select_sampler(simulation: bool, dep_policy: DepPolicy) -> Box<dyn FrameSampler> {
    if simulation || dep_policy == DepPolicy::Minimal {
        info!(simulation, ?dep_policy, "using synthetic frame sampler");
        return Box::new(SyntheticSampler::new());
    }

    if FfmpegSampler::is_available() {
        info!("ffmpeg and ffprobe available, using real frame sampler");
        Box::new(FfmpegSampler::new())
    } else {
        warn!("ffmpeg/ffprobe not found on PATH; all video capture will be synthetic");
        Box::new(SyntheticSampler::new())
    }
}
