use std::time::Duration;

use fieldvision_common::config::SamplingConfig;

/// How many frames to pull out of a video and how far into it to look.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPlan {
    fps: f64,
    max_seconds: f64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlanError {
    #[error("sampling fps must be > 0, got {0}")]
    Fps(f64),
    #[error("max sampling duration must be >= 0 seconds, got {0}")]
    MaxSeconds(f64),
}

impl SamplingPlan {
    pub fn new(fps: f64, max_seconds: f64) -> Result<Self, PlanError> {
        if !(fps > 0.0) || !fps.is_finite() {
            return Err(PlanError::Fps(fps));
        }
        if !(max_seconds >= 0.0) || !max_seconds.is_finite() {
            return Err(PlanError::MaxSeconds(max_seconds));
        }
        Ok(Self { fps, max_seconds })
    }

    pub fn from_config(config: &SamplingConfig) -> Result<Self, PlanError> {
        Self::new(config.fps, config.max_seconds)
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn max_seconds(&self) -> f64 {
        self.max_seconds
    }

    /// Upper bound on frames any sampler may return: `floor(fps * max_seconds)`.
    pub fn budget(&self) -> u64 {
        (self.fps * self.max_seconds).floor() as u64
    }

    /// Distance between kept frame indices for a video running at `native_fps`.
    ///
    /// Never less than 1. An unknown native rate samples every frame.
    pub fn interval(&self, native_fps: f64) -> u64 {
        if !native_fps.is_finite() || native_fps <= 0.0 {
            return 1;
        }
        ((native_fps / self.fps).round() as u64).max(1)
    }

    pub fn selector(&self, native_fps: f64) -> FrameSelector {
        FrameSelector {
            interval: self.interval(native_fps),
            budget: self.budget(),
            native_fps,
            max_seconds: self.max_seconds,
            kept: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Keep,
    Skip,
    /// Budget or duration exhausted; stop decoding.
    Done,
}

/// Walks a container's decoded frame indices and decides which ones to keep.
#[derive(Debug, Clone)]
pub struct FrameSelector {
    interval: u64,
    budget: u64,
    native_fps: f64,
    max_seconds: f64,
    kept: u64,
}

impl FrameSelector {
    /// Offer the frame at decoded position `index` (0-based).
    pub fn offer(&mut self, index: u64) -> Selection {
        if self.kept >= self.budget {
            return Selection::Done;
        }
        if self.native_fps > 0.0 && index as f64 / self.native_fps >= self.max_seconds {
            return Selection::Done;
        }
        if index % self.interval != 0 {
            return Selection::Skip;
        }
        self.kept += 1;
        Selection::Keep
    }

    pub fn kept(&self) -> u64 {
        self.kept
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Offset of decoded frame `index` from the start of the video.
    pub fn offset_of(&self, index: u64) -> Duration {
        if self.native_fps > 0.0 && self.native_fps.is_finite() {
            Duration::try_from_secs_f64(index as f64 / self.native_fps).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}
