//! Frame acquisition and quality filtering for site media folders.
//!
//! A [`Pipeline`] samples every video in a folder into still frames, adds the
//! photos already in the folder, and drops blurry and duplicate frames.

pub mod filter;
pub mod sampler;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::{Path, PathBuf};

use fieldvision_common::config::{Config, DepPolicy, FilterConfig, SamplingConfig};
use fieldvision_common::frame::Frame;
use tracing::info;

pub use filter::QualityFilter;
pub use sampler::{select_sampler, FrameSampler, SampleError, SamplingPlan};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "avi", "mkv"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Everything the pipeline reads from configuration, passed in explicitly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub simulation: bool,
    pub dep_policy: DepPolicy,
    pub sampling: SamplingConfig,
    pub filter: FilterConfig,
    pub frames_dir: String,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            simulation: config.simulation,
            dep_policy: config.dep_policy,
            sampling: config.sampling.clone(),
            filter: config.filter.clone(),
            frames_dir: config.watch.frames_dir.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to list folder {path}: {source}")]
    ReadFolder {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Plan(#[from] sampler::PlanError),
    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// What a folder run produced.
#[derive(Debug, Clone)]
pub struct FolderOutcome {
    pub videos: usize,
    pub candidates: usize,
    pub accepted: Vec<Frame>,
}

#[derive(Debug, Default, PartialEq)]
pub struct FolderMedia {
    pub videos: Vec<PathBuf>,
    pub images: Vec<PathBuf>,
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

pub fn is_video(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

pub fn is_image(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Videos and still images directly inside `folder`, each sorted by name.
pub fn collect_media(folder: &Path) -> Result<FolderMedia, PipelineError> {
    let entries = std::fs::read_dir(folder).map_err(|e| PipelineError::ReadFolder {
        path: folder.display().to_string(),
        source: e,
    })?;

    let mut media = FolderMedia::default();
    for entry in entries {
        let path = entry
            .map_err(|e| PipelineError::ReadFolder {
                path: folder.display().to_string(),
                source: e,
            })?
            .path();
        if !path.is_file() {
            continue;
        }
        if is_video(&path) {
            media.videos.push(path);
        } else if is_image(&path) {
            media.images.push(path);
        }
    }
    media.videos.sort();
    media.images.sort();
    Ok(media)
}

pub struct Pipeline {
    config: PipelineConfig,
    plan: SamplingPlan,
    sampler: Box<dyn FrameSampler>,
    filter: QualityFilter,
}

impl Pipeline {
    /// Builds a pipeline, probing once for the real video backend.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let sampler = select_sampler(config.simulation, config.dep_policy);
        Self::with_sampler(config, sampler)
    }

    pub fn with_sampler(
        config: PipelineConfig,
        sampler: Box<dyn FrameSampler>,
    ) -> Result<Self, PipelineError> {
        let plan = SamplingPlan::from_config(&config.sampling)?;
        let filter = QualityFilter::new(config.filter.clone());
        Ok(Self {
            config,
            plan,
            sampler,
            filter,
        })
    }

    /// Where frames sampled from `video` inside `folder` are written.
    pub fn frames_dir_for(&self, folder: &Path, video: &Path) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".into());
        folder.join(&self.config.frames_dir).join(stem)
    }

    /// Sample every video in `folder`, append the folder's still images and
    /// filter the lot.
    pub fn process_folder(&self, folder: &Path) -> Result<FolderOutcome, PipelineError> {
        let media = collect_media(folder)?;
        info!(
            folder = %folder.display(),
            videos = media.videos.len(),
            images = media.images.len(),
            sampler = self.sampler.name(),
            "processing folder"
        );

        let mut candidates = Vec::new();
        for video in &media.videos {
            let out_dir = self.frames_dir_for(folder, video);
            candidates.extend(self.sampler.sample(video, &self.plan, &out_dir)?);
        }
        for (i, image) in media.images.iter().enumerate() {
            candidates.push(Frame::native(i as u64 + 1, image.clone()));
        }

        let accepted = self.filter.filter(&candidates);
        Ok(FolderOutcome {
            videos: media.videos.len(),
            candidates: candidates.len(),
            accepted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SyntheticSampler;
    use crate::test_support::{checkerboard, encode_png, flat, scratch_dir};
    use fieldvision_common::frame::FrameSource;

    fn config() -> PipelineConfig {
        PipelineConfig::from(&Config::default())
    }

    fn pipeline() -> Pipeline {
        Pipeline::with_sampler(config(), Box::new(SyntheticSampler::new())).unwrap()
    }

    #[test]
    fn recognises_media_extensions() {
        assert!(is_video(Path::new("walk.MP4")));
        assert!(is_video(Path::new("walk.mov")));
        assert!(is_image(Path::new("slab.jpeg")));
        assert!(is_image(Path::new("slab.PNG")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_video(Path::new("noext")));
    }

    #[test]
    fn collects_sorted_media_and_ignores_subdirs() {
        let dir = scratch_dir("pipeline-collect");
        for name in ["b.jpg", "a.jpg", "z.mp4", "c.mov", "notes.txt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        std::fs::create_dir_all(dir.join("frames").join("z")).unwrap();
        std::fs::write(dir.join("frames").join("z").join("frame_001.jpg"), b"x").unwrap();

        let media = collect_media(&dir).unwrap();
        assert_eq!(media.videos, vec![dir.join("c.mov"), dir.join("z.mp4")]);
        assert_eq!(media.images, vec![dir.join("a.jpg"), dir.join("b.jpg")]);
    }

    #[test]
    fn missing_folder_is_an_error() {
        let err = collect_media(Path::new("/no/such/site/folder")).unwrap_err();
        assert!(matches!(err, PipelineError::ReadFolder { .. }));
    }

    #[test]
    fn simulated_folder_keeps_only_real_photos() {
        let dir = scratch_dir("pipeline-sim");
        std::fs::write(dir.join("walkthrough.mp4"), b"not really a video").unwrap();
        std::fs::write(dir.join("01-slab.png"), encode_png(&checkerboard(64, 8))).unwrap();
        std::fs::write(dir.join("02-slab-copy.png"), encode_png(&checkerboard(64, 8))).unwrap();
        std::fs::write(dir.join("03-fog.png"), encode_png(&flat(64, 200))).unwrap();

        let outcome = pipeline().process_folder(&dir).unwrap();
        assert_eq!(outcome.videos, 1);
        // Three placeholders plus three photos.
        assert_eq!(outcome.candidates, 6);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].source, FrameSource::NativeImage);
        assert_eq!(outcome.accepted[0].path(), Some(dir.join("01-slab.png").as_path()));
        assert!(dir.join("frames").join("walkthrough").join("frame_001.jpg").exists());
    }

    #[test]
    fn each_video_gets_its_own_frames_dir() {
        let dir = scratch_dir("pipeline-two-videos");
        std::fs::write(dir.join("a.mp4"), b"x").unwrap();
        std::fs::write(dir.join("b.mp4"), b"x").unwrap();
        let p = pipeline();
        let outcome = p.process_folder(&dir).unwrap();
        assert_eq!(outcome.candidates, 6);
        assert!(p.frames_dir_for(&dir, &dir.join("a.mp4")).join("frame_003.jpg").exists());
        assert!(p.frames_dir_for(&dir, &dir.join("b.mp4")).join("frame_003.jpg").exists());
    }

    #[test]
    fn image_only_folder_skips_sampling() {
        let dir = scratch_dir("pipeline-images");
        std::fs::write(dir.join("a.png"), encode_png(&checkerboard(32, 4))).unwrap();
        let outcome = pipeline().process_folder(&dir).unwrap();
        assert_eq!(outcome.videos, 0);
        assert_eq!(outcome.accepted.len(), 1);
        assert!(!dir.join("frames").exists());
    }

    #[test]
    fn invalid_sampling_config_is_rejected() {
        let mut cfg = config();
        cfg.sampling.fps = 0.0;
        let result = Pipeline::with_sampler(cfg, Box::new(SyntheticSampler::new()));
        assert!(matches!(result, Err(PipelineError::Plan(_))));
    }
}
