use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Run without external tools: placeholder frames and mock tags.
    #[serde(default = "default_simulation")]
    pub simulation: bool,
    #[serde(default)]
    pub dep_policy: DepPolicy,
    #[serde(default = "default_dev_profile")]
    pub dev_profile: String,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub tagger: TaggerConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which optional native tools the pipeline is allowed to reach for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepPolicy {
    /// Never look for ffmpeg; always use placeholder capture.
    #[default]
    Minimal,
    /// Use ffmpeg when it is installed.
    Full,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Byte-identical frames only (SHA-256 over encoded bytes).
    #[default]
    Exact,
    /// Average-hash Hamming distance against every accepted frame.
    Perceptual,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_watch_path")]
    pub path: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Subdirectory of each processed folder that receives sampled frames.
    #[serde(default = "default_frames_dir")]
    pub frames_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_max_seconds")]
    pub max_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_blur_threshold")]
    pub blur_threshold: f64,
    #[serde(default)]
    pub dedup: DedupMode,
    #[serde(default = "default_phash_hash_size")]
    pub phash_hash_size: u32,
    #[serde(default = "default_phash_threshold")]
    pub phash_threshold: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaggerConfig {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub token: Option<String>,
}

/// Optional `trade,date` CSV checked against each folder's tags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            path: default_watch_path(),
            log_dir: default_log_dir(),
            frames_dir: default_frames_dir(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            max_seconds: default_max_seconds(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blur_threshold: default_blur_threshold(),
            dedup: DedupMode::default(),
            phash_hash_size: default_phash_hash_size(),
            phash_threshold: default_phash_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: default_simulation(),
            dep_policy: DepPolicy::default(),
            dev_profile: default_dev_profile(),
            watch: WatchConfig::default(),
            sampling: SamplingConfig::default(),
            filter: FilterConfig::default(),
            tagger: TaggerConfig::default(),
            push: PushConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// The handful of settings worth printing when the daemon starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSummary {
    pub simulation: bool,
    pub dep_policy: DepPolicy,
    pub dev_profile: String,
    pub watch_path: PathBuf,
    pub fps: f64,
    pub max_seconds: f64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sampling.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sampling.fps must be > 0, got {}",
                self.sampling.fps
            )));
        }
        if !(self.sampling.max_seconds >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sampling.max_seconds must be >= 0, got {}",
                self.sampling.max_seconds
            )));
        }
        if self.filter.phash_hash_size == 0 {
            return Err(ConfigError::Invalid("filter.phash_hash_size must be > 0".into()));
        }
        if self.watch.frames_dir.is_empty() {
            return Err(ConfigError::Invalid("watch.frames_dir must not be empty".into()));
        }
        Ok(())
    }

    /// Mock tagging applies in simulation mode and under the simulation-heavy profile.
    pub fn uses_mock_tagger(&self) -> bool {
        self.simulation || self.dev_profile == "simulation-heavy"
    }

    pub fn mode_summary(&self) -> ModeSummary {
        ModeSummary {
            simulation: self.simulation,
            dep_policy: self.dep_policy,
            dev_profile: self.dev_profile.clone(),
            watch_path: self.watch.path.clone(),
            fps: self.sampling.fps,
            max_seconds: self.sampling.max_seconds,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_simulation() -> bool {
    true
}
fn default_dev_profile() -> String {
    "simulation-heavy".into()
}
fn default_watch_path() -> PathBuf {
    PathBuf::from("./FieldVision")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_frames_dir() -> String {
    "frames".into()
}
fn default_fps() -> f64 {
    1.0
}
fn default_max_seconds() -> f64 {
    60.0
}
fn default_blur_threshold() -> f64 {
    100.0
}
fn default_phash_hash_size() -> u32 {
    16
}
fn default_phash_threshold() -> u32 {
    26
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.simulation);
        assert_eq!(config.dep_policy, DepPolicy::Minimal);
        assert_eq!(config.sampling.fps, 1.0);
        assert_eq!(config.sampling.max_seconds, 60.0);
        assert_eq!(config.filter.blur_threshold, 100.0);
        assert_eq!(config.filter.dedup, DedupMode::Exact);
        assert_eq!(config.watch.frames_dir, "frames");
        assert_eq!(config.logging.level, "info");
        assert!(config.push.token.is_none());
        assert!(config.schedule.path.is_none());
    }

    #[test]
    fn parses_full_file() {
        let config = Config::parse(
            r#"
            simulation = false
            dep_policy = "full"
            dev_profile = "live"

            [watch]
            path = "/srv/site-media"
            log_dir = "/srv/logs"

            [sampling]
            fps = 2.0
            max_seconds = 5

            [filter]
            blur_threshold = 42.5
            dedup = "perceptual"

            [tagger]
            api_key = "sk-test"

            [push]
            token = "bt-token"

            [schedule]
            path = "/srv/schedule.csv"
            "#,
        )
        .unwrap();
        assert!(!config.simulation);
        assert_eq!(config.dep_policy, DepPolicy::Full);
        assert_eq!(config.watch.path, PathBuf::from("/srv/site-media"));
        assert_eq!(config.sampling.fps, 2.0);
        assert_eq!(config.sampling.max_seconds, 5.0);
        assert_eq!(config.filter.blur_threshold, 42.5);
        assert_eq!(config.filter.dedup, DedupMode::Perceptual);
        assert_eq!(config.tagger.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.push.token.as_deref(), Some("bt-token"));
        assert_eq!(config.schedule.path, Some(PathBuf::from("/srv/schedule.csv")));
        assert!(!config.uses_mock_tagger());
    }

    #[test]
    fn rejects_non_positive_fps() {
        let err = Config::parse("[sampling]\nfps = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_dep_policy() {
        let err = Config::parse("dep_policy = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn mode_summary_reflects_config() {
        let summary = Config::default().mode_summary();
        assert!(summary.simulation);
        assert_eq!(summary.dep_policy, DepPolicy::Minimal);
        assert_eq!(summary.dev_profile, "simulation-heavy");
        assert_eq!(summary.watch_path, PathBuf::from("./FieldVision"));
    }

    #[test]
    fn simulation_heavy_profile_forces_mock_tagger() {
        let mut config = Config::default();
        config.simulation = false;
        assert!(config.uses_mock_tagger());
        config.dev_profile = "live".into();
        assert!(!config.uses_mock_tagger());
    }
}
