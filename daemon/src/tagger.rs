use fieldvision_common::config::Config;
use fieldvision_common::frame::Frame;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Trade/progress label attached to one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub file: String,
    pub trade: String,
    /// Completion as display text, e.g. `"40%"`.
    pub completion: String,
    pub notes: String,
}

impl Label {
    pub fn is_empty(&self) -> bool {
        self.trade.is_empty() && self.completion.is_empty() && self.notes.is_empty()
    }
}

pub trait Tagger: Send + Sync {
    fn tag(&self, frame: &Frame) -> Label;

    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Deterministic tags used in simulation runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTagger;

impl Tagger for MockTagger {
    fn tag(&self, frame: &Frame) -> Label {
        Label {
            file: frame.display_name(),
            trade: "mock-trade".into(),
            completion: "0%".into(),
            notes: "simulated".into(),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Live vision tagging. The remote call is not wired up yet: without an API
/// key it answers with mock tags, with a key it returns an empty label.
#[derive(Debug, Clone)]
pub struct VisionTagger {
    api_key: Option<String>,
    fallback: MockTagger,
}

impl VisionTagger {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            fallback: MockTagger,
        }
    }
}

impl Tagger for VisionTagger {
    fn tag(&self, frame: &Frame) -> Label {
        if self.api_key.is_none() {
            warn!(frame = frame.display_name(), "no vision API key, falling back to mock tags");
            return self.fallback.tag(frame);
        }
        warn!(
            frame = frame.display_name(),
            "live vision tagging not implemented, returning empty tags"
        );
        Label {
            file: frame.display_name(),
            ..Label::default()
        }
    }

    fn name(&self) -> &str {
        "vision"
    }
}

pub fn select_tagger(config: &Config) -> Box<dyn Tagger> {
    if config.uses_mock_tagger() {
        debug!("using mock tagger");
        Box::new(MockTagger)
    } else {
        debug!("using vision tagger");
        Box::new(VisionTagger::new(config.tagger.api_key.clone()))
    }
}

/// Tag every frame in order.
pub fn tag_frames(tagger: &dyn Tagger, frames: &[Frame]) -> Vec<Label> {
    frames
        .iter()
        .map(|frame| {
            let label = tagger.tag(frame);
            if label.is_empty() {
                debug!(frame = frame.display_name(), tagger = tagger.name(), "no tags for frame");
            }
            label
        })
        .collect()
}
