use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use fieldvision_common::frame::Frame;

use super::traits::FrameFilter;

/// SHA-256 over a frame's exact encoded bytes, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints accepted so far, in insertion order.
#[derive(Debug, Default)]
pub struct AcceptedSet {
    seen: HashSet<Fingerprint>,
    order: Vec<Fingerprint>,
}

impl AcceptedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `fingerprint`; returns `false` if it was already present.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        if self.seen.contains(&fingerprint) {
            return false;
        }
        self.seen.insert(fingerprint.clone());
        self.order.push(fingerprint);
        true
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fingerprint> {
        self.order.iter()
    }
}

/// Drops frames that are byte-identical to one accepted earlier in the run.
#[derive(Default)]
pub struct ExactDuplicateFilter {
    accepted: AcceptedSet,
}

impl ExactDuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn accepted(&self) -> &AcceptedSet {
        &self.accepted
    }
}

impl FrameFilter for ExactDuplicateFilter {
    fn should_keep(&mut self, frame: &Frame, bytes: &[u8]) -> bool {
        let fingerprint = Fingerprint::of(bytes);
        let accepted = self.accepted.insert(fingerprint.clone());
        debug!(
            frame = frame.display_name(),
            fingerprint = %fingerprint,
            accepted,
            "fingerprint check"
        );
        accepted
    }

    fn name(&self) -> &str {
        "exact-duplicate"
    }
}
