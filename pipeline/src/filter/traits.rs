use fieldvision_common::frame::Frame;

/// One stage of the quality filter.
///
/// Implementations receive each candidate frame together with its encoded
/// bytes and decide whether it survives this stage. Stages are stateful
/// (duplicate filters remember what they accepted), so a fresh set is built
/// for every filtering run.
pub trait FrameFilter: Send {
    /// Returns `true` to keep the frame, `false` to drop it.
    fn should_keep(&mut self, frame: &Frame, bytes: &[u8]) -> bool;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
