use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a frame came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// Sampled from the video at this path.
    Video(PathBuf),
    /// A still image that was already on disk.
    NativeImage,
}

/// The encoded image behind a frame — either a file on disk or an in-memory buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameContent {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// A single extracted or supplied still image.
///
/// Frames are never mutated after creation; filters only decide whether a
/// frame is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub source: FrameSource,
    /// Position within its source (1-based for sampled frames).
    pub seq: u64,
    pub content: FrameContent,
    /// Offset from the start of the source video. Zero for native images.
    pub captured_at: Duration,
}

/// Zero-padded width of the index in sampled frame file names.
pub const FRAME_INDEX_WIDTH: usize = 3;

impl Frame {
    /// A frame sampled from `video` and written to `path`.
    pub fn sampled(video: &Path, seq: u64, path: PathBuf, captured_at: Duration) -> Self {
        Self {
            source: FrameSource::Video(video.to_path_buf()),
            seq,
            content: FrameContent::File(path),
            captured_at,
        }
    }

    /// A still image discovered on disk.
    pub fn native(seq: u64, path: PathBuf) -> Self {
        Self {
            source: FrameSource::NativeImage,
            seq,
            content: FrameContent::File(path),
            captured_at: Duration::ZERO,
        }
    }

    /// An in-memory frame, mostly useful for callers that already hold the bytes.
    pub fn from_bytes(source: FrameSource, seq: u64, bytes: Vec<u8>) -> Self {
        Self {
            source,
            seq,
            content: FrameContent::Bytes(bytes),
            captured_at: Duration::ZERO,
        }
    }

    /// File name for the `index`-th sampled frame, e.g. `frame_007.jpg`.
    pub fn file_name(index: u64) -> String {
        format!("frame_{index:0width$}.jpg", width = FRAME_INDEX_WIDTH)
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            FrameContent::File(path) => Some(path),
            FrameContent::Bytes(_) => None,
        }
    }

    /// Human-readable name for logs and reports.
    pub fn display_name(&self) -> String {
        match &self.content {
            FrameContent::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            FrameContent::Bytes(_) => Self::file_name(self.seq),
        }
    }

    /// Reads the encoded bytes of the frame.
    pub fn read_bytes(&self) -> Result<Vec<u8>, FrameError> {
        match &self.content {
            FrameContent::File(path) => std::fs::read(path).map_err(|e| FrameError::Read {
                path: path.display().to_string(),
                source: e,
            }),
            FrameContent::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("failed to read frame {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_zero_padded() {
        assert_eq!(Frame::file_name(1), "frame_001.jpg");
        assert_eq!(Frame::file_name(42), "frame_042.jpg");
        assert_eq!(Frame::file_name(1234), "frame_1234.jpg");
    }

    #[test]
    fn sampled_frame_keeps_source() {
        let frame = Frame::sampled(
            Path::new("site/walkthrough.mp4"),
            3,
            PathBuf::from("site/frames/walkthrough/frame_003.jpg"),
            Duration::from_secs(2),
        );
        assert_eq!(frame.source, FrameSource::Video(PathBuf::from("site/walkthrough.mp4")));
        assert_eq!(frame.display_name(), "frame_003.jpg");
        assert_eq!(frame.captured_at, Duration::from_secs(2));
    }

    #[test]
    fn bytes_frame_reads_back() {
        let frame = Frame::from_bytes(FrameSource::NativeImage, 7, vec![0xFF, 0xD8]);
        assert_eq!(frame.read_bytes().unwrap(), vec![0xFF, 0xD8]);
        assert!(frame.path().is_none());
        assert_eq!(frame.display_name(), "frame_007.jpg");
    }

    #[test]
    fn missing_file_is_read_error() {
        let frame = Frame::native(1, PathBuf::from("/definitely/not/here.jpg"));
        assert!(matches!(frame.read_bytes(), Err(FrameError::Read { .. })));
    }
}
