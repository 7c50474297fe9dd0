use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use fieldvision_common::frame::Frame;
use image::{ImageFormat, RgbImage};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::plan::{SamplingPlan, Selection};
use super::synthetic::SyntheticSampler;
use super::{ensure_output_dir, FrameSampler, SampleError};

/// Why real capture did not produce frames. Everything except `Output`
/// degrades to placeholder capture.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to spawn {0}: {1}")]
    Spawn(&'static str, String),
    #[error("ffprobe could not read source: {0}")]
    Inspect(String),
    #[error("source has no usable video stream")]
    NoVideoStream,
    #[error("ffmpeg decode failed: {0}")]
    Decode(String),
    #[error("no frames decoded")]
    Empty,
    #[error(transparent)]
    Output(#[from] SampleError),
}

/// Stream properties reported by ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub native_fps: f64,
}

#[derive(Debug, Deserialize)]
struct StreamList {
    #[serde(default)]
    streams: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    #[serde(default)]
    tags: StreamTags,
    #[serde(default)]
    side_data_list: Vec<StreamSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamSideData {
    rotation: Option<f64>,
}

impl StreamEntry {
    /// Display rotation in degrees. The display matrix wins over the legacy
    /// `rotate` tag.
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0)
    }
}

/// Whether a rotation in degrees is a quarter turn (90 or 270, either sign).
fn is_quarter_turn(degrees: f64) -> bool {
    let turns = (degrees / 90.0).round() as i64;
    turns.rem_euclid(2) == 1
}

/// Parse an ffprobe rate like `30000/1001` or `25`.
pub fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

impl StreamInfo {
    pub fn from_json(json: &[u8]) -> Result<Self, CaptureError> {
        let output: StreamList =
            serde_json::from_slice(json).map_err(|e| CaptureError::Inspect(e.to_string()))?;
        let stream = output.streams.into_iter().next().ok_or(CaptureError::NoVideoStream)?;
        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(CaptureError::NoVideoStream),
        };
        // ffmpeg autorotates on decode, so portrait phone clips come out h x w.
        let (width, height) = if is_quarter_turn(stream.rotation()) {
            (height, width)
        } else {
            (width, height)
        };
        // avg_frame_rate is 0/0 for some containers; r_frame_rate is the fallback.
        let native_fps = stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_rate)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
            .unwrap_or(0.0);
        Ok(Self {
            width,
            height,
            native_fps,
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Owns the decoder process; killed and reaped on drop so the handle is
/// released on every exit path.
struct Decoder {
    child: Child,
}

impl Drop for Decoder {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "ffmpeg already exited");
        }
        if let Err(e) = self.child.wait() {
            warn!(error = %e, "failed to reap ffmpeg");
        }
    }
}

/// Real capture through the `ffprobe`/`ffmpeg` command-line tools.
///
/// Decodes to raw RGB24 on a pipe and walks the decoded frame index in
/// process, keeping every `interval`-th frame until the plan's budget or
/// duration runs out.
#[derive(Debug, Clone, Default)]
pub struct FfmpegSampler {
    fallback: SyntheticSampler,
}

impl FfmpegSampler {
    pub fn new() -> Self {
        Self {
            fallback: SyntheticSampler::new(),
        }
    }

    /// Whether both ffmpeg and ffprobe run on this machine.
    pub fn is_available() -> bool {
        ["ffmpeg", "ffprobe"].iter().all(|tool| {
            match Command::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) if status.success() => {
                    debug!(tool, "tool is available");
                    true
                }
                Ok(_) => {
                    warn!(tool, "tool returned non-zero for -version");
                    false
                }
                Err(e) => {
                    debug!(tool, error = %e, "tool not found on PATH");
                    false
                }
            }
        })
    }

    pub fn inspect(source: &Path) -> Result<StreamInfo, CaptureError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_streams",
                "-of",
                "json",
            ])
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CaptureError::Spawn("ffprobe", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::Inspect(stderr.trim().to_string()));
        }
        StreamInfo::from_json(&output.stdout)
    }

    fn capture(
        &self,
        source: &Path,
        plan: &SamplingPlan,
        out_dir: &Path,
    ) -> Result<Vec<Frame>, CaptureError> {
        let stream = Self::inspect(source)?;
        let mut selector = plan.selector(stream.native_fps);
        debug!(
            source = %source.display(),
            width = stream.width,
            height = stream.height,
            native_fps = stream.native_fps,
            interval = selector.interval(),
            budget = plan.budget(),
            "inspected video"
        );

        let mut decoder = Decoder {
            child: Command::new("ffmpeg")
                .args(["-v", "error", "-nostdin", "-i"])
                .arg(source)
                .args(["-t", &plan.max_seconds().to_string()])
                .args(["-vsync", "passthrough"])
                .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| CaptureError::Spawn("ffmpeg", e.to_string()))?,
        };
        let stdout = decoder
            .child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Spawn("ffmpeg", "could not get stdout handle".into()))?;
        let mut reader = BufReader::new(stdout);

        let mut buf = vec![0u8; stream.frame_len()];
        let mut frames = Vec::new();
        let mut index: u64 = 0;
        loop {
            match reader.read_exact(&mut buf) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    if frames.is_empty() {
                        return Err(CaptureError::Decode(e.to_string()));
                    }
                    warn!(
                        source = %source.display(),
                        error = %e,
                        "decode stream broke off, keeping frames so far"
                    );
                    break;
                }
            }

            match selector.offer(index) {
                Selection::Done => break,
                Selection::Skip => {}
                Selection::Keep => {
                    let seq = selector.kept();
                    let path = out_dir.join(Frame::file_name(seq));
                    let image = RgbImage::from_raw(stream.width, stream.height, buf.clone())
                        .ok_or_else(|| CaptureError::Decode("short frame buffer".into()))?;
                    image
                        .save_with_format(&path, ImageFormat::Jpeg)
                        .map_err(|e| SampleError::WriteFrame {
                            path: path.display().to_string(),
                            reason: e.to_string(),
                        })?;
                    info!(path = %path.display(), index, "wrote frame");
                    frames.push(Frame::sampled(source, seq, path, selector.offset_of(index)));
                }
            }
            index += 1;
        }

        if frames.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(frames)
    }
}

impl FrameSampler for FfmpegSampler {
    fn sample(
        &self,
        source: &Path,
        plan: &SamplingPlan,
        out_dir: &Path,
    ) -> Result<Vec<Frame>, SampleError> {
        ensure_output_dir(out_dir)?;
        if plan.budget() == 0 {
            return Ok(Vec::new());
        }

        match self.capture(source, plan, out_dir) {
            Ok(frames) => {
                info!(source = %source.display(), frames = frames.len(), "captured frames");
                Ok(frames)
            }
            Err(CaptureError::Output(e)) => Err(e),
            Err(e) => {
                warn!(
                    source = %source.display(),
                    error = %e,
                    "real capture failed, falling back to placeholder frames"
                );
                self.fallback.sample(source, plan, out_dir)
            }
        }
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::PLACEHOLDER_SENTINEL;
    use crate::test_support::scratch_dir;

    #[test]
    fn parses_rates() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert_eq!(parse_rate("25"), Some(25.0));
        let ntsc = parse_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn stream_json_prefers_average_rate() {
        let json = br#"{"streams":[{"width":640,"height":480,
            "avg_frame_rate":"24/1","r_frame_rate":"48/1"}]}"#;
        let stream = StreamInfo::from_json(json).unwrap();
        assert_eq!(stream, StreamInfo { width: 640, height: 480, native_fps: 24.0 });
        assert_eq!(stream.frame_len(), 640 * 480 * 3);
    }

    #[test]
    fn stream_json_falls_back_to_real_rate() {
        let json = br#"{"streams":[{"width":320,"height":240,
            "avg_frame_rate":"0/0","r_frame_rate":"30/1"}]}"#;
        assert_eq!(StreamInfo::from_json(json).unwrap().native_fps, 30.0);
    }

    #[test]
    fn stream_json_swaps_dimensions_for_portrait_rotation() {
        let json = br#"{"streams":[{"width":1920,"height":1080,"avg_frame_rate":"30/1",
            "side_data_list":[{"side_data_type":"Display Matrix","rotation":-90}]}]}"#;
        let stream = StreamInfo::from_json(json).unwrap();
        assert_eq!((stream.width, stream.height), (1080, 1920));

        let tagged = br#"{"streams":[{"width":1920,"height":1080,"avg_frame_rate":"30/1",
            "tags":{"rotate":"270"}}]}"#;
        let stream = StreamInfo::from_json(tagged).unwrap();
        assert_eq!((stream.width, stream.height), (1080, 1920));
    }

    #[test]
    fn stream_json_keeps_dimensions_for_half_turn() {
        let json = br#"{"streams":[{"width":1920,"height":1080,"avg_frame_rate":"30/1",
            "side_data_list":[{"rotation":180}],"tags":{"rotate":"90"}}]}"#;
        let stream = StreamInfo::from_json(json).unwrap();
        assert_eq!((stream.width, stream.height), (1920, 1080));
    }

    #[test]
    fn quarter_turns() {
        assert!(is_quarter_turn(90.0));
        assert!(is_quarter_turn(-90.0));
        assert!(is_quarter_turn(270.0));
        assert!(!is_quarter_turn(0.0));
        assert!(!is_quarter_turn(180.0));
        assert!(!is_quarter_turn(-180.0));
    }

    #[test]
    fn stream_json_without_stream_is_rejected() {
        assert!(matches!(
            StreamInfo::from_json(br#"{"streams":[]}"#),
            Err(CaptureError::NoVideoStream)
        ));
        assert!(matches!(StreamInfo::from_json(b"{}"), Err(CaptureError::NoVideoStream)));
        assert!(matches!(StreamInfo::from_json(b"not json"), Err(CaptureError::Inspect(_))));
    }

    #[test]
    fn unreadable_source_falls_back_to_placeholders() {
        let dir = scratch_dir("ffmpeg-missing");
        let plan = SamplingPlan::new(1.0, 60.0).unwrap();
        let frames = FfmpegSampler::new()
            .sample(&dir.join("missing.mp4"), &plan, &dir.join("frames"))
            .unwrap();
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            let text = std::fs::read_to_string(frame.path().unwrap()).unwrap();
            assert!(text.contains(PLACEHOLDER_SENTINEL));
        }
    }

    #[test]
    fn corrupt_source_falls_back_to_placeholders() {
        let dir = scratch_dir("ffmpeg-corrupt");
        let video = dir.join("corrupt.mp4");
        std::fs::write(&video, b"this is not a video container").unwrap();
        let plan = SamplingPlan::new(1.0, 60.0).unwrap();
        let frames = FfmpegSampler::new()
            .sample(&video, &plan, &dir.join("frames"))
            .unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    #[ignore = "needs ffmpeg and ffprobe on PATH"]
    fn samples_synthetic_video_within_budget() {
        assert!(FfmpegSampler::is_available(), "ffmpeg/ffprobe not on PATH");
        let dir = scratch_dir("ffmpeg-testsrc");
        let video = dir.join("testsrc.mp4");
        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
            .arg("testsrc=duration=10:size=64x48:rate=30")
            .args(["-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
            .arg(&video)
            .status()
            .unwrap();
        assert!(status.success());

        let plan = SamplingPlan::new(1.0, 5.0).unwrap();
        let out = dir.join("frames");
        let frames = FfmpegSampler::new().sample(&video, &plan, &out).unwrap();

        assert!(!frames.is_empty());
        assert!(frames.len() <= 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.seq, i as u64 + 1);
            let bytes = std::fs::read(frame.path().unwrap()).unwrap();
            assert_eq!(&bytes[..2], &[0xFF, 0xD8], "expected a real JPEG");
        }
    }
}
