use std::path::{Path, PathBuf};
use std::process::Command;

use crate::foundation::config::EngineConfig;
use crate::foundation::error::{EditorError, EditorResult};

/// Metadata of the first video stream of a media file.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Average frame rate; `0.0` when the container does not report one.
    pub fps: f64,
    /// Stream time base as `(num, den)`.
    pub time_base: (u32, u32),
    /// Duration in seconds; `0.0` when unknown.
    pub duration: f64,
    pub has_audio: bool,
}

impl MediaInfo {
    /// Bytes in one decoded RGBA8 frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Spacing between frames in seconds, falling back to one millisecond.
    pub fn frame_step(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            1.0 / self.fps
        } else {
            0.001
        }
    }
}

/// Locations of the external `ffmpeg` and `ffprobe` executables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegTools {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl From<&EngineConfig> for FfmpegTools {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            ffmpeg: cfg.ffmpeg_bin.clone(),
            ffprobe: cfg.ffprobe_bin.clone(),
        }
    }
}

impl FfmpegTools {
    /// Return `true` when both executables run.
    pub fn available(&self) -> bool {
        runs(&self.ffmpeg) && runs(&self.ffprobe)
    }

    /// Probe `path` with `ffprobe` and describe its first video stream.
    #[tracing::instrument(skip(self))]
    pub fn probe(&self, path: &Path) -> EditorResult<MediaInfo> {
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            avg_frame_rate: Option<String>,
            r_frame_rate: Option<String>,
            time_base: Option<String>,
            duration: Option<String>,
            duration_ts: Option<u64>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            #[serde(default)]
            streams: Vec<ProbeStream>,
            format: Option<ProbeFormat>,
        }

        if !path.is_file() {
            return Err(EditorError::source_open(path, "file not found"));
        }

        let out = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| EditorError::source_open(path, format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(EditorError::source_open(
                path,
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| EditorError::source_open(path, format!("ffprobe json: {e}")))?;
        let video = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| EditorError::source_open(path, "no video stream"))?;
        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(EditorError::source_open(path, "video stream has no size")),
        };

        let fps = [video.avg_frame_rate.as_deref(), video.r_frame_rate.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(parse_ff_ratio)
            .map(|(n, d)| f64::from(n) / f64::from(d))
            .find(|f| *f > 0.0)
            .unwrap_or(0.0);
        let time_base = video
            .time_base
            .as_deref()
            .and_then(parse_ff_ratio)
            .unwrap_or((1, 1));

        let container = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|s| s.parse::<f64>().ok());
        let stream = video
            .duration_ts
            .map(|ts| ts as f64 * f64::from(time_base.0) / f64::from(time_base.1))
            .or_else(|| video.duration.as_deref().and_then(|s| s.parse::<f64>().ok()));
        let duration = container
            .or(stream)
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(0.0);

        let has_audio = parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        Ok(MediaInfo {
            path: path.to_path_buf(),
            width,
            height,
            fps,
            time_base,
            duration,
            has_audio,
        })
    }

    /// Decode up to `count` RGBA8 frames starting at the first frame with pts >= `start`.
    ///
    /// The input-side `-ss` makes ffmpeg seek to the preceding keyframe and decode forward.
    /// Fewer frames come back near the end of the stream.
    pub fn decode_frames(
        &self,
        info: &MediaInfo,
        start: f64,
        count: u32,
    ) -> EditorResult<Vec<Vec<u8>>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let expected_len = info.frame_len();
        if expected_len == 0 {
            return Err(EditorError::decode("source has zero-sized frames"));
        }

        let out = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-ss", &format!("{:.6}", start.max(0.0))])
            .arg("-i")
            .arg(&info.path)
            .args([
                "-frames:v",
                &count.to_string(),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .output()
            .map_err(|e| EditorError::decode(format!("failed to run ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(EditorError::decode(format!(
                "ffmpeg decode failed for '{}': {}",
                info.path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        Ok(split_frames(&out.stdout, expected_len, count as usize))
    }
}

fn runs(bin: &str) -> bool {
    Command::new(bin)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Split a raw video byte stream into whole frames, dropping a trailing partial frame.
pub(crate) fn split_frames(bytes: &[u8], frame_len: usize, max: usize) -> Vec<Vec<u8>> {
    if frame_len == 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(frame_len)
        .take(max)
        .map(<[u8]>::to_vec)
        .collect()
}

/// Parse an ffmpeg rational like `30000/1001`. Zero denominators are rejected.
pub(crate) fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.trim().parse::<u32>().ok()?;
    let b = match parts.next() {
        Some(b) => b.trim().parse::<u32>().ok()?,
        None => 1,
    };
    if b == 0 {
        return None;
    }
    Some((a, b))
}

#[cfg(test)]
#[path = "../../tests/unit/media/probe.rs"]
mod tests;
