use std::ffi::OsString;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::encode::sink::{FrameOrder, FrameSink, SinkConfig, check_frame_size};
use crate::foundation::config::EngineConfig;
use crate::foundation::error::{EditorError, EditorResult};
use crate::media::frame::Frame;
use crate::render::composite::flatten_to_rgb24;

/// Bytes of encoder stderr kept for diagnostics.
const STDERR_TAIL: usize = 2048;

/// Options for [`FfmpegSink`] output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path; the container is chosen by ffmpeg from the extension.
    pub out_path: PathBuf,
    /// Encoder executable.
    pub ffmpeg_bin: String,
    /// How long `end` waits for the encoder to exit after stdin is closed.
    pub shutdown_timeout: Duration,
}

impl FfmpegSinkOpts {
    /// Create options for writing `out_path` with `ffmpeg` from `PATH`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            ffmpeg_bin: "ffmpeg".to_string(),
            shutdown_timeout: Duration::from_secs(2),
        }
    }

    /// Take the executable and shutdown window from `cfg`.
    pub fn from_config(out_path: impl Into<PathBuf>, cfg: &EngineConfig) -> Self {
        Self {
            out_path: out_path.into(),
            ffmpeg_bin: cfg.ffmpeg_bin.clone(),
            shutdown_timeout: cfg.encoder_shutdown_timeout(),
        }
    }
}

/// Sink that spawns an external `ffmpeg` and streams RGB24 frames to its stdin.
///
/// Frames are flattened onto `SinkConfig::background` before writing. When the pipe breaks, the
/// returned [`EditorError::RenderIo`] carries a readable diagnostic taken from the encoder's
/// stderr.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<Vec<u8>>>,

    cfg: Option<SinkConfig>,
    order: FrameOrder,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            order: FrameOrder::default(),
        }
    }

    /// Output path this sink writes.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    /// Close stdin, wait for the process within the shutdown window, and collect stderr.
    fn shutdown(&mut self) -> (Option<std::process::ExitStatus>, Vec<u8>) {
        drop(self.stdin.take());
        let status = self
            .child
            .take()
            .and_then(|child| wait_or_kill(child, self.opts.shutdown_timeout));
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        self.cfg = None;
        (status, stderr)
    }
}

impl FrameSink for FfmpegSink {
    #[tracing::instrument(skip(self, cfg), fields(out = %self.opts.out_path.display()))]
    fn begin(&mut self, cfg: SinkConfig) -> EditorResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(EditorError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(EditorError::validation(
                "encoder width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(EditorError::validation(
                "encoder width/height must be even (required for yuv420p output)",
            ));
        }
        if let Some(audio) = &cfg.audio
            && !audio.path.exists()
        {
            return Err(EditorError::render_io(format!(
                "audio track '{}' does not exist",
                audio.path.display()
            )));
        }
        ensure_parent_dir(&self.opts.out_path)?;

        let mut child = Command::new(&self.opts.ffmpeg_bin)
            .args(build_args(&cfg, &self.opts.out_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EditorError::render_io(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.opts.ffmpeg_bin
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EditorError::render_io("failed to open encoder stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| EditorError::render_io("failed to open encoder stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            // A read error only truncates the diagnostic.
            let _ = stderr.read_to_end(&mut bytes);
            bytes
        });

        tracing::debug!(width = cfg.width, height = cfg.height, "encoder started");
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.order.reset();
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &Frame) -> EditorResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| EditorError::render_io("encoder not started"))?;
        check_frame_size(cfg, frame)?;
        self.order.check(idx)?;

        let rgb = flatten_to_rgb24(&frame.to_premul(), cfg.background);
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(EditorError::render_io("encoder is already finalized"));
        };
        if let Err(e) = stdin.write_all(&rgb) {
            let (_, stderr) = self.shutdown();
            return Err(EditorError::render_io(format!(
                "failed to write frame {idx} to encoder: {e}: {}",
                diagnose(&stderr)
            )));
        }
        Ok(())
    }

    fn end(&mut self) -> EditorResult<()> {
        if self.child.is_none() {
            return Err(EditorError::render_io("encoder not started"));
        }
        let (status, stderr) = self.shutdown();
        match status {
            Some(s) if s.success() => {
                if self.order.is_empty() || reports_empty_output(&stderr) {
                    return Err(EditorError::render_io(format!(
                        "encoder finished without output: {}",
                        diagnose(&stderr)
                    )));
                }
                tracing::debug!(out = %self.opts.out_path.display(), "encoder finished");
                Ok(())
            }
            Some(s) => Err(EditorError::render_io(format!(
                "encoder exited with {s}: {}",
                diagnose(&stderr)
            ))),
            None => Err(EditorError::render_io(format!(
                "encoder did not exit within {:?} and was killed",
                self.opts.shutdown_timeout
            ))),
        }
    }

    /// Kill the encoder and remove the partial output file.
    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
        }
        let _ = self.shutdown();
        if self.opts.out_path.exists()
            && let Err(e) = std::fs::remove_file(&self.opts.out_path)
        {
            tracing::warn!(out = %self.opts.out_path.display(), error = %e, "could not remove partial output");
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

/// Encoder command line for `cfg` writing to `out`.
///
/// Raw RGB24 frames arrive on stdin. An audio track is delayed with `adelay` and the output is
/// cut to the shorter stream.
pub fn build_args(cfg: &SinkConfig, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-loglevel",
        "warning",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
        &format!("{}x{}", cfg.width, cfg.height),
        "-r",
        &format!("{}/{}", cfg.fps.num, cfg.fps.den),
        "-i",
        "pipe:0",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    if let Some(audio) = &cfg.audio {
        let d = audio.delay_ms();
        args.push("-i".into());
        args.push(audio.path.clone().into_os_string());
        args.extend(
            [
                "-filter_complex",
                &format!("[1:a]adelay={d}|{d}[aud]"),
                "-map",
                "0:v",
                "-map",
                "[aud]",
            ]
            .iter()
            .map(OsString::from),
        );
    }

    args.extend(
        ["-c:v", "libx264", "-pix_fmt", "yuv420p"]
            .iter()
            .map(OsString::from),
    );
    if cfg.audio.is_some() {
        args.extend(["-c:a", "aac"].iter().map(OsString::from));
    }
    args.push("-shortest".into());
    args.push(out.as_os_str().to_owned());
    args
}

/// Turn the tail of encoder stderr into a message a user can act on.
pub fn diagnose(stderr: &[u8]) -> String {
    let tail = &stderr[stderr.len().saturating_sub(STDERR_TAIL)..];
    let text = String::from_utf8_lossy(tail);
    let text = text.trim();

    let hint = if text.contains("Output file is empty") {
        Some("the encoder received no frames")
    } else if text.contains("Invalid argument") || text.contains("Error parsing filter") {
        Some("the encoder rejected its arguments (check canvas size, fps and audio delay)")
    } else if text.contains("No such file") {
        Some("an input file (audio track) could not be found")
    } else if text.contains("Unknown encoder") {
        Some("this ffmpeg build lacks libx264 or aac")
    } else {
        None
    };

    match (hint, text.is_empty()) {
        (Some(h), true) => h.to_string(),
        (Some(h), false) => format!("{h}\n{text}"),
        (None, true) => "encoder produced no diagnostic output".to_string(),
        (None, false) => text.to_string(),
    }
}

fn reports_empty_output(stderr: &[u8]) -> bool {
    String::from_utf8_lossy(stderr).contains("Output file is empty")
}

fn wait_or_kill(mut child: Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(10)),
            Ok(None) => {
                tracing::warn!("encoder shutdown timed out; killing");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "waiting for encoder failed");
                let _ = child.kill();
                return None;
            }
        }
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> EditorResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
