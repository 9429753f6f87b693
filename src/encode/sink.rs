use std::path::PathBuf;

use crate::foundation::core::{Fps, Rgba8};
use crate::foundation::error::{EditorError, EditorResult};
use crate::media::frame::Frame;

/// Configuration provided to a [`FrameSink`] at the start of a render.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Color that transparent canvas pixels are flattened onto.
    pub background: Rgba8,
    /// Optional single audio track muxed into the output.
    pub audio: Option<AudioTrack>,
}

/// One external audio file, started `delay` seconds into the output.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrack {
    /// Any container/codec ffmpeg can read.
    pub path: PathBuf,
    /// Start offset in seconds. Negative values are treated as zero.
    pub delay: f64,
}

impl AudioTrack {
    /// Delay in whole milliseconds, as used by the `adelay` filter.
    pub fn delay_ms(&self) -> u64 {
        (self.delay.max(0.0) * 1000.0).round() as u64
    }
}

/// Sink contract for consuming composited frames in timeline order.
///
/// Ordering contract: `push_frame` is called with strictly increasing indices. Frames are
/// straight-alpha RGBA8 at the configured size.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> EditorResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: u64, frame: &Frame) -> EditorResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> EditorResult<()>;
    /// Tear down without finalizing output. Called on cancellation or after a failed push.
    fn abort(&mut self) {}
}

/// Tracks the last pushed index and rejects anything not strictly after it.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FrameOrder {
    last: Option<u64>,
}

impl FrameOrder {
    pub(crate) fn check(&mut self, idx: u64) -> EditorResult<()> {
        if let Some(last) = self.last
            && idx <= last
        {
            return Err(EditorError::validation(format!(
                "out-of-order frame index {idx} (last was {last})"
            )));
        }
        self.last = Some(idx);
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.last = None;
    }

    /// `true` until the first frame is accepted.
    pub(crate) fn is_empty(&self) -> bool {
        self.last.is_none()
    }
}

pub(crate) fn check_frame_size(cfg: &SinkConfig, frame: &Frame) -> EditorResult<()> {
    if frame.width() != cfg.width || frame.height() != cfg.height {
        return Err(EditorError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width(),
            frame.height(),
            cfg.width,
            cfg.height
        )));
    }
    Ok(())
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    order: FrameOrder,
    frames: Vec<(u64, Frame)>,
    finished: bool,
    aborted: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(u64, Frame)] {
        &self.frames
    }

    /// `true` once `end` has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `true` once `abort` has run.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> EditorResult<()> {
        self.cfg = Some(cfg);
        self.order.reset();
        self.frames.clear();
        self.finished = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &Frame) -> EditorResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| EditorError::validation("in-memory sink not started"))?;
        check_frame_size(cfg, frame)?;
        self.order.check(idx)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> EditorResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
