use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::encode::sink::{AudioTrack, FrameSink, SinkConfig};
use crate::foundation::config::EngineConfig;
use crate::foundation::error::{EditorError, EditorResult};
use crate::render::compositor::Compositor;
use crate::timeline::engine::TimelineEngine;
use crate::timeline::layer::{LayerKind, LayerModel};

/// What to render and how.
#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// Canvas, fps, caches and encoder knobs.
    pub config: EngineConfig,
    /// First rendered timeline instant in seconds.
    pub start: f64,
    /// End of the range (exclusive); the timeline duration when `None`.
    pub end: Option<f64>,
    /// Audio track; taken from the first audio layer when `None`.
    pub audio: Option<AudioTrack>,
}

/// Progress report sent after each written frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderProgress {
    /// Frames written so far.
    pub written: u64,
    /// Frames in the render range.
    pub total: u64,
}

impl RenderProgress {
    /// Completion in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.written as f64 / self.total as f64
        }
    }
}

/// Final report of a render job. Produced exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOutcome {
    pub success: bool,
    pub cancelled: bool,
    /// Human-readable summary or error message.
    pub message: String,
    pub frames_written: u64,
}

impl RenderOutcome {
    fn failed(err: &EditorError, frames_written: u64) -> Self {
        Self {
            success: false,
            cancelled: err.is_cancelled(),
            message: err.to_string(),
            frames_written,
        }
    }
}

/// Shared cancellation flag, checked once per frame.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A render of a timeline snapshot into a [`FrameSink`].
///
/// The job owns its own [`Compositor`] (and therefore its own decoders), so it shares nothing
/// with a live preview.
pub struct RenderJob {
    engine: TimelineEngine,
    settings: RenderSettings,
    sink: Box<dyn FrameSink>,
    cancel: CancelToken,
    progress: Option<mpsc::Sender<RenderProgress>>,
}

impl RenderJob {
    /// Create a job rendering `layers` (a snapshot; later timeline edits do not affect it).
    pub fn new(layers: Vec<LayerModel>, settings: RenderSettings, sink: Box<dyn FrameSink>) -> Self {
        Self {
            engine: layers.into_iter().collect(),
            settings,
            sink,
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Send a [`RenderProgress`] to `tx` after every frame.
    pub fn with_progress(mut self, tx: mpsc::Sender<RenderProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Token that cancels this job when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run on the calling thread.
    #[tracing::instrument(skip(self), fields(start = self.settings.start, end = ?self.settings.end))]
    pub fn run(mut self) -> RenderOutcome {
        let mut written = 0u64;
        let result = self.render(&mut written);
        match result {
            Ok(()) => {
                tracing::info!(frames = written, "render finished");
                RenderOutcome {
                    success: true,
                    cancelled: false,
                    message: format!("rendered {written} frames"),
                    frames_written: written,
                }
            }
            Err(e) => {
                self.sink.abort();
                if e.is_cancelled() {
                    tracing::info!(frames = written, "render cancelled");
                } else {
                    tracing::warn!(frames = written, error = %e, "render failed");
                }
                RenderOutcome::failed(&e, written)
            }
        }
    }

    /// Run on a dedicated thread.
    pub fn spawn(self) -> RenderHandle {
        let cancel = self.cancel.clone();
        let thread = std::thread::Builder::new()
            .name("layercut-render".to_string())
            .spawn(move || self.run());
        RenderHandle { cancel, thread }
    }

    fn render(&mut self, written: &mut u64) -> EditorResult<()> {
        let cfg = &self.settings.config;
        let fps = cfg.fps;
        let start = self.settings.start.max(0.0);
        let end = self.settings.end.unwrap_or_else(|| self.engine.duration());
        if !end.is_finite() || !self.settings.start.is_finite() {
            return Err(EditorError::validation(format!(
                "render range must be finite (start {}, end {end})",
                self.settings.start
            )));
        }
        let total = fps.frames_in(end - start);
        if total == 0 {
            return Err(EditorError::validation("render range is empty"));
        }

        let mut compositor = Compositor::new(cfg)?;
        let audio = self
            .settings
            .audio
            .clone()
            .or_else(|| first_audio_track(self.engine.layers()));
        self.sink.begin(SinkConfig {
            width: cfg.canvas.width,
            height: cfg.canvas.height,
            fps,
            background: cfg.background,
            audio,
        })?;

        let prefetch = u64::from(cfg.prefetch_frames);
        for idx in 0..total {
            if self.cancel.is_cancelled() {
                return Err(EditorError::Cancelled);
            }
            let t = start + fps.frame_to_secs(idx);
            let active = self.engine.get_active_layers(t);
            if prefetch > 0 && idx % prefetch == 0 {
                let ahead: Vec<f64> = (idx..(idx + prefetch).min(total))
                    .map(|i| start + fps.frame_to_secs(i))
                    .collect();
                compositor.prefetch(self.engine.layers(), &ahead);
            }

            let frame = compositor.compose_frame(t, &active);
            self.sink.push_frame(idx, &frame)?;
            *written += 1;

            if let Some(tx) = &self.progress {
                // A dropped receiver just means nobody is watching.
                let _ = tx.send(RenderProgress {
                    written: *written,
                    total,
                });
            }
        }

        compositor.release_all();
        self.sink.end()
    }
}

/// The first audio layer with a source, delayed by its start time plus its own offset.
pub fn first_audio_track(layers: &[LayerModel]) -> Option<AudioTrack> {
    layers
        .iter()
        .filter(|l| l.kind == LayerKind::Audio)
        .find_map(|l| {
            l.props.source.as_ref().map(|path| AudioTrack {
                path: path.clone(),
                delay: l.time.start + l.props.audio_delay,
            })
        })
}

/// Handle to a job started with [`RenderJob::spawn`].
pub struct RenderHandle {
    cancel: CancelToken,
    thread: std::io::Result<JoinHandle<RenderOutcome>>,
}

impl RenderHandle {
    /// Ask the job to stop before its next frame.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        match &self.thread {
            Ok(h) => h.is_finished(),
            Err(_) => true,
        }
    }

    /// Wait for the job and return its outcome.
    pub fn join(self) -> RenderOutcome {
        let failed = |message: String| RenderOutcome {
            success: false,
            cancelled: false,
            message,
            frames_written: 0,
        };
        match self.thread {
            Ok(h) => h
                .join()
                .unwrap_or_else(|_| failed("render thread panicked".to_string())),
            Err(e) => failed(format!("failed to start render thread: {e}")),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/job.rs"]
mod tests;
