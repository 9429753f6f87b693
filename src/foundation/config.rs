use std::time::Duration;

use crate::foundation::core::{Canvas, Fps, Rgba8};
use crate::foundation::error::{EditorError, EditorResult};

/// Engine-wide configuration.
///
/// Every field has a default, so partial JSON documents deserialize. Selected knobs can be
/// overridden from the environment with [`EngineConfig::from_env`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output canvas size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Canvas background (flattened under every frame).
    pub background: Rgba8,
    /// Per-source decoded frame cache capacity.
    pub video_cache_frames: usize,
    /// Second-level `(path, time)` cache capacity inside the frame provider.
    pub provider_cache_frames: usize,
    /// Frames decoded ahead by [`crate::VideoSource::prefetch`] during render.
    pub prefetch_frames: u32,
    /// Text bitmap cache capacity.
    pub text_cache_entries: usize,
    /// Graceful encoder shutdown window before the process is killed.
    pub encoder_shutdown_timeout_ms: u64,
    /// Executable used for encoding and decoding.
    pub ffmpeg_bin: String,
    /// Executable used for probing media.
    pub ffprobe_bin: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            fps: Fps::default(),
            background: Rgba8::BLACK,
            video_cache_frames: 64,
            provider_cache_frames: 256,
            prefetch_frames: 12,
            text_cache_entries: 32,
            encoder_shutdown_timeout_ms: 2_000,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `LAYERCUT_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|k| std::env::var(k).ok())
    }

    /// Apply overrides from `lookup` (an environment-like key/value source).
    ///
    /// Unparseable or zero values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |key: &str| -> Option<usize> {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
        };

        if let Some(n) = positive("LAYERCUT_VIDEO_CACHE_FRAMES") {
            self.video_cache_frames = n;
        }
        if let Some(n) = positive("LAYERCUT_PROVIDER_CACHE_FRAMES") {
            self.provider_cache_frames = n;
        }
        if let Some(n) = positive("LAYERCUT_PREFETCH_FRAMES") {
            self.prefetch_frames = n as u32;
        }
        if let Some(n) = positive("LAYERCUT_ENCODER_TIMEOUT_MS") {
            self.encoder_shutdown_timeout_ms = n as u64;
        }
        if let Some(bin) = lookup("LAYERCUT_FFMPEG").filter(|s| !s.trim().is_empty()) {
            self.ffmpeg_bin = bin;
        }
        if let Some(bin) = lookup("LAYERCUT_FFPROBE").filter(|s| !s.trim().is_empty()) {
            self.ffprobe_bin = bin;
        }
        self
    }

    /// Load a JSON config file, then apply environment overrides.
    pub fn load(path: &std::path::Path) -> EditorResult<Self> {
        use anyhow::Context as _;
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .map_err(|e| EditorError::serde(format!("config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg.with_env_overrides(|k| std::env::var(k).ok()))
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> EditorResult<()> {
        Canvas::new(self.canvas.width, self.canvas.height)?;
        Fps::new(self.fps.num, self.fps.den)?;
        if self.video_cache_frames == 0 || self.provider_cache_frames == 0 {
            return Err(EditorError::validation("cache capacities must be > 0"));
        }
        Ok(())
    }

    /// Encoder shutdown window as a [`Duration`].
    pub fn encoder_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.encoder_shutdown_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
