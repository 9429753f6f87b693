use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::foundation::config::EngineConfig;
use crate::foundation::error::EditorResult;
use crate::media::cache::{FrameCache, TimeKey};
use crate::media::decode::{decode_still, is_still_image};
use crate::media::frame::Frame;
use crate::media::probe::FfmpegTools;
use crate::media::video::VideoSource;

/// Resolves `(path, time)` to a frame for every registered layer source.
///
/// Still images are decoded once per layer. Video files share one [`VideoSource`] per path,
/// kept alive while at least one layer references it. A second-level cache keyed by
/// `(path, time)` sits in front of the video sources.
///
/// The provider is owned by one thread; preview and render each build their own.
#[derive(Debug)]
pub struct FrameProvider {
    tools: FfmpegTools,
    video_cache_frames: usize,
    layer_paths: HashMap<String, PathBuf>,
    statics: HashMap<String, Frame>,
    sources: HashMap<PathBuf, VideoSource>,
    cache: FrameCache<(PathBuf, TimeKey)>,
}

impl FrameProvider {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            tools: FfmpegTools::from(cfg),
            video_cache_frames: cfg.video_cache_frames,
            layer_paths: HashMap::new(),
            statics: HashMap::new(),
            sources: HashMap::new(),
            cache: FrameCache::new(cfg.provider_cache_frames),
        }
    }

    /// Associate `layer_id` with `path` and prepare the source.
    ///
    /// The mapping is kept even when opening fails, so later lookups return the blank
    /// sentinel instead of erroring.
    pub fn register_source(&mut self, layer_id: &str, path: &Path) -> EditorResult<()> {
        self.unregister_source(layer_id);
        self.layer_paths
            .insert(layer_id.to_string(), path.to_path_buf());

        if is_still_image(path) {
            let frame = decode_still(path)?;
            self.statics.insert(layer_id.to_string(), frame);
            return Ok(());
        }

        if !self.sources.contains_key(path) {
            let src = VideoSource::open(path, self.video_cache_frames, self.tools.clone())?;
            self.sources.insert(path.to_path_buf(), src);
        }
        Ok(())
    }

    /// Forget `layer_id`. The shared video source closes when no layer uses its path.
    pub fn unregister_source(&mut self, layer_id: &str) {
        self.statics.remove(layer_id);
        let Some(path) = self.layer_paths.remove(layer_id) else {
            return;
        };
        if !self.layer_paths.values().any(|p| *p == path) && self.sources.remove(&path).is_some()
        {
            tracing::debug!(path = %path.display(), "closed video source");
        }
    }

    /// Return `true` when `layer_id` has a registered source (even a failed one).
    pub fn is_registered(&self, layer_id: &str) -> bool {
        self.layer_paths.contains_key(layer_id)
    }

    /// Number of open video sources.
    pub fn open_sources(&self) -> usize {
        self.sources.len()
    }

    /// Frame of `path` at source time `t`; [`Frame::empty`] on any failure.
    pub fn get_frame(&mut self, path: &Path, t: f64) -> Frame {
        if let Some(frame) = self
            .layer_paths
            .iter()
            .find(|(_, p)| p.as_path() == path)
            .and_then(|(id, _)| self.statics.get(id))
        {
            return frame.clone();
        }

        let key = (path.to_path_buf(), TimeKey::from_secs(t));
        if let Some(frame) = self.cache.get(&key) {
            return frame;
        }

        let Some(src) = self.sources.get_mut(path) else {
            return Frame::empty();
        };
        match src.get_frame_at(t) {
            Some(frame) => {
                self.cache.put(key, frame.clone());
                frame
            }
            None => Frame::empty(),
        }
    }

    /// Frame for `layer_id` at layer-local time `t`.
    pub fn get_layer_frame(&mut self, layer_id: &str, t: f64) -> Frame {
        if let Some(frame) = self.statics.get(layer_id) {
            return frame.clone();
        }
        match self.layer_paths.get(layer_id).cloned() {
            Some(path) => self.get_frame(&path, t),
            None => Frame::empty(),
        }
    }

    /// Warm the video source behind `layer_id` for the layer-local lookup `times`.
    pub fn prefetch_layer(&mut self, layer_id: &str, times: &[f64]) {
        let Some(path) = self.layer_paths.get(layer_id) else {
            return;
        };
        if let Some(src) = self.sources.get_mut(path) {
            src.prefetch_times(times);
        }
    }

    /// Drop every source and cached frame.
    pub fn release_all(&mut self) {
        self.layer_paths.clear();
        self.statics.clear();
        self.sources.clear();
        self.cache.clear();
    }

    #[cfg(test)]
    fn insert_source(&mut self, layer_id: &str, src: VideoSource) {
        let path = src.path().clone();
        self.layer_paths.insert(layer_id.to_string(), path.clone());
        self.sources.insert(path, src);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/provider.rs"]
mod tests;
