use std::path::{Path, PathBuf};

use crate::foundation::error::EditorResult;
use crate::media::cache::{FrameCache, TimeKey};
use crate::media::frame::Frame;
use crate::media::probe::{FfmpegTools, MediaInfo};

/// One opened video file: stream metadata plus a decoded-frame cache keyed by time.
///
/// Probing happens once at [`VideoSource::open`]; every later lookup reuses that metadata.
/// Decoding shells out to `ffmpeg` with an input-side seek, so a miss costs a keyframe seek
/// plus a forward decode to the requested time.
#[derive(Debug)]
pub struct VideoSource {
    info: MediaInfo,
    tools: FfmpegTools,
    cache: FrameCache<TimeKey>,
}

impl VideoSource {
    /// Probe `path` and prepare a cache of `cache_frames` decoded frames.
    ///
    /// Fails with [`crate::EditorError::SourceOpen`] when the file is missing or has no
    /// video stream.
    #[tracing::instrument(skip(tools))]
    pub fn open(path: &Path, cache_frames: usize, tools: FfmpegTools) -> EditorResult<Self> {
        let info = tools.probe(path)?;
        tracing::debug!(
            w = info.width,
            h = info.height,
            fps = info.fps,
            duration = info.duration,
            "opened video source"
        );
        Ok(Self::from_info(info, cache_frames, tools))
    }

    /// Build a source from already-known metadata.
    pub fn from_info(info: MediaInfo, cache_frames: usize, tools: FfmpegTools) -> Self {
        Self {
            info,
            tools,
            cache: FrameCache::new(cache_frames),
        }
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn path(&self) -> &PathBuf {
        &self.info.path
    }

    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    /// Number of decoded frames currently cached.
    pub fn cached_frames(&self) -> usize {
        self.cache.len()
    }

    /// Return `true` when a frame for `t` is cached (does not touch recency).
    pub fn is_cached(&self, t: f64) -> bool {
        self.cache.contains(&TimeKey::from_secs(t))
    }

    /// Insert a decoded frame for `t`.
    pub fn insert_cached(&mut self, t: f64, frame: Frame) {
        self.cache.put(TimeKey::from_secs(t), frame);
    }

    /// First frame with presentation time `>= t`.
    ///
    /// `None` past the end of the stream or when decoding fails.
    pub fn get_frame_at(&mut self, t: f64) -> Option<Frame> {
        let key = TimeKey::from_secs(t.max(0.0));
        if let Some(frame) = self.cache.get(&key) {
            return Some(frame);
        }

        let decoded = match self.tools.decode_frames(&self.info, t.max(0.0), 1) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::debug!(t, error = %e, "video decode failed");
                return None;
            }
        };
        let Some(bytes) = decoded.into_iter().next() else {
            tracing::debug!(t, "no frame at or after time (end of stream)");
            return None;
        };
        let frame = self.to_frame(bytes)?;
        self.cache.put(key, frame.clone());
        Some(frame)
    }

    /// Decode and cache every source frame in `[start_t, start_t + duration)` that is not
    /// already cached, in a single batched decode. Best effort: failures are logged and ignored.
    pub fn prefetch(&mut self, start_t: f64, duration: f64) {
        if !duration.is_finite() || duration <= 0.0 || !start_t.is_finite() {
            return;
        }
        let start_t = start_t.max(0.0);
        let step = self.info.frame_step();
        let count = (duration / step).ceil() as u32;
        let times: Vec<f64> = (0..count)
            .map(|i| start_t + f64::from(i) * step)
            .filter(|&t| t < start_t + duration)
            .collect();
        self.prefetch_times(&times);
    }

    /// Warm the cache for exactly the lookup times in `times`.
    ///
    /// One batched decode runs from the earliest uncached time. Each requested time is keyed
    /// to the first decoded frame presented at or after it, the same frame
    /// [`VideoSource::get_frame_at`] would return, so lookups on a grid that differs from the
    /// source frame rate still hit. Non-finite times are ignored.
    pub fn prefetch_times(&mut self, times: &[f64]) {
        let mut wanted: Vec<f64> = times
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .map(|t| t.max(0.0))
            .filter(|&t| !self.is_cached(t))
            .collect();
        if wanted.is_empty() {
            return;
        }
        wanted.sort_by(f64::total_cmp);
        wanted.dedup_by_key(|t| TimeKey::from_secs(*t));

        let step = self.info.frame_step();
        let first = wanted[0];
        let slots: Vec<usize> = wanted.iter().map(|&t| batch_slot(first, step, t)).collect();
        let count = slots.iter().max().map_or(0, |&s| s + 1);
        let Ok(count) = u32::try_from(count) else {
            tracing::debug!(first, "prefetch window too large; skipped");
            return;
        };

        let frames = match self.tools.decode_frames(&self.info, first, count) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::debug!(first, count, error = %e, "prefetch failed");
                return;
            }
        };
        let decoded: Vec<Option<Frame>> = frames.into_iter().map(|b| self.to_frame(b)).collect();
        for (&t, &slot) in wanted.iter().zip(&slots) {
            if let Some(frame) = decoded.get(slot).and_then(Option::as_ref) {
                self.cache.put(TimeKey::from_secs(t), frame.clone());
            }
        }
    }

    /// Drop every cached frame.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn to_frame(&self, bytes: Vec<u8>) -> Option<Frame> {
        Frame::new(self.info.width, self.info.height, bytes)
            .inspect_err(|e| tracing::debug!(error = %e, "decoded frame has unexpected size"))
            .ok()
    }
}

/// Index, within a batch decoded from `first`, of the first frame presented at or after `t`.
///
/// Source frames sit on a `step` grid from zero, so the batch opens at the first grid point
/// `>= first`.
pub(crate) fn batch_slot(first: f64, step: f64, t: f64) -> usize {
    let origin = grid_ceil(first, step);
    (((t - origin) / step) - 1e-6).ceil().max(0.0) as usize
}

fn grid_ceil(t: f64, step: f64) -> f64 {
    ((t / step) - 1e-6).ceil().max(0.0) * step
}

#[cfg(test)]
#[path = "../../tests/unit/media/video.rs"]
mod tests;
