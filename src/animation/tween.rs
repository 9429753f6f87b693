use crate::animation::ease::Ease;
use crate::foundation::math::{clamp01, lerp};

/// A single eased transition from `from` to `to` across `[start, end]` seconds.
///
/// Tweens never extrapolate: before `start` they hold `from`, at or after `end` they hold `to`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tween {
    /// Start time in timeline seconds.
    pub start: f64,
    /// End time in timeline seconds.
    pub end: f64,
    /// Value before and at `start`.
    pub from: f64,
    /// Value at and after `end`.
    pub to: f64,
    /// Easing applied to normalized progress.
    #[serde(default)]
    pub ease: Ease,
}

impl Tween {
    /// Construct a tween.
    pub fn new(start: f64, end: f64, from: f64, to: f64, ease: Ease) -> Self {
        Self {
            start,
            end,
            from,
            to,
            ease,
        }
    }

    /// Normalized, un-eased progress at `t`.
    ///
    /// Zero-length tweens step from 0 to 1 at `start`.
    pub fn progress(&self, t: f64) -> f64 {
        let span = self.end - self.start;
        if span <= 0.0 {
            return if t < self.start { 0.0 } else { 1.0 };
        }
        clamp01((t - self.start) / span)
    }

    /// Eased, interpolated value at `t`.
    pub fn sample(&self, t: f64) -> f64 {
        if t < self.start {
            return self.from;
        }
        if t >= self.end {
            return self.to;
        }
        lerp(self.from, self.to, self.ease.apply(self.progress(t)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/tween.rs"]
mod tests;
