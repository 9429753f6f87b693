use crate::foundation::error::{EditorError, EditorResult};

pub use kurbo::{Affine, Vec2};

/// Minimum duration callers clamp degenerate layer ranges to before use.
pub const MIN_LAYER_DURATION: f64 = 0.1;

/// Half-open time interval `[start, end)` in seconds.
///
/// Values are immutable; the `with_*` helpers return new ranges.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Inclusive start in seconds.
    pub start: f64,
    /// Exclusive end in seconds.
    pub end: f64,
}

impl TimeRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: f64, end: f64) -> EditorResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(EditorError::validation("TimeRange bounds must be finite"));
        }
        if start > end {
            return Err(EditorError::validation("TimeRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Range starting at `start` lasting `duration` seconds.
    pub fn from_duration(start: f64, duration: f64) -> EditorResult<Self> {
        Self::new(start, start + duration)
    }

    /// Return `true` when `start <= t < end`.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Length of the range in seconds.
    pub fn duration(self) -> f64 {
        self.end - self.start
    }

    /// Return `true` for zero-length ranges.
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// New range with a different start. The end is pushed out if it would precede `start`.
    pub fn with_start(self, start: f64) -> Self {
        Self {
            start,
            end: self.end.max(start),
        }
    }

    /// New range with a different end, never earlier than `start`.
    pub fn with_end(self, end: f64) -> Self {
        Self {
            start: self.start,
            end: end.max(self.start),
        }
    }

    /// Shift both bounds by `delta` seconds.
    pub fn shifted(self, delta: f64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    /// Extend `end` so the range lasts at least `min_duration`.
    pub fn clamped_min(self, min_duration: f64) -> Self {
        if self.duration() >= min_duration {
            return self;
        }
        Self {
            start: self.start,
            end: self.start + min_duration,
        }
    }

    /// Time relative to `start`, clamped to `>= 0`.
    pub fn local_time(self, t: f64) -> f64 {
        (t - self.start).max(0.0)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> EditorResult<Self> {
        if den == 0 {
            return Err(EditorError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(EditorError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Integer frame rate `n/1`.
    pub fn integer(num: u32) -> EditorResult<Self> {
        Self::new(num, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Timeline time of frame `index`.
    pub fn frame_to_secs(self, index: u64) -> f64 {
        (index as f64) * self.frame_duration_secs()
    }

    /// Frame index covering `secs`, rounded to nearest.
    pub fn secs_to_frame_round(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }

    /// Number of frames needed to cover `secs` seconds.
    ///
    /// Float noise just above a whole frame count does not add a frame.
    pub fn frames_in(self, secs: f64) -> u64 {
        (secs * self.as_f64() - 1e-6).ceil().max(0.0) as u64
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a canvas, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> EditorResult<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::validation("canvas width/height must be > 0"));
        }
        Ok(Self { width, height })
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Straight-alpha RGBA8 color.
///
/// Serialized as a `[r, g, b, a]` array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(s: &str) -> EditorResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(EditorError::validation(format!("invalid hex color '{s}'")));
        }
        let byte = |i: usize| -> EditorResult<u8> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| EditorError::validation(format!("invalid hex color '{s}'")))
        };
        match hex.len() {
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(EditorError::validation(format!("invalid hex color '{s}'"))),
        }
    }

    /// Array form `[r, g, b, a]`.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Rgba8 {
    fn from(v: [u8; 4]) -> Self {
        Self {
            r: v[0],
            g: v[1],
            b: v[2],
            a: v[3],
        }
    }
}

impl From<Rgba8> for [u8; 4] {
    fn from(c: Rgba8) -> Self {
        c.to_array()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
