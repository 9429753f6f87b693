//! Per-layer frame effects.
//!
//! Every effect implements [`Effect`]; a layer's effects run in order through an
//! [`EffectPipeline`], sharing one [`EffectContext`] that animation effects write and the
//! compositor reads. A failing effect never aborts the chain: its input frame passes through.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::animation::tween::Tween;
use crate::foundation::core::Rgba8;
use crate::foundation::error::EditorResult;
use crate::media::frame::Frame;
use crate::timeline::layer::TextStyle;

pub(crate) mod animate;
pub(crate) mod blur;
pub(crate) mod chroma;
pub(crate) mod feather;
pub(crate) mod mask;
pub(crate) mod text;
pub(crate) mod vignette;

/// Per-frame, per-layer scratch space shared by the effects of one chain.
///
/// Reset to [`EffectContext::default`] before every layer.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectContext {
    /// Opacity multiplier applied on top of the layer's own opacity.
    pub opacity: f64,
    /// Horizontal offset in canvas pixels added to the layer position.
    pub x: f64,
    /// Vertical offset in canvas pixels added to the layer position.
    pub y: f64,
    /// Uniform scale multiplier.
    pub scale: f64,
    /// Rotation in degrees added to the layer rotation.
    pub rotate: f64,
    /// The layer frame carries meaningful alpha; when unset, video frames are drawn opaque.
    pub force_bgra: bool,
    /// Frame blended over the layer output before the layer transform is applied.
    pub overlay_frame: Option<Frame>,
    /// Free-form values for effects that need to talk to each other.
    pub values: HashMap<String, f64>,
}

impl Default for EffectContext {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotate: 0.0,
            force_bgra: false,
            overlay_frame: None,
            values: HashMap::new(),
        }
    }
}

impl EffectContext {
    /// Elapsed seconds for `frame_index` at `fps` (`0.0` for a non-positive rate).
    pub fn seconds(frame_index: u64, fps: f64) -> f64 {
        if fps.is_finite() && fps > 0.0 {
            frame_index as f64 / fps
        } else {
            0.0
        }
    }
}

/// A frame operator.
///
/// Effects may keep state between frames (raster caches and the like), hence `&mut self`.
pub trait Effect: Send {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Transform `frame` at timeline frame `frame_index`, optionally writing into `ctx`.
    fn apply(
        &mut self,
        frame: Frame,
        frame_index: u64,
        fps: f64,
        ctx: &mut EffectContext,
    ) -> EditorResult<Frame>;
}

/// Shape of a [`EffectSpec::Mask`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskShape {
    /// Axis-aligned rectangle.
    Rect,
    /// Rectangle with rounded corners.
    RoundedRect {
        /// Corner radius in pixels.
        radius: f64,
    },
    /// Ellipse inscribed in the mask box.
    Circle,
    /// Grayscale image stretched over the mask box; luma is coverage.
    Image {
        /// Mask image file.
        path: PathBuf,
    },
}

/// Serializable effect description; [`EffectSpec::build`] turns it into a live [`Effect`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectSpec {
    /// Animate the context opacity.
    Opacity {
        /// Opacity over time.
        tween: Tween,
    },
    /// Animate the position offset.
    Move {
        /// Horizontal offset over time.
        x: Tween,
        /// Vertical offset over time.
        y: Tween,
    },
    /// Animate the uniform scale multiplier.
    Scale {
        /// Scale over time.
        tween: Tween,
    },
    /// Animate extra rotation in degrees.
    Rotate {
        /// Rotation over time.
        tween: Tween,
    },
    /// Gaussian blur of a rectangular region.
    BlurRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        /// Kernel size; even values are rounded up to the next odd size.
        size: u32,
    },
    /// Radial darkening.
    Vignette {
        strength: f64,
        radius: f64,
        /// Bias direction in degrees; `0` disables the bias.
        #[serde(default)]
        angle: f64,
    },
    /// Replace alpha by distance from a key color.
    ChromaKey {
        key_color: Rgba8,
        threshold: f32,
        softness: f32,
    },
    /// Pull green toward the red/blue average.
    Despill {
        strength: f32,
    },
    /// Multiply alpha by a rasterized mask.
    Mask {
        shape: MaskShape,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        #[serde(default)]
        feather: f64,
        #[serde(default)]
        invert: bool,
        #[serde(default = "one")]
        opacity: f64,
    },
    /// Linear alpha ramps along the frame edges, in pixels.
    Feather {
        #[serde(default)]
        top: u32,
        #[serde(default)]
        right: u32,
        #[serde(default)]
        bottom: u32,
        #[serde(default)]
        left: u32,
    },
    /// Styled text drawn over the layer at `(x, y)` in layer pixels.
    TextOverlay {
        style: TextStyle,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
}

fn one() -> f64 {
    1.0
}

impl EffectSpec {
    /// Instantiate the effect.
    pub fn build(&self) -> Box<dyn Effect> {
        use animate::{Animate, AnimatedProperty, Move};

        match self {
            Self::Opacity { tween } => Box::new(Animate::new(AnimatedProperty::Opacity, *tween)),
            Self::Scale { tween } => Box::new(Animate::new(AnimatedProperty::Scale, *tween)),
            Self::Rotate { tween } => Box::new(Animate::new(AnimatedProperty::Rotate, *tween)),
            Self::Move { x, y } => Box::new(Move { x: *x, y: *y }),
            Self::BlurRegion {
                x,
                y,
                width,
                height,
                size,
            } => Box::new(blur::BlurRegion {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
                size: *size,
            }),
            Self::Vignette {
                strength,
                radius,
                angle,
            } => Box::new(vignette::Vignette {
                strength: *strength,
                radius: *radius,
                angle: *angle,
            }),
            Self::ChromaKey {
                key_color,
                threshold,
                softness,
            } => Box::new(chroma::ChromaKey {
                key_color: *key_color,
                threshold: *threshold,
                softness: *softness,
            }),
            Self::Despill { strength } => Box::new(chroma::Despill {
                strength: *strength,
            }),
            Self::Mask {
                shape,
                x,
                y,
                width,
                height,
                feather,
                invert,
                opacity,
            } => Box::new(mask::Mask::new(
                shape.clone(),
                kurbo::Rect::new(*x, *y, x + width, y + height),
                *feather,
                *invert,
                *opacity,
            )),
            Self::Feather {
                top,
                right,
                bottom,
                left,
            } => Box::new(feather::Feather {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            Self::TextOverlay { style, x, y } => {
                Box::new(text::TextOverlay::new(style.clone(), *x, *y))
            }
        }
    }
}

/// Ordered effect chain for one layer.
#[derive(Default)]
pub struct EffectPipeline {
    effects: Vec<Box<dyn Effect>>,
}

impl std::fmt::Debug for EffectPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.effects.iter().map(|e| e.name()))
            .finish()
    }
}

impl EffectPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pipeline from serialized specs, preserving order.
    pub fn from_specs(specs: &[EffectSpec]) -> Self {
        Self {
            effects: specs.iter().map(EffectSpec::build).collect(),
        }
    }

    /// Append an effect.
    pub fn push(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Run every effect in order. A failing effect is logged and skipped.
    pub fn run(
        &mut self,
        frame: Frame,
        frame_index: u64,
        fps: f64,
        ctx: &mut EffectContext,
    ) -> Frame {
        let mut current = frame;
        for effect in &mut self.effects {
            match effect.apply(current.clone(), frame_index, fps, ctx) {
                Ok(out) => current = out,
                Err(e) => {
                    tracing::warn!(
                        effect = effect.name(),
                        frame_index,
                        error = %e,
                        "effect failed; passing input through"
                    );
                }
            }
        }
        current
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/pipeline.rs"]
mod tests;
