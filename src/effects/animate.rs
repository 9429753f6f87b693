use crate::animation::tween::Tween;
use crate::effects::{Effect, EffectContext};
use crate::foundation::error::EditorResult;
use crate::media::frame::Frame;

/// Context field driven by an [`Animate`] effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimatedProperty {
    Opacity,
    Scale,
    Rotate,
}

/// Writes one tweened value into the effect context; the frame passes through untouched.
#[derive(Clone, Copy, Debug)]
pub struct Animate {
    property: AnimatedProperty,
    tween: Tween,
}

impl Animate {
    pub fn new(property: AnimatedProperty, tween: Tween) -> Self {
        Self { property, tween }
    }
}

impl Effect for Animate {
    fn name(&self) -> &'static str {
        match self.property {
            AnimatedProperty::Opacity => "opacity",
            AnimatedProperty::Scale => "scale",
            AnimatedProperty::Rotate => "rotate",
        }
    }

    fn apply(
        &mut self,
        frame: Frame,
        frame_index: u64,
        fps: f64,
        ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        let v = self.tween.sample(EffectContext::seconds(frame_index, fps));
        match self.property {
            AnimatedProperty::Opacity => ctx.opacity = v.clamp(0.0, 1.0),
            AnimatedProperty::Scale => ctx.scale = v,
            AnimatedProperty::Rotate => ctx.rotate = v,
        }
        Ok(frame)
    }
}

/// Tweened position offset.
#[derive(Clone, Copy, Debug)]
pub struct Move {
    pub x: Tween,
    pub y: Tween,
}

impl Effect for Move {
    fn name(&self) -> &'static str {
        "move"
    }

    fn apply(
        &mut self,
        frame: Frame,
        frame_index: u64,
        fps: f64,
        ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        let t = EffectContext::seconds(frame_index, fps);
        ctx.x = self.x.sample(t);
        ctx.y = self.y.sample(t);
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/animate.rs"]
mod tests;
