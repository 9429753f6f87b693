use crate::effects::{Effect, EffectContext};
use crate::foundation::error::EditorResult;
use crate::foundation::math::mul_div255_u8;
use crate::media::frame::Frame;

/// Per-edge linear alpha falloff, widths in pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct Feather {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

fn ramp(dist: u32, width: u32) -> f32 {
    if width == 0 {
        return 1.0;
    }
    ((dist as f32 + 0.5) / width as f32).min(1.0)
}

impl Feather {
    /// Alpha multiplier for pixel `(x, y)` in `[0, 1]`.
    pub fn coverage(&self, x: u32, y: u32, w: u32, h: u32) -> f32 {
        ramp(x, self.left)
            .min(ramp(w - 1 - x, self.right))
            .min(ramp(y, self.top))
            .min(ramp(h - 1 - y, self.bottom))
    }
}

impl Effect for Feather {
    fn name(&self) -> &'static str {
        "feather"
    }

    fn apply(
        &mut self,
        mut frame: Frame,
        _frame_index: u64,
        _fps: f64,
        ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        if frame.is_empty() || (self.top | self.right | self.bottom | self.left) == 0 {
            return Ok(frame);
        }
        let (w, h) = (frame.width(), frame.height());
        let data = frame.data_mut();
        for y in 0..h {
            for x in 0..w {
                let c = self.coverage(x, y, w, h);
                if c >= 1.0 {
                    continue;
                }
                let i = ((y * w + x) as usize) * 4 + 3;
                let m = (c * 255.0).round() as u16;
                data[i] = mul_div255_u8(u16::from(data[i]), m);
            }
        }
        ctx.force_bgra = true;
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/feather.rs"]
mod tests;
