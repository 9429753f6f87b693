use rayon::prelude::*;

use crate::effects::{Effect, EffectContext};
use crate::foundation::error::EditorResult;
use crate::media::frame::Frame;

/// Radial darkening toward the frame edges with an optional directional bias.
#[derive(Clone, Copy, Debug)]
pub struct Vignette {
    pub strength: f64,
    pub radius: f64,
    /// Bias direction in degrees.
    pub angle: f64,
}

impl Vignette {
    /// Brightness multiplier for pixel `(x, y)` of a `w x h` frame.
    pub fn factor(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        let (wf, hf) = (f64::from(w), f64::from(h));
        let aspect = wf / hf;
        let nx = (f64::from(x) / wf - 0.5) * aspect;
        let ny = f64::from(y) / hf - 0.5;
        let mut dist = (nx * nx + ny * ny).sqrt();
        if self.angle != 0.0 {
            let rad = self.angle.to_radians();
            dist += (nx * rad.cos() + ny * rad.sin()) * 0.3;
        }
        let inner = self.radius - 0.4;
        let t = ((dist - self.radius) / (inner - self.radius)).clamp(0.0, 1.0);
        let v = t * t * (3.0 - 2.0 * t);
        1.0 - (1.0 - v) * self.strength
    }
}

impl Effect for Vignette {
    fn name(&self) -> &'static str {
        "vignette"
    }

    fn apply(
        &mut self,
        mut frame: Frame,
        _frame_index: u64,
        _fps: f64,
        _ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        if frame.is_empty() || self.strength == 0.0 {
            return Ok(frame);
        }
        let (w, h) = (frame.width(), frame.height());
        let this = *self;
        frame
            .data_mut()
            .par_chunks_exact_mut(w as usize * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let f = this.factor(x as u32, y as u32, w, h);
                    if f == 1.0 {
                        continue;
                    }
                    for c in &mut px[..3] {
                        *c = (f64::from(*c) * f).round().clamp(0.0, 255.0) as u8;
                    }
                }
            });
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/vignette.rs"]
mod tests;
