use rayon::prelude::*;

use crate::effects::{Effect, EffectContext};
use crate::foundation::core::Rgba8;
use crate::foundation::error::EditorResult;
use crate::media::frame::Frame;
use crate::timeline::layer::ChromaKeyParams;

/// Alpha from Euclidean RGB distance to a key color.
///
/// The computed alpha replaces the frame's alpha outright.
#[derive(Clone, Copy, Debug)]
pub struct ChromaKey {
    pub key_color: Rgba8,
    pub threshold: f32,
    pub softness: f32,
}

impl ChromaKey {
    /// Alpha for one pixel.
    pub fn alpha_for(&self, r: u8, g: u8, b: u8) -> u8 {
        let dr = f32::from(r) - f32::from(self.key_color.r);
        let dg = f32::from(g) - f32::from(self.key_color.g);
        let db = f32::from(b) - f32::from(self.key_color.b);
        let d = (dr * dr + dg * dg + db * db).sqrt();
        if self.softness <= 0.0 {
            return if d > self.threshold { 255 } else { 0 };
        }
        let a = ((d - self.threshold) / self.softness).clamp(0.0, 1.0);
        (a * 255.0).round() as u8
    }
}

impl Effect for ChromaKey {
    fn name(&self) -> &'static str {
        "chroma_key"
    }

    fn apply(
        &mut self,
        mut frame: Frame,
        _frame_index: u64,
        _fps: f64,
        ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        let key = *self;
        frame.data_mut().par_chunks_exact_mut(4).for_each(|px| {
            px[3] = key.alpha_for(px[0], px[1], px[2]);
        });
        ctx.force_bgra = true;
        Ok(frame)
    }
}

/// Green spill suppression.
#[derive(Clone, Copy, Debug)]
pub struct Despill {
    /// Blend factor in `[0, 1]`.
    pub strength: f32,
}

impl Despill {
    pub fn despill_px(&self, px: &mut [u8]) {
        let avg = (f32::from(px[0]) + f32::from(px[2])) * 0.5;
        let g = f32::from(px[1]);
        if g > avg {
            let s = self.strength.clamp(0.0, 1.0);
            px[1] = (g - (g - avg) * s).round().clamp(0.0, 255.0) as u8;
        }
    }
}

impl Effect for Despill {
    fn name(&self) -> &'static str {
        "despill"
    }

    fn apply(
        &mut self,
        mut frame: Frame,
        _frame_index: u64,
        _fps: f64,
        _ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        if self.strength <= 0.0 {
            return Ok(frame);
        }
        let this = *self;
        frame
            .data_mut()
            .par_chunks_exact_mut(4)
            .for_each(|px| this.despill_px(px));
        Ok(frame)
    }
}

/// Key then despill a resolved layer frame according to `params`.
pub fn apply_chroma_key(frame: Frame, params: &ChromaKeyParams, ctx: &mut EffectContext) -> Frame {
    let mut key = ChromaKey {
        key_color: params.key_color,
        threshold: params.threshold,
        softness: params.softness,
    };
    let mut despill = Despill {
        strength: params.despill,
    };
    let keyed = match key.apply(frame.clone(), 0, 0.0, ctx) {
        Ok(f) => f,
        Err(_) => return frame,
    };
    despill.apply(keyed.clone(), 0, 0.0, ctx).unwrap_or(keyed)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/chroma.rs"]
mod tests;
