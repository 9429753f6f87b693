use kurbo::{Ellipse, Rect, RoundedRect};

use crate::effects::blur::blur_plane;
use crate::effects::{Effect, EffectContext, MaskShape};
use crate::foundation::error::{EditorError, EditorResult};
use crate::foundation::math::mul_div255_u8;
use crate::media::decode::decode_luma;
use crate::media::frame::Frame;
use crate::render::surface::{new_context, render_premul, shape_path};

/// Multiplies frame alpha by a rasterized shape or image mask.
///
/// The coverage plane depends only on the frame size, so it is built once and reused until
/// the size changes.
#[derive(Debug)]
pub struct Mask {
    shape: MaskShape,
    bounds: Rect,
    feather: f64,
    invert: bool,
    opacity: f64,
    plane: Option<((u32, u32), Vec<u8>)>,
}

impl Mask {
    pub fn new(shape: MaskShape, bounds: Rect, feather: f64, invert: bool, opacity: f64) -> Self {
        Self {
            shape,
            bounds,
            feather,
            invert,
            opacity,
            plane: None,
        }
    }

    /// Coverage plane for a `w x h` frame, one byte per pixel.
    pub fn coverage(&mut self, w: u32, h: u32) -> EditorResult<&[u8]> {
        let stale = self.plane.as_ref().is_none_or(|(size, _)| *size != (w, h));
        if stale {
            let plane = self.rasterize(w, h)?;
            self.plane = Some(((w, h), plane));
        }
        match &self.plane {
            Some((_, plane)) => Ok(plane),
            None => Err(EditorError::effect("mask plane missing")),
        }
    }

    fn rasterize(&self, w: u32, h: u32) -> EditorResult<Vec<u8>> {
        let b = self.bounds.abs();
        if b.width() <= 0.0 || b.height() <= 0.0 {
            return Err(EditorError::effect("mask box is empty"));
        }

        let mut plane = match &self.shape {
            MaskShape::Image { path } => place_image(&decode_luma(path)?, b, w, h),
            shape => {
                let mut ctx = new_context(w, h)?;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
                match shape {
                    MaskShape::Rect => ctx.fill_path(&shape_path(&b)),
                    MaskShape::RoundedRect { radius } => {
                        ctx.fill_path(&shape_path(&RoundedRect::from_rect(b, *radius)))
                    }
                    _ => ctx.fill_path(&shape_path(&Ellipse::from_rect(b))),
                }
                render_premul(&mut ctx)
                    .chunks_exact(4)
                    .map(|px| px[3])
                    .collect()
            }
        };

        if self.feather > 0.0 {
            let radius = self.feather.ceil() as u32;
            let sigma = (self.feather / 2.0).max(0.5) as f32;
            plane = blur_plane(&plane, w, h, radius, sigma)?;
        }
        if self.invert {
            for v in &mut plane {
                *v = 255 - *v;
            }
        }
        Ok(plane)
    }
}

/// Stretch a luma image over `bounds` inside a `w x h` plane; outside the box coverage is 0.
fn place_image(luma: &(u32, u32, Vec<u8>), bounds: Rect, w: u32, h: u32) -> Vec<u8> {
    let (iw, ih, pixels) = luma;
    let mut plane = vec![0u8; w as usize * h as usize];
    if *iw == 0 || *ih == 0 {
        return plane;
    }
    for y in 0..h {
        let fy = (f64::from(y) + 0.5 - bounds.y0) / bounds.height();
        if !(0.0..1.0).contains(&fy) {
            continue;
        }
        let sy = ((fy * f64::from(*ih)) as u32).min(ih - 1);
        for x in 0..w {
            let fx = (f64::from(x) + 0.5 - bounds.x0) / bounds.width();
            if !(0.0..1.0).contains(&fx) {
                continue;
            }
            let sx = ((fx * f64::from(*iw)) as u32).min(iw - 1);
            plane[(y * w + x) as usize] = pixels[(sy * iw + sx) as usize];
        }
    }
    plane
}

impl Effect for Mask {
    fn name(&self) -> &'static str {
        "mask"
    }

    fn apply(
        &mut self,
        mut frame: Frame,
        _frame_index: u64,
        _fps: f64,
        ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        if frame.is_empty() {
            return Ok(frame);
        }
        let opacity = (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u16;
        let (w, h) = (frame.width(), frame.height());
        let plane = self.coverage(w, h)?;
        for (px, &m) in frame.data_mut().chunks_exact_mut(4).zip(plane) {
            let m = mul_div255_u8(u16::from(m), opacity);
            px[3] = mul_div255_u8(u16::from(px[3]), u16::from(m));
        }
        ctx.force_bgra = true;
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/mask.rs"]
mod tests;
