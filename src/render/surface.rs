use std::sync::Arc;

use crate::foundation::core::Affine;
use crate::foundation::error::{EditorError, EditorResult};
use crate::media::frame::Frame;

/// Validate raster dimensions for `vello_cpu`, which addresses pixels with `u16`.
pub(crate) fn dims_u16(width: u32, height: u32) -> EditorResult<(u16, u16)> {
    if width == 0 || height == 0 {
        return Err(EditorError::validation("raster surface must be non-empty"));
    }
    let w: u16 = width
        .try_into()
        .map_err(|_| EditorError::validation("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| EditorError::validation("surface height exceeds u16"))?;
    Ok((w, h))
}

/// Fresh render context with the default blend mode and identity paint transform.
pub(crate) fn new_context(width: u32, height: u32) -> EditorResult<vello_cpu::RenderContext> {
    let (w, h) = dims_u16(width, height)?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    Ok(ctx)
}

/// Wrap a straight-alpha frame as an image paint (premultiplied pixmap).
pub(crate) fn frame_to_paint(frame: &Frame) -> EditorResult<vello_cpu::Image> {
    let (w, h) = dims_u16(frame.width(), frame.height())?;
    let premul = frame.to_premul();
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = premul
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Rasterize everything drawn into `ctx` and return premultiplied RGBA8 bytes.
pub(crate) fn render_premul(ctx: &mut vello_cpu::RenderContext) -> Vec<u8> {
    let mut pixmap = vello_cpu::Pixmap::new(ctx.width(), ctx.height());
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    pixmap.data_as_u8_slice().to_vec()
}

/// Flatten a `kurbo` shape into a `vello_cpu` path.
pub(crate) fn shape_path(shape: &impl kurbo::Shape) -> vello_cpu::kurbo::BezPath {
    let mut p = vello_cpu::kurbo::BezPath::new();
    for el in shape.path_elements(0.1) {
        p.push(el);
    }
    p
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
