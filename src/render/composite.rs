use crate::foundation::core::Rgba8;
use crate::foundation::error::{EditorError, EditorResult};
use crate::foundation::math::mul_div255_u16;
use crate::media::frame::Frame;

pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over with an extra opacity factor.
///
/// A fully transparent source (or zero opacity) returns `dst` unchanged.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u16(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255 - sa;

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255_u16(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u16(u16::from(src[i]), op);
        let dc = mul_div255_u16(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// [`over`] applied pixel by pixel to equal-length premultiplied buffers.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> EditorResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(EditorError::validation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Blend straight-alpha `src` over straight-alpha `dst` with `src`'s top-left at `(x, y)`.
/// Parts of `src` outside `dst` are clipped.
pub fn blend_frame_at(dst: &mut Frame, src: &Frame, x: i64, y: i64, opacity: f32) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    let (sw, sh) = (i64::from(src.width()), i64::from(src.height()));
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let src_px = src.data();
    let dst_px = dst.data_mut();
    for dy in y0..y1 {
        for dx in x0..x1 {
            let si = (((dy - y) * sw + (dx - x)) * 4) as usize;
            let di = ((dy * dw + dx) * 4) as usize;
            let s = premul_px(&src_px[si..si + 4]);
            if s[3] == 0 {
                continue;
            }
            let d = premul_px(&dst_px[di..di + 4]);
            let out = unpremul_px(over(d, s, opacity));
            dst_px[di..di + 4].copy_from_slice(&out);
        }
    }
}

/// Flatten premultiplied RGBA8 over an opaque background into packed RGB24.
pub fn flatten_to_rgb24(premul: &[u8], bg: Rgba8) -> Vec<u8> {
    let mut out = Vec::with_capacity(premul.len() / 4 * 3);
    for px in premul.chunks_exact(4) {
        let inv = 255 - u16::from(px[3]);
        out.push(add_sat_u8(u16::from(px[0]), mul_div255_u16(u16::from(bg.r), inv)));
        out.push(add_sat_u8(u16::from(px[1]), mul_div255_u16(u16::from(bg.g), inv)));
        out.push(add_sat_u8(u16::from(px[2]), mul_div255_u16(u16::from(bg.b), inv)));
    }
    out
}

fn premul_px(px: &[u8]) -> PremulRgba8 {
    let a = u16::from(px[3]);
    [
        mul_div255_u16(u16::from(px[0]), a) as u8,
        mul_div255_u16(u16::from(px[1]), a) as u8,
        mul_div255_u16(u16::from(px[2]), a) as u8,
        px[3],
    ]
}

fn unpremul_px(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    if a == 255 {
        return px;
    }
    let un = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [un(px[0]), un(px[1]), un(px[2]), px[3]]
}

fn add_sat_u8(a: u16, b: u16) -> u8 {
    (a + b).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
