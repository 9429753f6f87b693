use crate::effects::{Effect, EffectContext};
use crate::foundation::error::{EditorError, EditorResult};
use crate::media::frame::{Frame, premultiply_in_place, unpremultiply_in_place};

/// Gaussian blur of a rectangular region of the frame.
#[derive(Clone, Copy, Debug)]
pub struct BlurRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub size: u32,
}

impl Effect for BlurRegion {
    fn name(&self) -> &'static str {
        "blur_region"
    }

    fn apply(
        &mut self,
        mut frame: Frame,
        _frame_index: u64,
        _fps: f64,
        _ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        let x0 = self.x.min(frame.width());
        let y0 = self.y.min(frame.height());
        let x1 = self.x.saturating_add(self.width).min(frame.width());
        let y1 = self.y.saturating_add(self.height).min(frame.height());
        if x1 <= x0 || y1 <= y0 {
            return Err(EditorError::effect("blur region is empty after clipping"));
        }

        let k = kernel_size(self.size);
        let radius = k / 2;
        if radius == 0 {
            return Ok(frame);
        }

        let region = frame.crop(x0, y0, x1 - x0, y1 - y0);
        let (rw, rh) = (region.width(), region.height());
        let mut premul = region.into_vec();
        premultiply_in_place(&mut premul);
        let mut blurred = blur_rgba8(&premul, rw, rh, radius, sigma_for_kernel(k))?;
        unpremultiply_in_place(&mut blurred);

        let stride = frame.width() as usize * 4;
        let row_len = rw as usize * 4;
        let data = frame.data_mut();
        for (row, src) in blurred.chunks_exact(row_len).enumerate() {
            let off = (y0 as usize + row) * stride + x0 as usize * 4;
            data[off..off + row_len].copy_from_slice(src);
        }
        Ok(frame)
    }
}

/// Force a kernel size to be odd.
pub fn kernel_size(size: u32) -> u32 {
    size | 1
}

/// Gaussian sigma for an odd kernel size `k`.
pub fn sigma_for_kernel(k: u32) -> f32 {
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Separable Gaussian blur of an interleaved RGBA8 buffer.
pub fn blur_rgba8(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> EditorResult<Vec<u8>> {
    blur_interleaved::<4>(src, width, height, radius, sigma)
}

/// Separable Gaussian blur of a single-channel plane.
pub fn blur_plane(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> EditorResult<Vec<u8>> {
    blur_interleaved::<1>(src, width, height, radius, sigma)
}

fn blur_interleaved<const C: usize>(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> EditorResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(C))
        .ok_or_else(|| EditorError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(EditorError::validation(
            "blur expects a buffer matching width*height*channels",
        ));
    }
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];
    horizontal_pass::<C>(src, &mut tmp, width, height, &kernel);
    vertical_pass::<C>(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

pub(crate) fn gaussian_kernel_q16(radius: u32, sigma: f32) -> EditorResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(EditorError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(EditorError::validation("gaussian kernel sum is zero"));
    }

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn horizontal_pass<const C: usize>(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; C];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * C;
                for c in 0..C {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * C;
            for c in 0..C {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass<const C: usize>(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; C];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * C;
                for c in 0..C {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * C;
            for c in 0..C {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
