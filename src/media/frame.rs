use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{EditorError, EditorResult};
use crate::foundation::math::mul_div255_u8;

/// Owned straight-alpha RGBA8 image.
///
/// Pixel storage is shared behind an `Arc`; clones are cheap and writes go through
/// [`Frame::data_mut`], which copies the buffer only when it is shared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Arc<Vec<u8>>,
}

impl Frame {
    /// Wrap an RGBA8 buffer of exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> EditorResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(EditorError::validation(format!(
                "frame buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: Arc::new(data),
        })
    }

    /// Frame filled with one color.
    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        let px = color.to_array();
        let n = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(n * 4);
        for _ in 0..n {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            data: Arc::new(data),
        }
    }

    /// Fully transparent frame.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba8::TRANSPARENT)
    }

    /// Zero-sized sentinel returned when no frame is available.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Arc::new(Vec::new()),
        }
    }

    /// Return `true` for the zero-sized sentinel.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel bytes; clones the buffer if another handle shares it.
    pub fn data_mut(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Return `true` when both frames share the same pixel storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// RGBA of pixel `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Take the pixel buffer, copying only if it is shared.
    pub fn into_vec(self) -> Vec<u8> {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| shared.as_ref().clone())
    }

    /// Premultiplied copy of the pixels.
    pub fn to_premul(&self) -> Vec<u8> {
        let mut out = self.data.as_ref().clone();
        premultiply_in_place(&mut out);
        out
    }

    /// Build a frame from premultiplied RGBA8 bytes.
    pub fn from_premul(width: u32, height: u32, mut premul: Vec<u8>) -> EditorResult<Self> {
        unpremultiply_in_place(&mut premul);
        Self::new(width, height, premul)
    }

    /// Copy of the `w x h` region at `(x, y)`, clipped to the frame.
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Self {
        let x0 = x.min(self.width);
        let y0 = y.min(self.height);
        let x1 = x.saturating_add(w).min(self.width);
        let y1 = y.saturating_add(h).min(self.height);
        let (cw, ch) = (x1 - x0, y1 - y0);
        let mut data = Vec::with_capacity((cw as usize) * (ch as usize) * 4);
        let stride = self.width as usize * 4;
        for row in y0..y1 {
            let off = row as usize * stride + x0 as usize * 4;
            data.extend_from_slice(&self.data[off..off + cw as usize * 4]);
        }
        Self {
            width: cw,
            height: ch,
            data: Arc::new(data),
        }
    }

    /// Convert to an `image` buffer (copies).
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.as_ref().clone())
    }

    /// Encode as PNG (format chosen from the file extension).
    pub fn save(&self, path: &Path) -> EditorResult<()> {
        let img = self
            .to_rgba_image()
            .ok_or_else(|| EditorError::validation("frame buffer does not match its size"))?;
        img.save(path)
            .with_context(|| format!("write image '{}'", path.display()))?;
        Ok(())
    }
}

impl From<image::RgbaImage> for Frame {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: Arc::new(img.into_raw()),
        }
    }
}

pub(crate) fn premultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = mul_div255_u8(u16::from(px[0]), a);
        px[1] = mul_div255_u8(u16::from(px[1]), a);
        px[2] = mul_div255_u8(u16::from(px[2]), a);
    }
}

pub(crate) fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/frame.rs"]
mod tests;
