use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{EditorError, EditorResult};
use crate::media::frame::Frame;

/// File extensions decoded once as still images instead of opened as video.
pub const STILL_IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "gif", "webp", "tif", "tiff", "tga", "svg",
];

const MAX_SVG_DIM: u32 = 16_384;

/// Return `true` when `path` has a still-image extension (case-insensitive).
pub fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            STILL_IMAGE_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

/// Decode a still image file into a straight-alpha frame. SVG files are rasterized at their
/// intrinsic size.
pub fn decode_still(path: &Path) -> EditorResult<Frame> {
    let bytes = std::fs::read(path)
        .map_err(|e| EditorError::source_open(path, format!("read failed: {e}")))?;
    let decoded = if is_svg(path) {
        rasterize_svg(&bytes)
    } else {
        decode_image(&bytes)
    };
    decoded.map_err(|e| EditorError::source_open(path, e.to_string()))
}

/// Decode raster image bytes (any format the `image` crate recognises).
pub fn decode_image(bytes: &[u8]) -> EditorResult<Frame> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(Frame::from(dyn_img.to_rgba8()))
}

/// Decode a grayscale mask image; the luma of each pixel becomes a coverage value.
pub fn decode_luma(path: &Path) -> EditorResult<(u32, u32, Vec<u8>)> {
    let img = image::open(path)
        .with_context(|| format!("open mask image '{}'", path.display()))?
        .to_luma8();
    let (w, h) = img.dimensions();
    Ok((w, h, img.into_raw()))
}

/// Parse and rasterize an SVG document at its intrinsic size.
pub fn rasterize_svg(bytes: &[u8]) -> EditorResult<Frame> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    let to_px = |v: f32| -> EditorResult<u32> {
        if !v.is_finite() || v <= 0.0 {
            return Err(EditorError::validation("svg has invalid width/height"));
        }
        Ok((v.ceil() as u32).clamp(1, MAX_SVG_DIM))
    };
    let (w, h) = (to_px(size.width())?, to_px(size.height())?);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| EditorError::validation("failed to allocate svg pixmap"))?;
    let xform = resvg::tiny_skia::Transform::from_scale(
        w as f32 / size.width(),
        h as f32 / size.height(),
    );
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    // tiny-skia pixmaps are premultiplied.
    Frame::from_premul(w, h, pixmap.take())
}

#[cfg(test)]
#[path = "../../tests/unit/media/decode.rs"]
mod tests;
