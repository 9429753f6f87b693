use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use lru::LruCache;

use crate::effects::{Effect, EffectContext};
use crate::foundation::core::{Affine, Rgba8};
use crate::foundation::error::{EditorError, EditorResult};
use crate::media::frame::Frame;
use crate::render::composite::blend_frame_at;
use crate::render::surface::{affine_to_cpu, frame_to_paint, new_context, render_premul};
use crate::timeline::layer::{TextAlign, TextStyle};

/// RGBA8 brush color carried through Parley layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrush {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl From<Rgba8> for TextBrush {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Everything that changes the rasterized bitmap.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TextKey {
    content: String,
    font: PathBuf,
    size: u32,
    color: Rgba8,
    stroke_color: Rgba8,
    stroke_width: u32,
    align: TextAlign,
    max_width: Option<u32>,
    line_height: u32,
    scale: u64,
}

impl TextKey {
    fn new(style: &TextStyle, scale: f64) -> Self {
        Self {
            content: style.content.clone(),
            font: style.font.clone(),
            size: style.size.to_bits(),
            color: style.color,
            stroke_color: style.stroke_color,
            stroke_width: style.stroke_width.to_bits(),
            align: style.align,
            max_width: style.max_width.map(f32::to_bits),
            line_height: style.line_height.to_bits(),
            scale: scale.to_bits(),
        }
    }
}

struct TextEntry {
    base: Frame,
    rotated: Option<(u64, Frame)>,
}

struct LoadedFont {
    family: String,
    data: vello_cpu::peniko::FontData,
}

struct PlacedRun {
    brush: TextBrush,
    font_size: f32,
    glyphs: Vec<vello_cpu::Glyph>,
}

/// Text rasterizer with a bitmap cache.
///
/// Bitmaps are cached per style and scale. Rotated variants are derived lazily from the cached
/// bitmap and kept until the requested rotation changes.
pub struct TextRenderer {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    fonts: HashMap<PathBuf, LoadedFont>,
    cache: LruCache<TextKey, TextEntry>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("fonts", &self.fonts.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl TextRenderer {
    /// Create a renderer caching up to `capacity` bitmaps.
    pub fn new(capacity: usize) -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fonts: HashMap::new(),
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Number of cached bitmaps.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Straight-alpha bitmap of `style` rendered at `scale`.
    pub fn render(&mut self, style: &TextStyle, scale: f64) -> EditorResult<Frame> {
        let key = TextKey::new(style, scale);
        if let Some(entry) = self.cache.get(&key) {
            return Ok(entry.base.clone());
        }
        let base = self.rasterize(style, scale)?;
        self.cache.put(
            key,
            TextEntry {
                base: base.clone(),
                rotated: None,
            },
        );
        Ok(base)
    }

    /// Like [`TextRenderer::render`], rotated by `degrees` about the bitmap centre.
    ///
    /// The rotated bitmap is recomputed only when `degrees` differs from the previous call for
    /// the same style.
    pub fn render_rotated(
        &mut self,
        style: &TextStyle,
        scale: f64,
        degrees: f64,
    ) -> EditorResult<Frame> {
        let base = self.render(style, scale)?;
        if degrees.rem_euclid(360.0) == 0.0 {
            return Ok(base);
        }
        let key = TextKey::new(style, scale);
        let bits = degrees.to_bits();
        if let Some(entry) = self.cache.get(&key)
            && let Some((cached_bits, frame)) = &entry.rotated
            && *cached_bits == bits
        {
            return Ok(frame.clone());
        }

        let rotated = rotate_frame(&base, degrees)?;
        if let Some(entry) = self.cache.get_mut(&key) {
            entry.rotated = Some((bits, rotated.clone()));
        }
        Ok(rotated)
    }

    fn load_font(&mut self, path: &Path) -> EditorResult<(String, vello_cpu::peniko::FontData)> {
        if let Some(f) = self.fonts.get(path) {
            return Ok((f.family.clone(), f.data.clone()));
        }
        let (bytes, index) = if path.as_os_str().is_empty() {
            system_sans_serif()?
        } else {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read font '{}'", path.display()))?;
            (bytes, 0)
        };
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| EditorError::validation("no font families registered from font file"))?;
        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| EditorError::validation("registered font family has no name"))?
            .to_string();
        let data = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), index);
        self.fonts.insert(
            path.to_path_buf(),
            LoadedFont {
                family: family.clone(),
                data: data.clone(),
            },
        );
        Ok((family, data))
    }

    fn rasterize(&mut self, style: &TextStyle, scale: f64) -> EditorResult<Frame> {
        let size_px = style.size * scale as f32;
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(EditorError::validation("text size must be finite and > 0"));
        }
        if style.content.is_empty() {
            return Ok(Frame::transparent(1, 1));
        }
        let (family, font) = self.load_font(&style.font)?;
        let max_width = style.max_width.map(|w| w * scale as f32);

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, &style.content, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrush::from(
            style.color,
        )));
        let mut layout: parley::Layout<TextBrush> = builder.build(&style.content);
        layout.break_all_lines(max_width);
        layout.align(
            max_width,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );

        let extra_spacing = (style.line_height - 1.0).max(0.0) * size_px;
        let mut lines: Vec<(f32, Vec<PlacedRun>)> = Vec::new();
        for (li, line) in layout.lines().enumerate() {
            let dy = li as f32 * extra_spacing;
            let mut right = 0.0f32;
            let mut runs = Vec::new();
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs: Vec<vello_cpu::Glyph> = run
                    .positioned_glyphs()
                    .map(|g| {
                        right = right.max(g.x + g.advance);
                        vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y + dy,
                        }
                    })
                    .collect();
                runs.push(PlacedRun {
                    brush: run.style().brush,
                    font_size: run.run().font_size(),
                    glyphs,
                });
            }
            lines.push((right, runs));
        }

        let text_w = max_width
            .unwrap_or_else(|| lines.iter().map(|(w, _)| *w).fold(0.0, f32::max))
            .max(1.0);
        let text_h = layout.height() + extra_spacing * lines.len().saturating_sub(1) as f32;
        let stroke = (style.stroke_width * scale as f32).max(0.0);
        let pad = stroke.ceil() + 1.0;
        let w = (text_w + 2.0 * pad).ceil() as u32;
        let h = (text_h.max(1.0) + 2.0 * pad).ceil() as u32;

        let mut ctx = new_context(w, h)?;
        let line_dx = |line_w: f32| match style.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (text_w - line_w) * 0.5,
            TextAlign::Right => text_w - line_w,
        };

        if stroke > 0.0 {
            let c = style.stroke_color;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
            for (ox, oy) in dilation_offsets(stroke) {
                for (line_w, runs) in &lines {
                    let dx = pad + line_dx(*line_w) + ox;
                    for run in runs {
                        ctx.glyph_run(&font)
                            .font_size(run.font_size)
                            .fill_glyphs(run.glyphs.iter().map(|g| vello_cpu::Glyph {
                                id: g.id,
                                x: g.x + dx,
                                y: g.y + pad + oy,
                            }));
                    }
                }
            }
        }

        for (line_w, runs) in &lines {
            let dx = pad + line_dx(*line_w);
            for run in runs {
                let b = run.brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                ctx.glyph_run(&font)
                    .font_size(run.font_size)
                    .fill_glyphs(run.glyphs.iter().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x + dx,
                        y: g.y + pad,
                    }));
            }
        }

        Frame::from_premul(w, h, render_premul(&mut ctx))
    }
}

/// Offsets sampling a disc of radius `r`, used to fake an outline by drawing the glyphs
/// repeatedly in the stroke color.
/// Face used when a style names no font file: the system sans-serif family, else any
/// installed face.
pub(crate) fn system_sans_serif() -> EditorResult<(Vec<u8>, u32)> {
    use usvg::fontdb::{Database, Family, Query};

    let mut db = Database::new();
    db.load_system_fonts();
    let query = Query {
        families: &[
            Family::SansSerif,
            Family::Name("DejaVu Sans"),
            Family::Name("Liberation Sans"),
            Family::Name("Noto Sans"),
        ],
        ..Query::default()
    };
    let id = db
        .query(&query)
        .or_else(|| db.faces().next().map(|face| face.id));
    tracing::debug!(faces = db.len(), found = id.is_some(), "system font lookup");
    id.and_then(|id| db.with_face_data(id, |data, index| (data.to_vec(), index)))
        .ok_or_else(|| {
            EditorError::validation("text style names no font and no system font is installed")
        })
}

fn dilation_offsets(r: f32) -> Vec<(f32, f32)> {
    let mut out = Vec::new();
    for (radius, steps) in [(r, 16), (r * 0.5, 8)] {
        for i in 0..steps {
            let a = std::f32::consts::TAU * i as f32 / steps as f32;
            out.push((radius * a.cos(), radius * a.sin()));
        }
    }
    out
}

/// Rotate `frame` clockwise by `degrees` about its centre into a bitmap that fits the result.
pub fn rotate_frame(frame: &Frame, degrees: f64) -> EditorResult<Frame> {
    let (w, h) = (f64::from(frame.width()), f64::from(frame.height()));
    let rad = degrees.to_radians();
    let (s, c) = (rad.sin().abs(), rad.cos().abs());
    let rw = (w * c + h * s - 1e-6).ceil().max(1.0);
    let rh = (w * s + h * c - 1e-6).ceil().max(1.0);

    let mut ctx = new_context(rw as u32, rh as u32)?;
    let xf = Affine::translate((rw * 0.5, rh * 0.5))
        * Affine::rotate(rad)
        * Affine::translate((-w * 0.5, -h * 0.5));
    ctx.set_transform(affine_to_cpu(xf));
    ctx.set_paint(frame_to_paint(frame)?);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
    Frame::from_premul(rw as u32, rh as u32, render_premul(&mut ctx))
}

/// Draws styled text over the layer through [`EffectContext::overlay_frame`].
pub struct TextOverlay {
    style: TextStyle,
    x: f64,
    y: f64,
    renderer: TextRenderer,
}

impl TextOverlay {
    pub fn new(style: TextStyle, x: f64, y: f64) -> Self {
        Self {
            style,
            x,
            y,
            renderer: TextRenderer::new(4),
        }
    }
}

impl Effect for TextOverlay {
    fn name(&self) -> &'static str {
        "text_overlay"
    }

    fn apply(
        &mut self,
        frame: Frame,
        _frame_index: u64,
        _fps: f64,
        ctx: &mut EffectContext,
    ) -> EditorResult<Frame> {
        if frame.is_empty() {
            return Err(EditorError::effect("text overlay needs a non-empty layer"));
        }
        let text = self.renderer.render(&self.style, 1.0)?;
        let mut overlay = ctx
            .overlay_frame
            .take()
            .filter(|o| o.width() == frame.width() && o.height() == frame.height())
            .unwrap_or_else(|| Frame::transparent(frame.width(), frame.height()));
        blend_frame_at(
            &mut overlay,
            &text,
            self.x.round() as i64,
            self.y.round() as i64,
            1.0,
        );
        ctx.overlay_frame = Some(overlay);
        ctx.force_bgra = true;
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/text.rs"]
mod tests;
