use std::collections::HashMap;
use std::path::PathBuf;

use crate::effects::chroma::apply_chroma_key;
use crate::effects::text::TextRenderer;
use crate::effects::{EffectContext, EffectPipeline, EffectSpec};
use crate::foundation::config::EngineConfig;
use crate::foundation::core::{Affine, Canvas, Fps, Rgba8};
use crate::foundation::error::EditorResult;
use crate::foundation::math::clamp01;
use crate::media::frame::Frame;
use crate::media::provider::FrameProvider;
use crate::render::composite::{blend_frame_at, over_in_place};
use crate::render::surface::{affine_to_cpu, dims_u16, frame_to_paint, new_context, render_premul};
use crate::timeline::engine::TimelineEngine;
use crate::timeline::layer::{LayerKind, LayerModel};

struct LayerEffects {
    specs: Vec<EffectSpec>,
    pipeline: EffectPipeline,
}

/// A resolved layer bitmap and the canvas transform that places it.
struct Placed {
    frame: Frame,
    transform: Affine,
    opacity: f64,
}

/// Builds the output frame for a timeline instant.
///
/// Owns its own [`FrameProvider`] and [`TextRenderer`]; preview and render each create one.
/// Per-layer effect pipelines are kept between frames so stateful effects (mask rasters, text
/// overlays) are not rebuilt every frame.
pub struct Compositor {
    canvas: Canvas,
    fps: Fps,
    background: Rgba8,
    provider: FrameProvider,
    text: TextRenderer,
    effects: HashMap<String, LayerEffects>,
    sources: HashMap<String, PathBuf>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("canvas", &self.canvas)
            .field("fps", &self.fps)
            .field("layers", &self.effects.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl Compositor {
    /// Create a compositor for `cfg.canvas`.
    ///
    /// Fails when the canvas is empty or too large for the raster backend.
    pub fn new(cfg: &EngineConfig) -> EditorResult<Self> {
        cfg.validate()?;
        dims_u16(cfg.canvas.width, cfg.canvas.height)?;
        Ok(Self {
            canvas: cfg.canvas,
            fps: cfg.fps,
            background: cfg.background,
            provider: FrameProvider::new(cfg),
            text: TextRenderer::new(cfg.text_cache_entries),
            effects: HashMap::new(),
            sources: HashMap::new(),
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Borrow the frame provider (source registration state, open handles).
    pub fn provider(&self) -> &FrameProvider {
        &self.provider
    }

    /// Composite `layers` (already filtered to the active set, ascending z-order) at time `t`.
    ///
    /// Layers that cannot be resolved are skipped; the result is always a full canvas frame.
    #[tracing::instrument(skip(self, layers), fields(layers = layers.len()))]
    pub fn compose_frame(&mut self, t: f64, layers: &[LayerModel]) -> Frame {
        let (w, h) = (self.canvas.width, self.canvas.height);
        let mut canvas = Frame::filled(w, h, self.background).to_premul();
        let frame_index = self.fps.secs_to_frame_round(t);

        for layer in layers {
            if !layer.kind.is_visual() {
                continue;
            }
            let Some(placed) = self.place_layer(layer, t, frame_index) else {
                continue;
            };
            if placed.opacity <= 0.0 || placed.frame.is_empty() {
                continue;
            }
            if let Err(e) = draw_layer(&mut canvas, w, h, &placed) {
                tracing::warn!(layer = %layer.id, error = %e, "layer draw failed; skipped");
            }
        }

        match Frame::from_premul(w, h, canvas) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "canvas conversion failed");
                Frame::filled(w, h, self.background)
            }
        }
    }

    /// Composite the active layers of `engine` at `t`.
    pub fn compose_at(&mut self, engine: &TimelineEngine, t: f64) -> Frame {
        let layers = engine.get_active_layers(t);
        self.compose_frame(t, &layers)
    }

    /// Decode ahead for the video layers in `layers` at the timeline instants `times`.
    ///
    /// Each layer is warmed at the same layer-local times [`Compositor::compose_frame`] will
    /// look up, restricted to the instants where the layer is active. Layers active at none
    /// of `times` are left alone.
    pub fn prefetch(&mut self, layers: &[LayerModel], times: &[f64]) {
        for layer in layers.iter().filter(|l| l.kind == LayerKind::Video) {
            let local: Vec<f64> = times
                .iter()
                .filter(|&&t| layer.time.contains(t))
                .map(|&t| (t - layer.time.start).max(0.0))
                .collect();
            if local.is_empty() || !self.ensure_source(layer) {
                continue;
            }
            self.provider.prefetch_layer(&layer.id, &local);
        }
    }

    /// Drop the cached state of one layer (after it was removed from the timeline).
    pub fn forget_layer(&mut self, id: &str) {
        self.effects.remove(id);
        if self.sources.remove(id).is_some() {
            self.provider.unregister_source(id);
        }
    }

    /// Close every source and drop all per-layer state.
    pub fn release_all(&mut self) {
        self.provider.release_all();
        self.effects.clear();
        self.sources.clear();
    }

    /// Register the layer's media with the provider when its path is new or changed.
    fn ensure_source(&mut self, layer: &LayerModel) -> bool {
        let Some(path) = layer.props.source.as_ref() else {
            return false;
        };
        if self.sources.get(&layer.id) == Some(path) {
            return true;
        }
        if let Err(e) = self.provider.register_source(&layer.id, path) {
            tracing::debug!(layer = %layer.id, error = %e, "source failed to open");
        }
        self.sources.insert(layer.id.clone(), path.clone());
        true
    }

    fn resolve(&mut self, layer: &LayerModel, t: f64) -> Option<Frame> {
        let local = (t - layer.time.start).max(0.0);
        let frame = match layer.kind {
            LayerKind::Video | LayerKind::Image => {
                if !self.ensure_source(layer) {
                    tracing::debug!(layer = %layer.id, "media layer has no source");
                    return None;
                }
                self.provider.get_layer_frame(&layer.id, local)
            }
            LayerKind::Text | LayerKind::Caption => {
                let style = layer.props.text.as_ref()?;
                match self.text.render(style, 1.0) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::debug!(layer = %layer.id, error = %e, "text render failed");
                        return None;
                    }
                }
            }
            LayerKind::Background => Frame::filled(
                self.canvas.width,
                self.canvas.height,
                layer.props.fill.unwrap_or(Rgba8::BLACK),
            ),
            LayerKind::Audio => return None,
        };

        if frame.is_empty() {
            tracing::debug!(layer = %layer.id, t, "no frame for layer");
            return None;
        }
        Some(frame)
    }

    fn pipeline_for(&mut self, layer: &LayerModel) -> &mut EffectPipeline {
        let entry = self
            .effects
            .entry(layer.id.clone())
            .or_insert_with(|| LayerEffects {
                specs: Vec::new(),
                pipeline: EffectPipeline::new(),
            });
        if entry.specs != layer.props.effects {
            entry.specs = layer.props.effects.clone();
            entry.pipeline = EffectPipeline::from_specs(&entry.specs);
        }
        &mut entry.pipeline
    }

    fn place_layer(&mut self, layer: &LayerModel, t: f64, frame_index: u64) -> Option<Placed> {
        let resolved = self.resolve(layer, t)?;
        let mut ctx = EffectContext::default();

        let mut frame = match &layer.props.chroma_key {
            Some(params) => apply_chroma_key(resolved.clone(), params, &mut ctx),
            None => resolved.clone(),
        };
        let fps = self.fps.as_f64();
        frame = self.pipeline_for(layer).run(frame, frame_index, fps, &mut ctx);

        let overlay = ctx.overlay_frame.take();
        if let Some(overlay) = &overlay {
            blend_frame_at(&mut frame, overlay, 0, 0, 1.0);
        }
        if layer.kind == LayerKind::Video && !ctx.force_bgra {
            force_opaque(&mut frame);
        }

        let tr = &layer.props.transform;
        let opacity = clamp01(tr.opacity * ctx.opacity);
        let sx = tr.scale_x * ctx.scale;
        let sy = tr.scale_y * ctx.scale;
        let degrees = tr.rotation + ctx.rotate;
        let (x, y) = (tr.x + ctx.x, tr.y + ctx.y);

        // Untouched text is re-rasterized at its final scale and rotation (both cached) instead
        // of being resampled.
        if matches!(layer.kind, LayerKind::Text | LayerKind::Caption)
            && frame.ptr_eq(&resolved)
            && sx == sy
            && sx > 0.0
            && let Some(style) = layer.props.text.as_ref()
            && let Ok(scaled) = self.text.render(style, sx)
            && let Ok(rotated) = self.text.render_rotated(style, sx, degrees)
        {
            let cx = x + f64::from(scaled.width()) * 0.5;
            let cy = y + f64::from(scaled.height()) * 0.5;
            let transform = Affine::translate((
                cx - f64::from(rotated.width()) * 0.5,
                cy - f64::from(rotated.height()) * 0.5,
            ));
            return Some(Placed {
                frame: rotated,
                transform,
                opacity,
            });
        }

        let transform = layer_transform(frame.width(), frame.height(), x, y, sx, sy, degrees);
        Some(Placed {
            frame,
            transform,
            opacity,
        })
    }
}

/// Canvas transform for a `w`×`h` layer bitmap.
///
/// The scaled box has its top-left at `(x, y)`; rotation (clockwise degrees) and scale are
/// about the box centre.
pub fn layer_transform(w: u32, h: u32, x: f64, y: f64, sx: f64, sy: f64, degrees: f64) -> Affine {
    let (w, h) = (f64::from(w), f64::from(h));
    let cx = x + w * sx * 0.5;
    let cy = y + h * sy * 0.5;
    Affine::translate((cx, cy))
        * Affine::rotate(degrees.to_radians())
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate((-w * 0.5, -h * 0.5))
}

fn force_opaque(frame: &mut Frame) {
    if frame.data().chunks_exact(4).all(|px| px[3] == 255) {
        return;
    }
    for px in frame.data_mut().chunks_exact_mut(4) {
        px[3] = 255;
    }
}

fn draw_layer(canvas: &mut [u8], w: u32, h: u32, placed: &Placed) -> EditorResult<()> {
    let mut ctx = new_context(w, h)?;
    ctx.set_transform(affine_to_cpu(placed.transform));
    ctx.set_paint(frame_to_paint(&placed.frame)?);
    let opacity = placed.opacity as f32;
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
    }
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(placed.frame.width()),
        f64::from(placed.frame.height()),
    ));
    if opacity < 1.0 {
        ctx.pop_layer();
    }
    let layer = render_premul(&mut ctx);
    over_in_place(canvas, &layer, 1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
