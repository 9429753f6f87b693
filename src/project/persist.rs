use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::effects::{EffectSpec, MaskShape};
use crate::foundation::config::EngineConfig;
use crate::foundation::core::{Canvas, Fps, Rgba8, TimeRange};
use crate::foundation::error::{EditorError, EditorResult};
use crate::timeline::engine::TimelineEngine;
use crate::timeline::layer::{LayerKind, LayerModel, LayerProps};

/// Project file format version written by [`Project::save`].
pub const PROJECT_VERSION: u32 = 1;

/// On-disk project document.
///
/// Layers are stored as flat records; the layer's media path lives in `path`, everything else
/// in `properties`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub version: u32,
    pub canvas: Canvas,
    #[serde(default)]
    pub fps: Fps,
    #[serde(default = "default_background")]
    pub background: Rgba8,
    #[serde(default)]
    pub layers: Vec<LayerRecord>,
}

fn default_background() -> Rgba8 {
    Rgba8::BLACK
}

/// One layer as stored in a project file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub properties: LayerProps,
}

impl From<&LayerModel> for LayerRecord {
    fn from(layer: &LayerModel) -> Self {
        let mut properties = layer.props.clone();
        let path = properties.source.take();
        Self {
            id: layer.id.clone(),
            kind: layer.kind,
            name: layer.name.clone(),
            path,
            start: layer.time.start,
            end: layer.time.end,
            z_index: layer.z_index,
            locked: layer.locked,
            properties,
        }
    }
}

impl TryFrom<LayerRecord> for LayerModel {
    type Error = EditorError;

    fn try_from(rec: LayerRecord) -> EditorResult<Self> {
        let time = TimeRange::new(rec.start, rec.end)
            .map_err(|e| EditorError::validation(format!("layer '{}': {e}", rec.id)))?;
        let mut props = rec.properties;
        props.source = rec.path.or(props.source);
        Ok(Self {
            name: if rec.name.is_empty() {
                rec.id.clone()
            } else {
                rec.name
            },
            id: rec.id,
            kind: rec.kind,
            time,
            z_index: rec.z_index,
            locked: rec.locked,
            props,
        })
    }
}

impl Project {
    /// Snapshot `engine` with the output settings of `cfg`.
    pub fn from_engine(engine: &TimelineEngine, cfg: &EngineConfig) -> Self {
        Self {
            version: PROJECT_VERSION,
            canvas: cfg.canvas,
            fps: cfg.fps,
            background: cfg.background,
            layers: engine.layers().iter().map(LayerRecord::from).collect(),
        }
    }

    /// Rebuild a timeline from the stored records.
    pub fn to_engine(&self) -> EditorResult<TimelineEngine> {
        let mut engine = TimelineEngine::new();
        for rec in &self.layers {
            engine.add_layer(LayerModel::try_from(rec.clone())?);
        }
        Ok(engine)
    }

    /// Make relative media, font and mask paths relative to `base` (usually the project file's
    /// directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if !p.as_os_str().is_empty() && p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for rec in &mut self.layers {
            if let Some(p) = rec.path.as_mut() {
                fix(p);
            }
            if let Some(text) = rec.properties.text.as_mut() {
                fix(&mut text.font);
            }
            for effect in &mut rec.properties.effects {
                match effect {
                    EffectSpec::Mask {
                        shape: MaskShape::Image { path },
                        ..
                    } => fix(path),
                    EffectSpec::TextOverlay { style, .. } => fix(&mut style.font),
                    _ => {}
                }
            }
        }
    }

    /// Copy canvas, fps and background into `cfg`.
    pub fn apply_to(&self, cfg: &mut EngineConfig) {
        cfg.canvas = self.canvas;
        cfg.fps = self.fps;
        cfg.background = self.background;
    }

    /// Parse and validate a project document.
    pub fn from_json(json: &str) -> EditorResult<Self> {
        let project: Self = serde_json::from_str(json)
            .map_err(|e| EditorError::serde(format!("project json: {e}")))?;
        project.validate()?;
        Ok(project)
    }

    pub fn to_json(&self) -> EditorResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EditorError::serde(format!("project json: {e}")))
    }

    /// Read a project file.
    pub fn load(path: &Path) -> EditorResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read project '{}'", path.display()))?;
        Self::from_json(&json)
    }

    /// Write a project file, creating parent directories.
    pub fn save(&self, path: &Path) -> EditorResult<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create directory '{}'", parent.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("write project '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), layers = self.layers.len(), "project saved");
        Ok(())
    }

    fn validate(&self) -> EditorResult<()> {
        if self.version == 0 || self.version > PROJECT_VERSION {
            return Err(EditorError::validation(format!(
                "unsupported project version {} (expected <= {PROJECT_VERSION})",
                self.version
            )));
        }
        Canvas::new(self.canvas.width, self.canvas.height)?;
        Fps::new(self.fps.num, self.fps.den)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/project/persist.rs"]
mod tests;
