use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::effects::EffectSpec;
use crate::foundation::core::{Rgba8, TimeRange};
use crate::foundation::error::{EditorError, EditorResult};

/// What a layer draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Decoded video frames.
    Video,
    /// A still image (raster or SVG).
    Image,
    /// Styled text.
    Text,
    /// Audio only; never drawn.
    Audio,
    /// Caption text generated from a transcript.
    Caption,
    /// Solid color fill covering the canvas.
    Background,
}

impl LayerKind {
    /// Return `true` for kinds that draw into the canvas.
    pub fn is_visual(self) -> bool {
        !matches!(self, Self::Audio)
    }
}

/// 2D placement of a layer on the canvas.
///
/// `x`/`y` place the layer's top-left corner in canvas pixels; rotation (degrees, clockwise)
/// and scale are applied about the layer centre.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Vertical position in pixels.
    pub y: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            opacity: 1.0,
        }
    }
}

/// Horizontal text alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    /// Align to the left edge.
    #[default]
    Left,
    /// Centre each line.
    Center,
    /// Align to the right edge.
    Right,
}

/// Text content and style for text and caption layers.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// The text to draw. `\n` starts a new line.
    pub content: String,
    /// Path to a TrueType/OpenType font file. Empty selects the system sans-serif face.
    pub font: PathBuf,
    /// Font size in pixels.
    pub size: f32,
    /// Fill color.
    pub color: Rgba8,
    /// Outline color.
    pub stroke_color: Rgba8,
    /// Outline width in pixels; `0` disables the outline.
    pub stroke_width: f32,
    /// Line alignment.
    pub align: TextAlign,
    /// Wrap lines at this width in pixels.
    pub max_width: Option<f32>,
    /// Line spacing multiplier; `1.0` keeps the font's natural spacing.
    pub line_height: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: String::new(),
            font: PathBuf::new(),
            size: 48.0,
            color: Rgba8::WHITE,
            stroke_color: Rgba8::BLACK,
            stroke_width: 0.0,
            align: TextAlign::Left,
            max_width: None,
            line_height: 1.0,
        }
    }
}

/// Chroma key settings applied after the layer frame is resolved.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChromaKeyParams {
    /// Color to remove.
    pub key_color: Rgba8,
    /// RGB distance below which pixels are fully transparent.
    pub threshold: f32,
    /// Width of the partial-transparency band above `threshold`.
    pub softness: f32,
    /// Green spill suppression in `[0, 1]`; `0` disables despill.
    pub despill: f32,
}

impl Default for ChromaKeyParams {
    fn default() -> Self {
        Self {
            key_color: Rgba8::rgb(0, 255, 0),
            threshold: 40.0,
            softness: 10.0,
            despill: 0.0,
        }
    }
}

/// Typed per-layer properties.
///
/// Mandatory transform and timing fields are typed; genuinely optional or experimental fields
/// live in `extra`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayerProps {
    /// Media file for video, image and audio layers.
    pub source: Option<PathBuf>,
    /// Placement on the canvas.
    pub transform: Transform,
    /// Text content and style.
    pub text: Option<TextStyle>,
    /// Chroma key applied to the resolved frame.
    pub chroma_key: Option<ChromaKeyParams>,
    /// Effects applied in order.
    pub effects: Vec<EffectSpec>,
    /// Fill color for background layers.
    pub fill: Option<Rgba8>,
    /// Audio start offset in seconds.
    pub audio_delay: f64,
    /// Untyped extension properties.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Value passed to [`LayerModel::set_property`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// String value (text content, names, paths, hex colors).
    Text(String),
    /// Anything else; stored verbatim in `extra`.
    Json(serde_json::Value),
}

impl PropertyValue {
    fn as_f64(&self, key: &str) -> EditorResult<f64> {
        match self {
            Self::Number(v) if v.is_finite() => Ok(*v),
            _ => Err(EditorError::validation(format!(
                "property '{key}' expects a finite number"
            ))),
        }
    }

    fn as_str(&self, key: &str) -> EditorResult<&str> {
        match self {
            Self::Text(s) => Ok(s),
            _ => Err(EditorError::validation(format!(
                "property '{key}' expects a string"
            ))),
        }
    }

    fn as_bool(&self, key: &str) -> EditorResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(EditorError::validation(format!(
                "property '{key}' expects a boolean"
            ))),
        }
    }

    fn into_json(self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s),
            Self::Json(v) => v,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One timeline entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerModel {
    /// Caller-assigned unique id.
    pub id: String,
    /// What the layer draws.
    pub kind: LayerKind,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// When the layer is active.
    pub time: TimeRange,
    /// Stacking order; higher draws later.
    #[serde(default)]
    pub z_index: i32,
    /// Locked layers reject property updates.
    #[serde(default)]
    pub locked: bool,
    /// Typed properties.
    #[serde(default)]
    pub props: LayerProps,
}

impl LayerModel {
    /// Create a layer with default properties.
    pub fn new(id: impl Into<String>, kind: LayerKind, time: TimeRange, z_index: i32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            time,
            z_index,
            locked: false,
            props: LayerProps::default(),
        }
    }

    /// Builder-style source path.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.props.source = Some(path.into());
        self
    }

    /// Builder-style text style.
    pub fn with_text(mut self, style: TextStyle) -> Self {
        self.props.text = Some(style);
        self
    }

    /// Builder-style transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.props.transform = transform;
        self
    }

    /// Builder-style effect append.
    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.props.effects.push(effect);
        self
    }

    /// Update one property by key.
    ///
    /// Known keys are type-checked; unknown keys are stored in `props.extra`.
    pub fn set_property(&mut self, key: &str, value: PropertyValue) -> EditorResult<()> {
        if self.locked && key != "locked" {
            return Err(EditorError::validation(format!(
                "layer '{}' is locked",
                self.id
            )));
        }

        let tr = &mut self.props.transform;
        match key {
            "x" => tr.x = value.as_f64(key)?,
            "y" => tr.y = value.as_f64(key)?,
            "scale_x" => tr.scale_x = value.as_f64(key)?,
            "scale_y" => tr.scale_y = value.as_f64(key)?,
            "scale" => {
                let s = value.as_f64(key)?;
                tr.scale_x = s;
                tr.scale_y = s;
            }
            "rotation" => tr.rotation = value.as_f64(key)?,
            "opacity" => tr.opacity = value.as_f64(key)?.clamp(0.0, 1.0),
            "start" => {
                self.time = self.time.with_start(value.as_f64(key)?);
            }
            "end" => {
                self.time = self.time.with_end(value.as_f64(key)?);
            }
            "z_index" => self.z_index = value.as_f64(key)?.round() as i32,
            "name" => self.name = value.as_str(key)?.to_string(),
            "locked" => self.locked = value.as_bool(key)?,
            "source" => self.props.source = Some(PathBuf::from(value.as_str(key)?)),
            "text" => {
                let content = value.as_str(key)?.to_string();
                self.props.text.get_or_insert_with(TextStyle::default).content = content;
            }
            "font_size" => {
                let size = value.as_f64(key)?;
                if size <= 0.0 {
                    return Err(EditorError::validation("font_size must be > 0"));
                }
                self.props.text.get_or_insert_with(TextStyle::default).size = size as f32;
            }
            "color" => {
                let color = Rgba8::from_hex(value.as_str(key)?)?;
                match self.kind {
                    LayerKind::Background => self.props.fill = Some(color),
                    _ => self.props.text.get_or_insert_with(TextStyle::default).color = color,
                }
            }
            _ => {
                self.props.extra.insert(key.to_string(), value.into_json());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/layer.rs"]
mod tests;
