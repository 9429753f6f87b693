//! Captions from transcript word timings.
//!
//! Words are grouped into short caption events, which become [`LayerKind::Caption`] layers on
//! the timeline or are exported as ASS or SRT subtitle files.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{MIN_LAYER_DURATION, Rgba8, TimeRange};
use crate::foundation::error::{EditorError, EditorResult};
use crate::timeline::layer::{LayerKind, LayerModel, TextAlign, TextStyle, Transform};

/// One transcribed word with its time span in seconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// Speech-to-text collaborator.
pub trait Transcriber {
    /// Word timings for the speech in `wav`.
    fn transcribe(&self, wav: &Path, language: &str) -> EditorResult<Vec<WordTiming>>;
}

/// A caption line shown over `[start, end)`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptionEvent {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// How words are grouped and how caption layers look.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptionOptions {
    /// Upper bound on words per caption.
    pub max_words: usize,
    /// Upper bound on caption duration in seconds.
    pub max_duration: f64,
    /// A silence longer than this starts a new caption.
    pub max_gap: f64,
    /// Style of generated caption layers; `content` is replaced per event.
    pub style: TextStyle,
    /// Placement of generated caption layers.
    pub transform: Transform,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            max_words: 5,
            max_duration: 3.0,
            max_gap: 0.8,
            style: TextStyle {
                size: 56.0,
                stroke_width: 3.0,
                align: TextAlign::Center,
                ..TextStyle::default()
            },
            transform: Transform::default(),
        }
    }
}

fn ends_sentence(word: &str) -> bool {
    word.ends_with(['.', '!', '?'])
}

/// Group words into caption events.
///
/// A new caption starts when the current one is full (`max_words`), would run past
/// `max_duration`, follows a pause longer than `max_gap`, or when the previous word ended a
/// sentence. Blank words are dropped.
pub fn group_words(words: &[WordTiming], opts: &CaptionOptions) -> Vec<CaptionEvent> {
    let max_words = opts.max_words.max(1);
    let mut events = Vec::new();
    let mut current: Vec<&WordTiming> = Vec::new();

    for word in words.iter().filter(|w| !w.word.trim().is_empty()) {
        if let (Some(first), Some(prev)) = (current.first(), current.last()) {
            let split = current.len() >= max_words
                || word.end - first.start > opts.max_duration
                || word.start - prev.end > opts.max_gap
                || ends_sentence(prev.word.trim());
            if split {
                flush_caption(&mut current, &mut events);
            }
        }
        current.push(word);
    }
    flush_caption(&mut current, &mut events);
    events
}

fn flush_caption(current: &mut Vec<&WordTiming>, events: &mut Vec<CaptionEvent>) {
    let (Some(first), Some(last)) = (current.first(), current.last()) else {
        return;
    };
    let text = current
        .iter()
        .map(|w| w.word.trim())
        .collect::<Vec<_>>()
        .join(" ");
    events.push(CaptionEvent {
        start: first.start,
        end: last.end.max(first.start + MIN_LAYER_DURATION),
        text,
    });
    current.clear();
}

/// One caption layer per event, ids `"{prefix}-{n}"` starting at 1.
pub fn caption_layers(
    events: &[CaptionEvent],
    opts: &CaptionOptions,
    prefix: &str,
    z_index: i32,
) -> Vec<LayerModel> {
    events
        .iter()
        .enumerate()
        .map(|(i, ev)| {
            let time = TimeRange::new(ev.start, ev.end)
                .unwrap_or(TimeRange {
                    start: ev.start,
                    end: ev.start,
                })
                .clamped_min(MIN_LAYER_DURATION);
            LayerModel::new(format!("{prefix}-{}", i + 1), LayerKind::Caption, time, z_index)
                .with_text(TextStyle {
                    content: ev.text.clone(),
                    ..opts.style.clone()
                })
                .with_transform(opts.transform)
        })
        .collect()
}

/// Transcribe `wav` and turn the result into caption layers.
pub fn transcribe_to_layers(
    transcriber: &dyn Transcriber,
    wav: &Path,
    language: &str,
    opts: &CaptionOptions,
) -> EditorResult<Vec<LayerModel>> {
    let words = transcriber.transcribe(wav, language)?;
    let events = group_words(&words, opts);
    tracing::info!(words = words.len(), captions = events.len(), "captions generated");
    Ok(caption_layers(&events, opts, "caption", 100))
}

/// Style block of an ASS file.
#[derive(Clone, Debug, PartialEq)]
pub struct AssStyle {
    pub font_name: String,
    pub font_size: f32,
    pub primary: Rgba8,
    pub outline: Rgba8,
    pub outline_width: f32,
    /// Numpad alignment (`2` is bottom centre).
    pub alignment: u8,
    pub margin_l: u32,
    pub margin_r: u32,
    pub margin_v: u32,
    /// `PlayResX`/`PlayResY`.
    pub play_res: Option<(u32, u32)>,
}

impl Default for AssStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 56.0,
            primary: Rgba8::WHITE,
            outline: Rgba8::BLACK,
            outline_width: 3.0,
            alignment: 2,
            margin_l: 10,
            margin_r: 10,
            margin_v: 40,
            play_res: None,
        }
    }
}

impl From<&TextStyle> for AssStyle {
    fn from(style: &TextStyle) -> Self {
        let font_name = style
            .font
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Arial".to_string());
        let alignment = match style.align {
            TextAlign::Left => 1,
            TextAlign::Center => 2,
            TextAlign::Right => 3,
        };
        Self {
            font_name,
            font_size: style.size,
            primary: style.color,
            outline: style.stroke_color,
            outline_width: style.stroke_width,
            alignment,
            ..Self::default()
        }
    }
}

/// `H:MM:SS.cc`, rounded to whole centiseconds.
pub fn ass_time(secs: f64) -> String {
    let cs = (secs.max(0.0) * 100.0).round() as u64;
    format!(
        "{}:{:02}:{:02}.{:02}",
        cs / 360_000,
        (cs / 6_000) % 60,
        (cs / 100) % 60,
        cs % 100
    )
}

/// `HH:MM:SS,mmm`, rounded to whole milliseconds.
pub fn srt_time(secs: f64) -> String {
    let ms = (secs.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        (ms / 60_000) % 60,
        (ms / 1000) % 60,
        ms % 1000
    )
}

/// `&HAABBGGRR` with ASS's inverted alpha (`00` is opaque).
pub fn ass_color(c: Rgba8) -> String {
    format!("&H{:02X}{:02X}{:02X}{:02X}", 255 - c.a, c.b, c.g, c.r)
}

fn ass_text(text: &str) -> String {
    text.replace('\n', "\\N").replace('{', "\\{").replace('}', "\\}")
}

/// Render `events` as an ASS script.
pub fn to_ass(events: &[CaptionEvent], style: &AssStyle) -> String {
    let mut out = String::new();
    out.push_str("[Script Info]\n");
    out.push_str("ScriptType: v4.00+\n");
    if let Some((w, h)) = style.play_res {
        let _ = writeln!(out, "PlayResX: {w}");
        let _ = writeln!(out, "PlayResY: {h}");
    }
    out.push_str("WrapStyle: 0\n\n");

    out.push_str("[V4+ Styles]\n");
    out.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );
    let _ = writeln!(
        out,
        "Style: Default,{},{},{},&H000000FF,{},&H00000000,0,0,0,0,100,100,0,0,1,{},0,{},{},{},{},1",
        style.font_name,
        style.font_size.round() as i32,
        ass_color(style.primary),
        ass_color(style.outline),
        style.outline_width,
        style.alignment,
        style.margin_l,
        style.margin_r,
        style.margin_v,
    );
    out.push('\n');

    out.push_str("[Events]\n");
    out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    for ev in events {
        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            ass_time(ev.start),
            ass_time(ev.end),
            ass_text(&ev.text)
        );
    }
    out
}

/// Render `events` as SRT.
pub fn to_srt(events: &[CaptionEvent]) -> String {
    let mut out = String::new();
    for (i, ev) in events.iter().enumerate() {
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(out, "{} --> {}", srt_time(ev.start), srt_time(ev.end));
        let _ = writeln!(out, "{}", ev.text);
        out.push('\n');
    }
    out
}

/// Write `events` to `path`; the format follows the extension (`.ass` or `.srt`).
pub fn write_subtitles(path: &Path, events: &[CaptionEvent], style: &AssStyle) -> EditorResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let body = match ext.as_deref() {
        Some("ass") => to_ass(events, style),
        Some("srt") => to_srt(events),
        _ => {
            return Err(EditorError::validation(format!(
                "unsupported subtitle format '{}' (use .ass or .srt)",
                path.display()
            )));
        }
    };
    std::fs::write(path, body).with_context(|| format!("write subtitles '{}'", path.display()))?;
    Ok(())
}

/// Load a JSON array of [`WordTiming`].
pub fn load_words(path: &Path) -> EditorResult<Vec<WordTiming>> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("read words '{}'", path.display()))?;
    serde_json::from_str(&json).map_err(|e| EditorError::serde(format!("words json: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/project/captions.rs"]
mod tests;
