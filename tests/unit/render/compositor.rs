use std::io::Cursor;
use std::path::Path;

use super::*;
use crate::animation::ease::Ease;
use crate::animation::tween::Tween;
use crate::foundation::core::TimeRange;
use crate::project::captions::{CaptionOptions, WordTiming, caption_layers, group_words};

fn cfg(w: u32, h: u32) -> EngineConfig {
    EngineConfig {
        canvas: Canvas::new(w, h).unwrap(),
        ..EngineConfig::default()
    }
}

fn range(start: f64, end: f64) -> TimeRange {
    TimeRange::new(start, end).unwrap()
}

fn background(id: &str, z: i32, color: Rgba8) -> LayerModel {
    let mut l = LayerModel::new(id, LayerKind::Background, range(0.0, 10.0), z);
    l.props.fill = Some(color);
    l
}

fn write_png(dir: &Path, name: &str, w: u32, h: u32, rgba: [u8; 4]) -> PathBuf {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    let path = dir.join(name);
    std::fs::write(&path, buf).unwrap();
    path
}

fn close(a: [u8; 4], b: [u8; 4], tol: u8) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= tol)
}

#[test]
fn no_layers_yields_opaque_background() {
    let mut comp = Compositor::new(&cfg(8, 6)).unwrap();
    let out = comp.compose_frame(0.0, &[]);
    assert_eq!((out.width(), out.height()), (8, 6));
    assert!(out.data().chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn transparent_layer_leaves_canvas_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let clear = write_png(dir.path(), "clear.png", 8, 8, [200, 10, 10, 0]);
    let base = background("bg", 0, Rgba8::rgb(30, 60, 90));
    let image = LayerModel::new("img", LayerKind::Image, range(0.0, 10.0), 1).with_source(clear);

    let mut comp = Compositor::new(&cfg(8, 8)).unwrap();
    let without = comp.compose_frame(1.0, std::slice::from_ref(&base));
    let with = comp.compose_frame(1.0, &[base, image]);
    assert_eq!(without.data(), with.data());
}

#[test]
fn higher_z_draws_on_top() {
    let mut engine = TimelineEngine::new();
    engine.add_layer(background("blue", 5, Rgba8::rgb(0, 0, 255)));
    engine.add_layer(background("red", 1, Rgba8::rgb(255, 0, 0)));

    let mut comp = Compositor::new(&cfg(4, 4)).unwrap();
    let out = comp.compose_at(&engine, 0.5);
    assert!(close(out.pixel(2, 2), [0, 0, 255, 255], 1));
}

#[test]
fn half_opacity_blends_with_background() {
    let mut white = background("w", 0, Rgba8::WHITE);
    white.props.transform.opacity = 0.5;

    let mut comp = Compositor::new(&cfg(4, 4)).unwrap();
    let out = comp.compose_frame(0.0, &[white]);
    let px = out.pixel(1, 1);
    assert!(close(px, [128, 128, 128, 255], 3), "{px:?}");
}

#[test]
fn image_layer_lands_at_its_position() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "sq.png", 4, 4, [0, 255, 0, 255]);
    let mut layer = LayerModel::new("sq", LayerKind::Image, range(0.0, 10.0), 0).with_source(png);
    layer.props.transform.x = 4.0;
    layer.props.transform.y = 4.0;

    let mut comp = Compositor::new(&cfg(8, 8)).unwrap();
    let out = comp.compose_frame(0.0, &[layer]);
    assert!(close(out.pixel(5, 5), [0, 255, 0, 255], 2));
    assert_eq!(out.pixel(1, 1), [0, 0, 0, 255]);
    assert_eq!(out.pixel(2, 6), [0, 0, 0, 255]);
}

#[test]
fn audio_and_unresolvable_layers_are_skipped() {
    let audio = LayerModel::new("a", LayerKind::Audio, range(0.0, 10.0), 0).with_source("a.wav");
    let missing = LayerModel::new("m", LayerKind::Image, range(0.0, 10.0), 1)
        .with_source("/definitely/not/here.png");
    let no_source = LayerModel::new("n", LayerKind::Video, range(0.0, 10.0), 2);
    let no_text = LayerModel::new("t", LayerKind::Text, range(0.0, 10.0), 3);

    let mut comp = Compositor::new(&cfg(4, 4)).unwrap();
    let out = comp.compose_frame(0.0, &[audio, missing, no_source, no_text]);
    assert!(out.data().chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn opacity_effect_follows_timeline_time() {
    let fade = EffectSpec::Opacity {
        tween: Tween::new(0.0, 1.0, 1.0, 0.0, Ease::Linear),
    };
    let layer = background("w", 0, Rgba8::WHITE).with_effect(fade);

    let mut comp = Compositor::new(&cfg(4, 4)).unwrap();
    let start = comp.compose_frame(0.0, std::slice::from_ref(&layer));
    let end = comp.compose_frame(2.0, &[layer]);
    assert!(close(start.pixel(0, 0), [255, 255, 255, 255], 1));
    assert_eq!(end.pixel(0, 0), [0, 0, 0, 255]);
}

#[test]
fn chroma_keyed_green_becomes_transparent() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "green.png", 4, 4, [0, 255, 0, 255]);
    let mut layer = LayerModel::new("g", LayerKind::Image, range(0.0, 10.0), 1).with_source(png);
    layer.props.chroma_key = Some(Default::default());
    let base = background("bg", 0, Rgba8::rgb(10, 20, 30));

    let mut comp = Compositor::new(&cfg(4, 4)).unwrap();
    let out = comp.compose_frame(0.0, &[base, layer]);
    assert!(out.data().chunks_exact(4).all(|px| px == [10, 20, 30, 255]));
}

#[test]
fn layer_transform_pins_top_left_without_rotation() {
    let xf = layer_transform(10, 20, 5.0, 7.0, 2.0, 2.0, 0.0);
    let p = xf * kurbo::Point::new(0.0, 0.0);
    assert!((p.x - 5.0).abs() < 1e-9 && (p.y - 7.0).abs() < 1e-9);
    let q = xf * kurbo::Point::new(10.0, 20.0);
    assert!((q.x - 25.0).abs() < 1e-9 && (q.y - 47.0).abs() < 1e-9);
}

#[test]
fn layer_transform_rotates_about_centre() {
    let xf = layer_transform(10, 10, 0.0, 0.0, 1.0, 1.0, 90.0);
    let c = xf * kurbo::Point::new(5.0, 5.0);
    assert!((c.x - 5.0).abs() < 1e-9 && (c.y - 5.0).abs() < 1e-9);
    // Clockwise in screen space: the top-left corner moves to the top-right.
    let tl = xf * kurbo::Point::new(0.0, 0.0);
    assert!((tl.x - 10.0).abs() < 1e-9 && tl.y.abs() < 1e-9);
}

#[test]
fn forget_layer_closes_its_source() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "a.png", 2, 2, [1, 2, 3, 255]);
    let layer = LayerModel::new("a", LayerKind::Image, range(0.0, 1.0), 0).with_source(png);

    let mut comp = Compositor::new(&cfg(4, 4)).unwrap();
    comp.compose_frame(0.0, &[layer]);
    assert!(comp.provider().is_registered("a"));
    comp.forget_layer("a");
    assert!(!comp.provider().is_registered("a"));
}

#[test]
fn oversized_canvas_is_rejected() {
    assert!(Compositor::new(&cfg(70_000, 10)).is_err());
}

#[test]
fn default_caption_layers_are_drawn() {
    if crate::effects::text::system_sans_serif().is_err() {
        eprintln!("skipping: no system font installed");
        return;
    }
    let words = [
        WordTiming {
            word: "Hello".to_string(),
            start: 0.0,
            end: 0.4,
        },
        WordTiming {
            word: "there".to_string(),
            start: 0.4,
            end: 0.9,
        },
    ];
    let opts = CaptionOptions::default();
    let layers = caption_layers(&group_words(&words, &opts), &opts, "caption", 100);
    assert_eq!(layers.len(), 1);
    assert!(layers[0].props.text.as_ref().unwrap().font.as_os_str().is_empty());

    let mut comp = Compositor::new(&cfg(320, 120)).unwrap();
    let out = comp.compose_frame(0.5, &layers);
    let lit = out
        .data()
        .chunks_exact(4)
        .filter(|px| px[..3] != [0, 0, 0])
        .count();
    assert!(lit > 0, "caption rendered nothing");
}
