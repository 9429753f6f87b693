use super::*;

fn system_font() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.is_file())
}

fn style(font: PathBuf, content: &str) -> TextStyle {
    TextStyle {
        content: content.to_string(),
        font,
        size: 32.0,
        color: Rgba8::WHITE,
        ..TextStyle::default()
    }
}

fn opaque_pixels(frame: &Frame) -> usize {
    frame.data().chunks_exact(4).filter(|px| px[3] > 0).count()
}

#[test]
fn rotate_frame_fits_rotated_bounds() {
    let frame = Frame::filled(10, 4, Rgba8::WHITE);
    let quarter = rotate_frame(&frame, 90.0).unwrap();
    assert_eq!((quarter.width(), quarter.height()), (4, 10));
    let diag = rotate_frame(&frame, 45.0).unwrap();
    assert!(diag.width() > 4 && diag.width() < 14);
}

#[test]
fn dilation_covers_a_ring() {
    let offs = dilation_offsets(2.0);
    assert_eq!(offs.len(), 24);
    assert!(offs.iter().all(|(x, y)| (x * x + y * y).sqrt() <= 2.0 + 1e-4));
}

#[test]
fn missing_font_is_an_error() {
    let mut r = TextRenderer::new(4);
    let s = style(PathBuf::from("/no/such/font.ttf"), "hi");
    assert!(r.render(&s, 1.0).is_err());
    assert_eq!(r.cached(), 0);
}

#[test]
fn invalid_size_is_an_error() {
    let mut r = TextRenderer::new(4);
    let mut s = style(PathBuf::from("/no/such/font.ttf"), "hi");
    s.size = 0.0;
    assert!(r.render(&s, 1.0).is_err());
}

#[test]
fn renders_and_caches_text() {
    let Some(font) = system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let mut r = TextRenderer::new(4);
    let s = style(font, "Hello");
    let a = r.render(&s, 1.0).unwrap();
    assert!(a.width() > 32 && a.height() > 16);
    assert!(opaque_pixels(&a) > 0);

    let b = r.render(&s, 1.0).unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(r.cached(), 1);

    let bigger = r.render(&s, 2.0).unwrap();
    assert!(bigger.width() > a.width());
    assert_eq!(r.cached(), 2);
}

#[test]
fn stroke_adds_coverage() {
    let Some(font) = system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let mut r = TextRenderer::new(4);
    let plain = style(font.clone(), "Stroke");
    let outlined = TextStyle {
        stroke_width: 3.0,
        stroke_color: Rgba8::BLACK,
        ..plain.clone()
    };
    let a = r.render(&plain, 1.0).unwrap();
    let b = r.render(&outlined, 1.0).unwrap();
    assert!(opaque_pixels(&b) > opaque_pixels(&a));
}

#[test]
fn rotation_is_cached_until_it_changes() {
    let Some(font) = system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let mut r = TextRenderer::new(4);
    let s = style(font, "Spin");
    let a = r.render_rotated(&s, 1.0, 30.0).unwrap();
    let b = r.render_rotated(&s, 1.0, 30.0).unwrap();
    assert!(a.ptr_eq(&b));
    let c = r.render_rotated(&s, 1.0, 60.0).unwrap();
    assert!(!a.ptr_eq(&c));
    let flat = r.render_rotated(&s, 1.0, 0.0).unwrap();
    assert!(flat.ptr_eq(&r.render(&s, 1.0).unwrap()));
}

#[test]
fn overlay_writes_context_frame() {
    let Some(font) = system_font() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let mut fx = TextOverlay::new(style(font, "Hi"), 4.0, 4.0);
    let mut ctx = EffectContext::default();
    let frame = Frame::transparent(120, 60);
    let out = fx.apply(frame.clone(), 0, 30.0, &mut ctx).unwrap();
    assert!(out.ptr_eq(&frame));
    let overlay = ctx.overlay_frame.unwrap();
    assert_eq!((overlay.width(), overlay.height()), (120, 60));
    assert!(opaque_pixels(&overlay) > 0);
}
