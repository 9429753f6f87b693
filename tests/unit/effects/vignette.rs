use super::*;
use crate::foundation::core::Rgba8;

fn gray(w: u32, h: u32) -> Frame {
    Frame::filled(w, h, Rgba8::rgb(128, 128, 128))
}

fn vignette() -> Vignette {
    Vignette {
        strength: 1.0,
        radius: 0.85,
        angle: 0.0,
    }
}

#[test]
fn centre_is_unchanged_and_corners_darken() {
    let mut fx = vignette();
    let out = fx
        .apply(gray(64, 64), 0, 30.0, &mut EffectContext::default())
        .unwrap();
    assert_eq!(out.pixel(32, 32), [128, 128, 128, 255]);
    assert!(out.pixel(0, 0)[0] < 128);
    assert_eq!(out.pixel(0, 0)[3], 255);
}

#[test]
fn darkening_is_monotonic_along_the_diagonal() {
    let mut fx = vignette();
    let out = fx
        .apply(gray(64, 64), 0, 30.0, &mut EffectContext::default())
        .unwrap();
    let mut prev = out.pixel(32, 32)[0];
    for i in (0..32).rev() {
        let v = out.pixel(i, i)[0];
        assert!(v <= prev, "pixel ({i},{i}) = {v} brighter than {prev}");
        prev = v;
    }
}

#[test]
fn factor_matches_reference_values() {
    let fx = vignette();
    // Corner of a square frame: dist = sqrt(0.5).
    let dist = 0.5f64.sqrt();
    let t = ((dist - 0.85) / -0.4).clamp(0.0, 1.0);
    let expected = t * t * (3.0 - 2.0 * t);
    assert!((fx.factor(0, 0, 100, 100) - expected).abs() < 1e-12);
    assert_eq!(fx.factor(50, 50, 100, 100), 1.0);
}

#[test]
fn angle_biases_one_side() {
    let fx = Vignette {
        angle: 0.0,
        ..vignette()
    };
    let biased = Vignette {
        angle: 180.0,
        ..vignette()
    };
    // A 180 degree bias pushes the dark side to the left edge.
    assert!(biased.factor(0, 50, 100, 100) < fx.factor(0, 50, 100, 100));
    assert!(biased.factor(99, 50, 100, 100) > fx.factor(99, 50, 100, 100));
}

#[test]
fn zero_strength_is_identity() {
    let mut fx = Vignette {
        strength: 0.0,
        ..vignette()
    };
    let frame = gray(8, 8);
    let out = fx
        .apply(frame.clone(), 0, 30.0, &mut EffectContext::default())
        .unwrap();
    assert!(out.ptr_eq(&frame));
}
