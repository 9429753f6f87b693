use super::*;

fn green_key() -> ChromaKey {
    ChromaKey {
        key_color: Rgba8::rgb(0, 255, 0),
        threshold: 40.0,
        softness: 10.0,
    }
}

#[test]
fn solid_key_color_becomes_fully_transparent() {
    let mut fx = green_key();
    let mut ctx = EffectContext::default();
    let out = fx
        .apply(Frame::filled(100, 100, Rgba8::rgb(0, 255, 0)), 0, 30.0, &mut ctx)
        .unwrap();
    assert!(out.data().chunks_exact(4).all(|px| px[3] == 0));
    assert!(ctx.force_bgra);
}

#[test]
fn softness_band_is_linear() {
    let fx = green_key();
    // Distance 45 sits halfway through the [40, 50] band.
    assert_eq!(fx.alpha_for(45, 255, 0), 128);
    assert_eq!(fx.alpha_for(0, 255, 30), 0);
    assert_eq!(fx.alpha_for(255, 0, 255), 255);
}

#[test]
fn alpha_is_replaced_not_combined() {
    let mut fx = green_key();
    let out = fx
        .apply(
            Frame::new(1, 1, vec![255, 0, 0, 10]).unwrap(),
            0,
            30.0,
            &mut EffectContext::default(),
        )
        .unwrap();
    assert_eq!(out.pixel(0, 0)[3], 255);
}

#[test]
fn zero_softness_is_a_hard_step() {
    let fx = ChromaKey {
        softness: 0.0,
        ..green_key()
    };
    assert_eq!(fx.alpha_for(0, 255, 40), 0);
    assert_eq!(fx.alpha_for(0, 255, 41), 255);
}

#[test]
fn despill_only_reduces_dominant_green() {
    let fx = Despill { strength: 1.0 };
    let mut spill = [100, 200, 50, 255];
    fx.despill_px(&mut spill);
    assert_eq!(spill, [100, 75, 50, 255]);

    let mut neutral = [100, 60, 50, 255];
    fx.despill_px(&mut neutral);
    assert_eq!(neutral, [100, 60, 50, 255]);

    let half = Despill { strength: 0.5 };
    let mut px = [0, 200, 0, 255];
    half.despill_px(&mut px);
    assert_eq!(px[1], 100);
}

#[test]
fn layer_params_key_and_despill() {
    let params = ChromaKeyParams {
        key_color: Rgba8::rgb(0, 255, 0),
        threshold: 40.0,
        softness: 10.0,
        despill: 1.0,
    };
    let mut frame = Frame::filled(2, 1, Rgba8::rgb(0, 255, 0));
    frame.data_mut()[4..8].copy_from_slice(&[200, 220, 180, 255]);
    let out = apply_chroma_key(frame, &params, &mut EffectContext::default());
    assert_eq!(out.pixel(0, 0)[3], 0);
    assert_eq!(out.pixel(1, 0), [200, 190, 180, 255]);
}
