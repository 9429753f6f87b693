use super::*;
use crate::foundation::core::Rgba8;

#[test]
fn kernel_size_is_forced_odd() {
    assert_eq!(kernel_size(4), 5);
    assert_eq!(kernel_size(5), 5);
    assert_eq!(kernel_size(0), 1);
}

#[test]
fn sigma_matches_kernel_formula() {
    assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
    assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-6);
}

#[test]
fn kernel_sums_to_one_in_q16() {
    let k = gaussian_kernel_q16(3, 1.4).unwrap();
    assert_eq!(k.len(), 7);
    assert_eq!(k.iter().map(|&w| u64::from(w)).sum::<u64>(), 65536);
    assert!(gaussian_kernel_q16(2, 0.0).is_err());
}

#[test]
fn constant_image_is_unchanged() {
    let px = [10u8, 20, 30, 40];
    let src = px.repeat(12);
    assert_eq!(blur_rgba8(&src, 4, 3, 3, 2.0).unwrap(), src);
}

#[test]
fn plane_blur_spreads_energy() {
    let mut plane = vec![0u8; 25];
    plane[12] = 255;
    let out = blur_plane(&plane, 5, 5, 2, 1.2).unwrap();
    assert!(out.iter().filter(|&&v| v != 0).count() > 1);
    let sum: i32 = out.iter().map(|&v| i32::from(v)).sum();
    assert!((sum - 255).abs() <= 4);
}

#[test]
fn region_blur_only_touches_region() {
    let mut frame = Frame::filled(8, 8, Rgba8::BLACK);
    {
        let data = frame.data_mut();
        let i = (2 * 8 + 2) * 4;
        data[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
    }
    let before = frame.clone();
    let mut fx = BlurRegion {
        x: 0,
        y: 0,
        width: 4,
        height: 4,
        size: 4,
    };
    let out = fx
        .apply(frame, 0, 30.0, &mut EffectContext::default())
        .unwrap();
    assert!(out.pixel(2, 2)[0] < 255);
    assert!(out.pixel(1, 2)[0] > 0);
    for y in 0..8 {
        for x in 0..8 {
            if x >= 4 || y >= 4 {
                assert_eq!(out.pixel(x, y), before.pixel(x, y));
            }
        }
    }
}

#[test]
fn region_outside_frame_fails() {
    let mut fx = BlurRegion {
        x: 50,
        y: 50,
        width: 4,
        height: 4,
        size: 3,
    };
    let res = fx.apply(Frame::transparent(8, 8), 0, 30.0, &mut EffectContext::default());
    assert!(res.is_err());
}
