use super::*;

#[test]
fn transparent_source_is_identity() {
    let dst = [12, 34, 56, 200];
    assert_eq!(over(dst, [0, 0, 0, 0], 1.0), dst);
    assert_eq!(over(dst, [255, 255, 255, 255], 0.0), dst);
}

#[test]
fn opaque_source_replaces() {
    assert_eq!(over([1, 2, 3, 255], [9, 8, 7, 255], 1.0), [9, 8, 7, 255]);
}

#[test]
fn half_opacity_mixes() {
    let out = over([0, 0, 0, 255], [255, 255, 255, 255], 0.5);
    assert_eq!(out, [128, 128, 128, 255]);
}

#[test]
fn over_in_place_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
    assert!(over_in_place(&mut dst, &[255u8; 8], 1.0).is_ok());
    assert_eq!(dst, vec![255u8; 8]);
}

#[test]
fn blend_at_clips_and_offsets() {
    let mut dst = Frame::filled(4, 4, Rgba8::BLACK);
    let src = Frame::filled(2, 2, Rgba8::WHITE);
    blend_frame_at(&mut dst, &src, 3, -1, 1.0);
    assert_eq!(dst.pixel(3, 0), [255, 255, 255, 255]);
    assert_eq!(dst.pixel(3, 1), [0, 0, 0, 255]);
    assert_eq!(dst.pixel(2, 0), [0, 0, 0, 255]);
    blend_frame_at(&mut dst, &src, 10, 10, 1.0);
}

#[test]
fn blend_transparent_source_leaves_destination() {
    let mut dst = Frame::new(1, 1, vec![10, 20, 30, 77]).unwrap();
    let before = dst.clone();
    blend_frame_at(&mut dst, &Frame::transparent(1, 1), 0, 0, 1.0);
    assert_eq!(dst, before);
}

#[test]
fn flatten_composes_over_background() {
    let rgb = flatten_to_rgb24(&[0, 0, 0, 0, 255, 0, 0, 255, 64, 0, 0, 128], Rgba8::rgb(0, 0, 200));
    assert_eq!(rgb, vec![0, 0, 200, 255, 0, 0, 64, 0, 100]);
}
