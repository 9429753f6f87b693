use super::*;
use crate::animation::ease::Ease;

fn run(effect: &mut dyn Effect, frame_index: u64) -> EffectContext {
    let mut ctx = EffectContext::default();
    effect
        .apply(Frame::transparent(1, 1), frame_index, 10.0, &mut ctx)
        .unwrap();
    ctx
}

#[test]
fn opacity_holds_endpoints_and_interpolates() {
    let mut fade = Animate::new(
        AnimatedProperty::Opacity,
        Tween::new(1.0, 2.0, 0.0, 1.0, Ease::Linear),
    );
    assert_eq!(run(&mut fade, 0).opacity, 0.0);
    assert!((run(&mut fade, 15).opacity - 0.5).abs() < 1e-9);
    assert_eq!(run(&mut fade, 20).opacity, 1.0);
    assert_eq!(run(&mut fade, 100).opacity, 1.0);
}

#[test]
fn zero_length_tween_steps_at_start() {
    let mut rot = Animate::new(
        AnimatedProperty::Rotate,
        Tween::new(1.0, 1.0, 0.0, 90.0, Ease::InOutCubic),
    );
    assert_eq!(run(&mut rot, 9).rotate, 0.0);
    assert_eq!(run(&mut rot, 10).rotate, 90.0);
}

#[test]
fn move_writes_both_axes() {
    let mut mv = Move {
        x: Tween::new(0.0, 1.0, 0.0, 100.0, Ease::Linear),
        y: Tween::new(0.0, 1.0, 50.0, 0.0, Ease::Linear),
    };
    let ctx = run(&mut mv, 5);
    assert!((ctx.x - 50.0).abs() < 1e-9);
    assert!((ctx.y - 25.0).abs() < 1e-9);
}

#[test]
fn frame_passes_through_unchanged() {
    let mut scale = Animate::new(
        AnimatedProperty::Scale,
        Tween::new(0.0, 1.0, 1.0, 2.0, Ease::OutQuad),
    );
    let frame = Frame::transparent(3, 2);
    let mut ctx = EffectContext::default();
    let out = scale.apply(frame.clone(), 10, 10.0, &mut ctx).unwrap();
    assert!(out.ptr_eq(&frame));
    assert_eq!(ctx.scale, 2.0);
}
