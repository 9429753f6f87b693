use super::*;

fn layer(kind: LayerKind) -> LayerModel {
    LayerModel::new("l1", kind, TimeRange::new(0.0, 5.0).unwrap(), 0)
}

#[test]
fn transform_keys_update_typed_fields() {
    let mut l = layer(LayerKind::Video);
    l.set_property("x", 12.0.into()).unwrap();
    l.set_property("scale", 2.0.into()).unwrap();
    l.set_property("rotation", 45.0.into()).unwrap();
    l.set_property("opacity", 1.7.into()).unwrap();

    let tr = l.props.transform;
    assert_eq!(tr.x, 12.0);
    assert_eq!(tr.scale_x, 2.0);
    assert_eq!(tr.scale_y, 2.0);
    assert_eq!(tr.rotation, 45.0);
    assert_eq!(tr.opacity, 1.0);
}

#[test]
fn mistyped_value_is_rejected_and_leaves_layer_intact() {
    let mut l = layer(LayerKind::Video);
    let before = l.clone();
    assert!(l.set_property("x", "left".into()).is_err());
    assert!(l.set_property("locked", 1.0.into()).is_err());
    assert_eq!(l, before);
}

#[test]
fn unknown_keys_land_in_extra() {
    let mut l = layer(LayerKind::Image);
    l.set_property("wobble", 0.5.into()).unwrap();
    l.set_property("label", "intro".into()).unwrap();
    assert_eq!(l.props.extra["wobble"], serde_json::json!(0.5));
    assert_eq!(l.props.extra["label"], serde_json::json!("intro"));
}

#[test]
fn text_keys_create_style_on_demand() {
    let mut l = layer(LayerKind::Text);
    l.set_property("text", "hello".into()).unwrap();
    l.set_property("font_size", 32.0.into()).unwrap();
    l.set_property("color", "#ff0000".into()).unwrap();
    let style = l.props.text.as_ref().unwrap();
    assert_eq!(style.content, "hello");
    assert_eq!(style.size, 32.0);
    assert_eq!(style.color, Rgba8::rgb(255, 0, 0));
    assert!(l.set_property("font_size", 0.0.into()).is_err());
}

#[test]
fn color_on_background_sets_fill() {
    let mut l = layer(LayerKind::Background);
    l.set_property("color", "#102030".into()).unwrap();
    assert_eq!(l.props.fill, Some(Rgba8::rgb(0x10, 0x20, 0x30)));
    assert!(l.props.text.is_none());
}

#[test]
fn start_end_keep_range_ordered() {
    let mut l = layer(LayerKind::Video);
    l.set_property("start", 7.0.into()).unwrap();
    assert_eq!(l.time.start, 7.0);
    assert!(l.time.end >= l.time.start);
    l.set_property("end", 9.0.into()).unwrap();
    assert_eq!(l.time, TimeRange::new(7.0, 9.0).unwrap());
}

#[test]
fn locked_layer_rejects_updates_until_unlocked() {
    let mut l = layer(LayerKind::Video);
    l.set_property("locked", true.into()).unwrap();
    assert!(l.set_property("x", 1.0.into()).is_err());
    l.set_property("locked", false.into()).unwrap();
    assert!(l.set_property("x", 1.0.into()).is_ok());
}

#[test]
fn audio_is_the_only_non_visual_kind() {
    assert!(!LayerKind::Audio.is_visual());
    assert!(LayerKind::Caption.is_visual());
    assert!(LayerKind::Background.is_visual());
}
