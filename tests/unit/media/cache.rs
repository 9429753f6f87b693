use super::*;
use crate::foundation::core::Rgba8;

fn frame(v: u8) -> Frame {
    Frame::filled(1, 1, Rgba8::rgb(v, v, v))
}

#[test]
fn get_refreshes_recency() {
    let mut cache = FrameCache::new(2);
    cache.put("a", frame(1));
    cache.put("b", frame(2));
    assert!(cache.get(&"a").is_some());
    cache.put("c", frame(3));

    assert!(cache.contains(&"a"));
    assert!(!cache.contains(&"b"));
    assert!(cache.contains(&"c"));
    assert_eq!(cache.len(), 2);
}

#[test]
fn overwrite_same_key_keeps_one_entry() {
    let mut cache = FrameCache::new(1);
    cache.put(TimeKey::from_secs(1.0), frame(1));
    cache.put(TimeKey::from_secs(1.0), frame(2));
    assert_eq!(cache.len(), 1);
    assert_eq!(
        cache.get(&TimeKey::from_secs(1.0)).unwrap().pixel(0, 0),
        [2, 2, 2, 255]
    );
}

#[test]
fn evicted_frames_stay_valid_for_holders() {
    let mut cache = FrameCache::new(1);
    cache.put(1u32, frame(7));
    let held = cache.get(&1).unwrap();
    cache.put(2u32, frame(8));
    assert!(!cache.contains(&1));
    assert_eq!(held.pixel(0, 0), [7, 7, 7, 255]);
}

#[test]
fn zero_capacity_is_normalised() {
    let mut cache = FrameCache::new(0);
    assert_eq!(cache.capacity(), 1);
    cache.put(1u8, frame(1));
    assert_eq!(cache.len(), 1);
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn time_key_rounds_to_milliseconds() {
    assert_eq!(TimeKey::from_secs(1.0004), TimeKey::from_secs(1.0));
    assert_ne!(TimeKey::from_secs(1.0006), TimeKey::from_secs(1.0));
    assert_eq!(TimeKey::from_secs(2.5).as_secs(), 2.5);
}
