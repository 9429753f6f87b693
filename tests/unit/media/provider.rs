use std::io::Cursor;

use super::*;
use crate::foundation::core::Rgba8;
use crate::media::probe::MediaInfo;

fn write_png(dir: &Path, name: &str, rgba: [u8; 4]) -> PathBuf {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    let path = dir.join(name);
    std::fs::write(&path, buf).unwrap();
    path
}

fn fake_video(path: &str) -> VideoSource {
    let info = MediaInfo {
        path: PathBuf::from(path),
        width: 1,
        height: 1,
        fps: 10.0,
        time_base: (1, 10),
        duration: 1.0,
        has_audio: false,
    };
    let tools = FfmpegTools {
        ffmpeg: "/no/such/ffmpeg".into(),
        ffprobe: "/no/such/ffprobe".into(),
    };
    VideoSource::from_info(info, 8, tools)
}

#[test]
fn still_images_take_the_static_path() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "logo.png", [1, 2, 3, 255]);
    let mut provider = FrameProvider::new(&EngineConfig::default());
    provider.register_source("logo", &png).unwrap();

    let a = provider.get_layer_frame("logo", 0.0);
    let b = provider.get_frame(&png, 3.0);
    assert_eq!(a.pixel(0, 0), [1, 2, 3, 255]);
    assert!(a.ptr_eq(&b));
    assert_eq!(provider.open_sources(), 0);
}

#[test]
fn failed_registration_keeps_mapping_and_yields_blank() {
    let mut provider = FrameProvider::new(&EngineConfig::default());
    let missing = Path::new("/no/such/clip.mp4");
    assert!(provider.register_source("v", missing).is_err());
    assert!(provider.is_registered("v"));
    assert!(provider.get_layer_frame("v", 1.0).is_empty());
    assert!(provider.get_frame(missing, 1.0).is_empty());
}

#[test]
fn unknown_layer_yields_blank() {
    let mut provider = FrameProvider::new(&EngineConfig::default());
    assert!(provider.get_layer_frame("ghost", 0.0).is_empty());
}

#[test]
fn second_level_cache_serves_repeat_lookups() {
    let mut provider = FrameProvider::new(&EngineConfig::default());
    let mut src = fake_video("/media/a.mp4");
    src.insert_cached(0.25, Frame::filled(1, 1, Rgba8::WHITE));
    provider.insert_source("a", src);

    let path = Path::new("/media/a.mp4");
    let first = provider.get_frame(path, 0.25);
    assert_eq!(first.pixel(0, 0), [255, 255, 255, 255]);
    assert!(provider.cache.contains(&(path.to_path_buf(), TimeKey::from_secs(0.25))));
    assert!(provider.get_frame(path, 0.5).is_empty());
}

#[test]
fn shared_video_source_closes_with_last_reference() {
    let mut provider = FrameProvider::new(&EngineConfig::default());
    provider.insert_source("a", fake_video("/media/shared.mp4"));
    provider
        .layer_paths
        .insert("b".into(), PathBuf::from("/media/shared.mp4"));
    assert_eq!(provider.open_sources(), 1);

    provider.unregister_source("a");
    assert_eq!(provider.open_sources(), 1);
    provider.unregister_source("b");
    assert_eq!(provider.open_sources(), 0);
}

#[test]
fn release_all_empties_everything() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "x.png", [0, 0, 0, 255]);
    let mut provider = FrameProvider::new(&EngineConfig::default());
    provider.register_source("x", &png).unwrap();
    provider.insert_source("v", fake_video("/media/v.mp4"));
    provider.release_all();
    assert!(!provider.is_registered("x"));
    assert_eq!(provider.open_sources(), 0);
    assert!(provider.get_layer_frame("x", 0.0).is_empty());
}
