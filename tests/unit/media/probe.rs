use super::*;

#[test]
fn parse_ratio_variants() {
    assert_eq!(parse_ff_ratio("30000/1001"), Some((30000, 1001)));
    assert_eq!(parse_ff_ratio("25"), Some((25, 1)));
    assert_eq!(parse_ff_ratio("0/0"), None);
    assert_eq!(parse_ff_ratio("abc"), None);
}

#[test]
fn split_drops_partial_tail_and_caps_count() {
    let bytes = vec![1u8; 4 * 3 + 2];
    let frames = split_frames(&bytes, 4, 10);
    assert_eq!(frames.len(), 3);
    assert_eq!(split_frames(&bytes, 4, 2).len(), 2);
    assert!(split_frames(&bytes, 0, 2).is_empty());
}

#[test]
fn missing_file_is_source_open_error() {
    let err = FfmpegTools::default()
        .probe(Path::new("/definitely/not/here.mp4"))
        .unwrap_err();
    assert!(matches!(err, EditorError::SourceOpen { .. }));
}

#[test]
fn frame_step_falls_back_when_fps_unknown() {
    let mut info = MediaInfo {
        path: PathBuf::from("a.mp4"),
        width: 2,
        height: 2,
        fps: 25.0,
        time_base: (1, 12800),
        duration: 1.0,
        has_audio: false,
    };
    assert_eq!(info.frame_len(), 16);
    assert!((info.frame_step() - 0.04).abs() < 1e-12);
    info.fps = 0.0;
    assert_eq!(info.frame_step(), 0.001);
}
