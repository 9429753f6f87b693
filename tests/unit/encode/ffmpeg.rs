use super::*;
use crate::encode::sink::AudioTrack;
use crate::foundation::core::{Fps, Rgba8};

fn cfg(audio: Option<AudioTrack>) -> SinkConfig {
    SinkConfig {
        width: 640,
        height: 360,
        fps: Fps::new(30000, 1001).unwrap(),
        background: Rgba8::BLACK,
        audio,
    }
}

fn strs(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

#[test]
fn video_only_args_stream_rgb24_from_stdin() {
    let args = strs(&build_args(&cfg(None), Path::new("out/x.mp4")));
    let joined = args.join(" ");
    assert!(joined.starts_with("-y -loglevel warning "));
    assert!(joined.contains("-f rawvideo -pix_fmt rgb24 -s 640x360 -r 30000/1001 -i pipe:0"));
    assert!(joined.contains("-c:v libx264 -pix_fmt yuv420p"));
    assert!(!joined.contains("adelay"));
    assert!(!joined.contains("-c:a"));
    assert_eq!(args.last().unwrap(), "out/x.mp4");
}

#[test]
fn audio_track_gets_delay_filter_and_maps() {
    let audio = AudioTrack {
        path: "voice.wav".into(),
        delay: 1.5,
    };
    let args = strs(&build_args(&cfg(Some(audio)), Path::new("o.mp4")));
    let pos = |s: &str| args.iter().position(|a| a == s).unwrap();
    assert_eq!(args[pos("-filter_complex") + 1], "[1:a]adelay=1500|1500[aud]");
    assert_eq!(args[pos("-c:a") + 1], "aac");
    assert!(args.contains(&"[aud]".to_string()));
    assert!(args.contains(&"voice.wav".to_string()));
    // The audio input follows the video pipe input.
    assert!(pos("voice.wav") > pos("pipe:0"));
    assert!(args.contains(&"-shortest".to_string()));
}

#[test]
fn diagnose_maps_known_failures() {
    assert!(diagnose(b"...\nOutput file is empty, nothing was encoded").contains("no frames"));
    assert!(diagnose(b"Error parsing filter graph").contains("rejected its arguments"));
    assert!(diagnose(b"voice.wav: No such file or directory").contains("could not be found"));
    assert!(diagnose(b"Unknown encoder 'libx264'").contains("libx264"));
    assert_eq!(diagnose(b"  something else \n"), "something else");
    assert_eq!(diagnose(b""), "encoder produced no diagnostic output");
}

#[test]
fn diagnose_keeps_only_the_tail() {
    let mut big = vec![b'x'; 10_000];
    big.extend_from_slice(b"Unknown encoder");
    let msg = diagnose(&big);
    assert!(msg.len() <= STDERR_TAIL + 100);
    assert!(msg.contains("libx264"));
}

#[test]
fn odd_canvas_is_rejected_before_spawning() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        ffmpeg_bin: "/nonexistent/ffmpeg".to_string(),
        ..FfmpegSinkOpts::new("o.mp4")
    });
    let mut c = cfg(None);
    c.width = 641;
    assert!(matches!(sink.begin(c), Err(EditorError::Validation(_))));
}

#[test]
fn missing_encoder_is_a_render_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        ffmpeg_bin: "/nonexistent/ffmpeg".to_string(),
        ..FfmpegSinkOpts::new(dir.path().join("o.mp4"))
    });
    assert!(matches!(sink.begin(cfg(None)), Err(EditorError::RenderIo(_))));
    assert!(sink.push_frame(0, &Frame::transparent(640, 360)).is_err());
}

#[test]
fn ensure_parent_dir_creates_nested_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a/b/c.mp4");
    ensure_parent_dir(&out).unwrap();
    assert!(dir.path().join("a/b").is_dir());
    ensure_parent_dir(Path::new("bare.mp4")).unwrap();
}

#[cfg(unix)]
fn fake_encoder(dir: &Path, stderr_line: &str) -> String {
    use std::os::unix::fs::PermissionsExt as _;

    let script = dir.join("fake-ffmpeg.sh");
    std::fs::write(
        &script,
        format!("#!/bin/sh\ncat > /dev/null\necho '{stderr_line}' >&2\nexit 0\n"),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.to_string_lossy().into_owned()
}

#[cfg(unix)]
#[test]
fn empty_output_warning_fails_a_clean_exit() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        ffmpeg_bin: fake_encoder(dir.path(), "Output file is empty, nothing was encoded"),
        ..FfmpegSinkOpts::new(dir.path().join("o.mp4"))
    });
    sink.begin(cfg(None)).unwrap();
    sink.push_frame(0, &Frame::transparent(640, 360)).unwrap();
    let err = sink.end().unwrap_err().to_string();
    assert!(err.contains("the encoder received no frames"), "{err}");
}

#[cfg(unix)]
#[test]
fn zero_frames_is_an_error_even_without_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        ffmpeg_bin: fake_encoder(dir.path(), ""),
        ..FfmpegSinkOpts::new(dir.path().join("o.mp4"))
    });
    sink.begin(cfg(None)).unwrap();
    assert!(matches!(sink.end(), Err(EditorError::RenderIo(_))));
}

#[cfg(unix)]
#[test]
fn clean_exit_with_frames_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        ffmpeg_bin: fake_encoder(dir.path(), "frame=1"),
        ..FfmpegSinkOpts::new(dir.path().join("o.mp4"))
    });
    sink.begin(cfg(None)).unwrap();
    sink.push_frame(0, &Frame::transparent(640, 360)).unwrap();
    sink.end().unwrap();
}
