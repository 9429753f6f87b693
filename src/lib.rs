//! layercut is the compositing core of a non-linear video editor.
//!
//! A [`TimelineEngine`] owns the layers; a [`Compositor`] turns a timeline instant into a frame
//! by resolving each active layer (decoded video through [`FrameProvider`], stills, rendered
//! text, solid fills), running its [`EffectPipeline`] and blending it in z-order. A
//! [`RenderJob`] streams every frame of a range into a [`FrameSink`] such as [`FfmpegSink`].
//!
//! - Build a timeline from [`LayerModel`] values (or load a [`Project`])
//! - Compose single frames with [`Compositor::compose_frame`]
//! - Render a range on a worker thread with [`RenderJob::spawn`]
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod effects;
pub(crate) mod encode;
pub(crate) mod media;
pub(crate) mod project;
pub(crate) mod render;
pub(crate) mod timeline;

pub use crate::foundation::config::EngineConfig;
pub use crate::foundation::core::{Affine, Canvas, Fps, MIN_LAYER_DURATION, Rgba8, TimeRange, Vec2};
pub use crate::foundation::error::{EditorError, EditorResult};

pub use crate::animation::ease::Ease;
pub use crate::animation::tween::Tween;

pub use crate::timeline::engine::{TimelineEngine, TimelineEvent};
pub use crate::timeline::layer::{
    ChromaKeyParams, LayerKind, LayerModel, LayerProps, PropertyValue, TextAlign, TextStyle,
    Transform,
};

pub use crate::media::cache::{FrameCache, TimeKey};
pub use crate::media::decode::{
    STILL_IMAGE_EXTENSIONS, decode_image, decode_luma, decode_still, is_still_image, rasterize_svg,
};
pub use crate::media::frame::Frame;
pub use crate::media::probe::{FfmpegTools, MediaInfo};
pub use crate::media::provider::FrameProvider;
pub use crate::media::video::VideoSource;

pub use crate::effects::animate::{Animate, AnimatedProperty, Move};
pub use crate::effects::blur::{BlurRegion, blur_plane, blur_rgba8, kernel_size, sigma_for_kernel};
pub use crate::effects::chroma::{ChromaKey, Despill, apply_chroma_key};
pub use crate::effects::feather::Feather;
pub use crate::effects::mask::Mask;
pub use crate::effects::text::{TextOverlay, TextRenderer, rotate_frame};
pub use crate::effects::vignette::Vignette;
pub use crate::effects::{Effect, EffectContext, EffectPipeline, EffectSpec, MaskShape};

pub use crate::render::composite::{
    PremulRgba8, blend_frame_at, flatten_to_rgb24, over, over_in_place,
};
pub use crate::render::compositor::{Compositor, layer_transform};
pub use crate::render::job::{
    CancelToken, RenderHandle, RenderJob, RenderOutcome, RenderProgress, RenderSettings,
    first_audio_track,
};

pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, build_args, diagnose, ensure_parent_dir};
pub use crate::encode::sink::{AudioTrack, FrameSink, InMemorySink, SinkConfig};

pub use crate::project::captions::{
    AssStyle, CaptionEvent, CaptionOptions, Transcriber, WordTiming, ass_color, ass_time,
    caption_layers, group_words, load_words, srt_time, to_ass, to_srt, transcribe_to_layers,
    write_subtitles,
};
pub use crate::project::persist::{LayerRecord, PROJECT_VERSION, Project};
