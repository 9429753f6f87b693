use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use layercut::{
    AssStyle, AudioTrack, CaptionOptions, Compositor, EngineConfig, FfmpegSink, FfmpegSinkOpts,
    Project, RenderJob, RenderSettings, TimelineEngine,
};

#[derive(Parser, Debug)]
#[command(name = "layercut", version)]
struct Cli {
    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine config JSON (cache sizes, encoder binaries). `LAYERCUT_*` variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a single instant as a PNG.
    Frame(FrameArgs),
    /// Render the project to a video file (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Turn transcript word timings into an ASS or SRT subtitle file.
    Captions(CaptionsArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// First rendered second.
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// End of the rendered range; the timeline duration by default.
    #[arg(long)]
    end: Option<f64>,

    /// Audio track to mux instead of the project's audio layer.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Start offset of `--audio` in seconds.
    #[arg(long, default_value_t = 0.0)]
    audio_delay: f64,
}

#[derive(Parser, Debug)]
struct CaptionsArgs {
    /// JSON array of `{word, start, end}`.
    #[arg(long)]
    words: PathBuf,

    /// Output subtitle file (`.ass` or `.srt`).
    #[arg(long)]
    out: PathBuf,

    /// Words per caption.
    #[arg(long, default_value_t = 5)]
    max_words: usize,

    /// Longest caption in seconds.
    #[arg(long, default_value_t = 3.0)]
    max_duration: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let cfg = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env(),
    };

    match cli.cmd {
        Command::Frame(args) => cmd_frame(args, cfg),
        Command::Render(args) => cmd_render(args, cfg),
        Command::Captions(args) => cmd_captions(args),
    }
}

fn load_project(path: &Path, cfg: &mut EngineConfig) -> anyhow::Result<TimelineEngine> {
    let mut project = Project::load(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    project.resolve_paths(base);
    project.apply_to(cfg);
    Ok(project.to_engine()?)
}

fn cmd_frame(args: FrameArgs, mut cfg: EngineConfig) -> anyhow::Result<()> {
    let engine = load_project(&args.in_path, &mut cfg)?;
    let mut compositor = Compositor::new(&cfg)?;
    let frame = compositor.compose_at(&engine, args.time);

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame.save(&args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs, mut cfg: EngineConfig) -> anyhow::Result<()> {
    let engine = load_project(&args.in_path, &mut cfg)?;
    let sink = FfmpegSink::new(FfmpegSinkOpts::from_config(&args.out, &cfg));
    let settings = RenderSettings {
        config: cfg,
        start: args.start,
        end: args.end,
        audio: args.audio.map(|path| AudioTrack {
            path,
            delay: args.audio_delay,
        }),
    };

    let (tx, rx) = mpsc::channel();
    let handle = RenderJob::new(engine.layers().to_vec(), settings, Box::new(sink))
        .with_progress(tx)
        .spawn();

    let mut last_pct = None;
    for p in rx {
        let pct = (p.fraction() * 100.0).floor() as u32;
        if last_pct != Some(pct) && pct.is_multiple_of(10) {
            eprintln!("{pct:>3}% ({}/{} frames)", p.written, p.total);
            last_pct = Some(pct);
        }
    }

    let outcome = handle.join();
    if !outcome.success {
        anyhow::bail!("render failed: {}", outcome.message);
    }
    eprintln!("wrote {} ({})", args.out.display(), outcome.message);
    Ok(())
}

fn cmd_captions(args: CaptionsArgs) -> anyhow::Result<()> {
    let words = layercut::load_words(&args.words)?;
    let opts = CaptionOptions {
        max_words: args.max_words,
        max_duration: args.max_duration,
        ..CaptionOptions::default()
    };
    let events = layercut::group_words(&words, &opts);
    layercut::write_subtitles(&args.out, &events, &AssStyle::from(&opts.style))?;
    eprintln!("wrote {} captions to {}", events.len(), args.out.display());
    Ok(())
}
