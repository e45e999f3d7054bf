use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lyric_dance::chunks::cache::expected_chunks;
use lyric_dance::encode::ffmpeg::{ensure_parent_dir, flatten_premul_over_bg};
use lyric_dance::export::FfmpegExportTarget;
use lyric_dance::{
    BakeRegistry, ExportRatio, LogicalSize, LyricDancePlayer, PlayerConfig, SceneInput,
    SteppedAudio, TimelineFileBaker,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lyric-dance", version)]
struct Cli {
    /// Player settings JSON; defaults plus `LYRIC_DANCE_*` overrides when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render the whole song to a video file (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Print a scene, timeline and chunk coverage summary as JSON.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct SourceArgs {
    /// Scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Pre-baked timeline JSON.
    #[arg(long)]
    timeline: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    src: SourceArgs,

    /// Song time in seconds.
    #[arg(long)]
    at: f64,

    /// Logical width.
    #[arg(long, default_value_t = 540.0)]
    width: f64,

    /// Logical height.
    #[arg(long, default_value_t = 960.0)]
    height: f64,

    /// Device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    dpr: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    src: SourceArgs,

    /// Aspect ratio: 9:16, 16:9 or 1:1.
    #[arg(long, default_value = "9:16")]
    ratio: ExportRatio,

    /// Output directory; overrides the configured export directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Pre-baked timeline JSON; when given, the timeline is baked and summarized too.
    #[arg(long)]
    timeline: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args, config),
        Command::Export(args) => cmd_export(args, config),
        Command::Inspect(args) => cmd_inspect(args, config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PlayerConfig> {
    let Some(path) = path else {
        return Ok(PlayerConfig::from_env()?);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    let mut cfg: PlayerConfig = serde_json::from_str(&text)
        .with_context(|| format!("parse config '{}'", path.display()))?;
    cfg.apply_overrides(|k| std::env::var(k).ok());
    cfg.validate()?;
    Ok(cfg)
}

fn read_scene(path: &Path) -> anyhow::Result<SceneInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read scene '{}'", path.display()))?;
    let scene = SceneInput::from_json(&text)
        .with_context(|| format!("parse scene '{}'", path.display()))?;
    Ok(scene)
}

fn make_player(
    src: &SourceArgs,
    config: PlayerConfig,
) -> anyhow::Result<(LyricDancePlayer, SteppedAudio)> {
    let scene = read_scene(&src.scene)?;
    let audio = SteppedAudio::new(scene.song_end.max(scene.song_start + 0.001))?;
    let audio = match &scene.song.audio_path {
        Some(p) => audio.with_source(p.clone()),
        None => audio,
    };
    let player = LyricDancePlayer::new(
        scene,
        Arc::new(TimelineFileBaker::new(&src.timeline)),
        Arc::new(BakeRegistry::new()),
        Box::new(audio.clone()),
        config,
    )?;
    Ok((player, audio))
}

fn cmd_frame(args: FrameArgs, mut config: PlayerConfig) -> anyhow::Result<()> {
    config.surface = LogicalSize::new(args.width, args.height);
    config.device_pixel_ratio = args.dpr;
    config.health_interval_secs = 0.0;
    let (mut player, _audio) = make_player(&args.src, config)?;
    player.init()?;
    player.pause();
    player.seek(args.at);
    player.tick(args.at * 1000.0);

    let frame = player.read_frame();
    let mut rgba = vec![0u8; frame.data.len()];
    flatten_premul_over_bg(&mut rgba, &frame.data, [0, 0, 0, 255])?;
    ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &rgba,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    let m = player.metrics();
    eprintln!(
        "wrote {} (keyframe {:?}, {} words drawn, {} missing)",
        args.out.display(),
        m.keyframe_index,
        m.words.drawn,
        m.words.missing
    );
    player.destroy();
    Ok(())
}

fn cmd_export(args: ExportArgs, mut config: PlayerConfig) -> anyhow::Result<()> {
    if let Some(dir) = args.out_dir {
        config.export_dir = dir;
    }
    config.health_interval_secs = 0.0;
    let fps = config.export_frame_rate()?;
    let dir = config.export_dir.clone();
    let (player, audio) = make_player(&args.src, config)?;
    let mut player = player.with_export_target(Box::new(FfmpegExportTarget::new(dir)));
    player.init()?;
    if !player.start_export(args.ratio)? {
        anyhow::bail!("an export is already running");
    }

    let dt = fps.frame_duration_secs();
    let limit_ms = (player.scene().duration() + 5.0) * 1000.0;
    let mut host_ms = 0.0;
    while player.is_exporting() {
        player.tick(host_ms);
        audio.advance(dt);
        host_ms += dt * 1000.0;
        if host_ms > limit_ms {
            tracing::warn!("audio never reached the song end; stopping export");
            player.stop_export();
        }
    }

    let outcome = player
        .last_export()
        .cloned()
        .context("export finished without an outcome")?;
    player.destroy();
    if let Some(e) = outcome.error {
        anyhow::bail!("export of '{}' failed: {e}", outcome.file_name);
    }
    let shown = outcome
        .path
        .as_deref()
        .map_or_else(|| outcome.file_name.clone(), |p| p.display().to_string());
    eprintln!("wrote {shown} ({} frames)", outcome.frames);
    Ok(())
}

fn cmd_inspect(args: InspectArgs, mut config: PlayerConfig) -> anyhow::Result<()> {
    let scene = read_scene(&args.scene)?;
    let mut summary = serde_json::json!({
        "scene_id": scene.scene_id,
        "session_key": scene.session_key().to_string(),
        "artist": scene.song.artist,
        "title": scene.song.title,
        "song_start": scene.song_start,
        "song_end": scene.song_end,
        "lines": scene.lines.len(),
        "words": scene.words.len(),
        "expected_chunks": expected_chunks(&scene.words),
        "beats": scene.beat_grid.beats.len(),
        "has_direction": scene.has_direction(),
        "chapters": scene.cinematic_direction.as_ref().map_or(0, |d| d.chapters.len()),
        "chapter_images": scene.chapter_images.len(),
    });

    if let Some(timeline) = args.timeline {
        config.health_interval_secs = 0.0;
        let src = SourceArgs {
            scene: args.scene.clone(),
            timeline,
        };
        let (mut player, _audio) = make_player(&src, config)?;
        player.init()?;
        let expected = expected_chunks(&player.scene().words);
        let coverage = player.chunks().coverage(expected);
        summary["keyframes"] = player.timeline().map_or(0, |t| t.len()).into();
        summary["chunk_entries"] = coverage.entries.into();
        summary["unresolved_keys"] = player
            .shared_bake()
            .map_or(0, |b| b.unresolved_keys)
            .into();
        player.destroy();
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
