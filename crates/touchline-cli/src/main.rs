use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use touchline_core::{EngineConfig, FrameRate, InterpolationMode, VideoMetadata};
use touchline_keyframes::{
    sample, validate_track, Action, CropRect, EditorSession, HighlightEllipse, KeyframePayload,
    Origin, Outcome, PersistFilter, TrackDocument, TrackFile,
};

const DEFAULT_CONFIG: &str = "touchline.toml";

#[derive(Parser)]
#[command(
    name = "touchline",
    version,
    about = "Touchline: keyframe tracks for soccer clip crops and highlights",
    long_about = "Touchline edits the frame-based keyframe tracks that animate a crop\nrectangle or a player highlight over a soccer clip.\n\nTracks are stored as JSON documents; every edit goes through the same\nreducer the editor uses."
)]
struct Cli {
    /// Engine configuration file (default: ./touchline.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Crop,
    Highlight,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a track holding only the two boundary keyframes
    New {
        /// Property the track animates
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Number of frames in the clip
        #[arg(long)]
        total_frames: u64,

        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// Source width in pixels
        #[arg(long, default_value_t = 1920)]
        width: u32,

        /// Source height in pixels
        #[arg(long, default_value_t = 1080)]
        height: u32,

        /// Where to write the track document
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Restore a track document and check its invariants
    Check {
        #[arg()]
        file: PathBuf,
    },

    /// Print interpolated payloads as JSON lines
    Sample {
        #[arg()]
        file: PathBuf,

        /// Single frame to sample
        #[arg(long, conflicts_with_all = ["from", "to"])]
        frame: Option<u64>,

        /// First frame of the range (default: 0)
        #[arg(long)]
        from: Option<u64>,

        /// Last frame of the range, inclusive (default: last frame)
        #[arg(long)]
        to: Option<u64>,

        #[arg(long, default_value_t = 1)]
        step: u64,

        /// linear or spline (default: from configuration)
        #[arg(long)]
        mode: Option<InterpolationMode>,
    },

    /// Apply a JSON array of actions to a track
    Replay {
        #[arg()]
        track: PathBuf,

        /// JSON file holding an array of actions
        #[arg()]
        actions: PathBuf,

        /// Where to write the resulting track (not saved if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default configuration file
    InitConfig {
        #[arg()]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version and active configuration
    Info,
}

/// Range of frames to sample.
struct FrameRange {
    frame: Option<u64>,
    from: Option<u64>,
    to: Option<u64>,
    step: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (engine, source) = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::New {
            kind,
            total_frames,
            fps,
            width,
            height,
            output,
        } => cmd_new(kind, total_frames, fps, width, height, &output, &engine),
        Commands::Check { file } => cmd_check(&file, &engine),
        Commands::Sample {
            file,
            frame,
            from,
            to,
            step,
            mode,
        } => {
            let range = FrameRange {
                frame,
                from,
                to,
                step,
            };
            let mode = mode.unwrap_or(engine.interpolation.mode);
            cmd_sample(&file, range, mode, &engine)
        }
        Commands::Replay {
            track,
            actions,
            output,
        } => cmd_replay(&track, &actions, output.as_deref(), &engine),
        Commands::InitConfig { path, force } => {
            let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
            cmd_init_config(&path, force)
        }
        Commands::Info => cmd_info(&engine, source.as_deref()),
    }
}

/// Explicit `--config`, else `./touchline.toml` if it exists, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<(EngineConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()),
    };
    match path {
        Some(path) => {
            let config = EngineConfig::load_from_file(&path)
                .with_context(|| format!("failed to load config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            Ok((config, Some(path)))
        }
        None => Ok((EngineConfig::default(), None)),
    }
}

fn read_document(path: &Path) -> Result<TrackDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read track: {}", path.display()))?;
    TrackDocument::from_json(&json)
        .with_context(|| format!("failed to parse track: {}", path.display()))
}

fn write_document(path: &Path, doc: &TrackDocument) -> Result<()> {
    let json = doc.to_json_pretty()?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write track: {}", path.display()))
}

/// Clip metadata recoverable from a track file. Pixel size is not stored.
fn file_metadata<P>(file: &TrackFile<P>) -> VideoMetadata {
    let framerate = file.framerate.unwrap_or_default();
    VideoMetadata::new(file.total_frames, framerate, 0, 0)
}

fn open_session<P: KeyframePayload>(
    file: TrackFile<P>,
    engine: &EngineConfig,
) -> Result<EditorSession<P>> {
    let meta = file_metadata(&file);
    let mut session = EditorSession::new(engine);
    session
        .restore(meta, file.keyframes)
        .context("failed to restore keyframes")?;
    Ok(session)
}

fn cmd_new(
    kind: KindArg,
    total_frames: u64,
    fps: f64,
    width: u32,
    height: u32,
    output: &Path,
    engine: &EngineConfig,
) -> Result<()> {
    let framerate = FrameRate::new(fps)?;
    let meta = VideoMetadata::new(total_frames, framerate, width, height);

    let doc = match kind {
        KindArg::Crop => new_document::<CropRect>(meta, engine, TrackDocument::Crop)?,
        KindArg::Highlight => {
            new_document::<HighlightEllipse>(meta, engine, TrackDocument::Highlight)?
        }
    };
    write_document(output, &doc)?;

    println!("✨ Created {} track: {}", doc.kind(), output.display());
    println!(
        "   Frames: {} ({:.2}s @ {} fps)",
        total_frames,
        meta.duration_seconds(),
        framerate.as_f64()
    );
    Ok(())
}

fn new_document<P: KeyframePayload>(
    meta: VideoMetadata,
    engine: &EngineConfig,
    wrap: fn(TrackFile<P>) -> TrackDocument,
) -> Result<TrackDocument> {
    let mut session: EditorSession<P> = EditorSession::new(engine);
    session
        .initialize_from_metadata(meta)
        .context("failed to initialize track")?;
    let track = session.track().context("track was not initialized")?;
    Ok(wrap(TrackFile::from_track(
        track,
        Some(meta.framerate),
        PersistFilter::All,
    )))
}

fn cmd_check(file: &Path, engine: &EngineConfig) -> Result<()> {
    println!("🔍 Checking {}", file.display());
    let doc = read_document(file)?;
    println!("   ✓ Parse OK ({} track)", doc.kind());

    match doc {
        TrackDocument::Crop(track) => check_track(track, engine),
        TrackDocument::Highlight(track) => check_track(track, engine),
    }
}

fn check_track<P: KeyframePayload>(file: TrackFile<P>, engine: &EngineConfig) -> Result<()> {
    let session = open_session(file, engine)?;
    println!("   ✓ Restore OK");

    let track = session.track().context("no track after restore")?;
    validate_track(track, engine.keyframes.frame_tolerance).map_err(|errors| {
        let msgs: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
        anyhow::anyhow!("Invariant violations:\n  {}", msgs.join("\n  "))
    })?;
    println!("   ✓ Invariants OK");
    println!();
    println!("   Frames:    {}", track.total_frames());
    println!(
        "   Keyframes: {} ({} permanent, {} user, {} trim)",
        track.len(),
        track.count_origin(Origin::Permanent),
        track.count_origin(Origin::User),
        track.count_origin(Origin::Trim)
    );
    Ok(())
}

#[derive(Serialize)]
struct SampleLine<'a, P> {
    frame: u64,
    #[serde(flatten)]
    payload: &'a P,
}

fn cmd_sample(
    file: &Path,
    range: FrameRange,
    mode: InterpolationMode,
    engine: &EngineConfig,
) -> Result<()> {
    match read_document(file)? {
        TrackDocument::Crop(track) => sample_track(track, range, mode, engine),
        TrackDocument::Highlight(track) => sample_track(track, range, mode, engine),
    }
}

fn sample_track<P: KeyframePayload>(
    file: TrackFile<P>,
    range: FrameRange,
    mode: InterpolationMode,
    engine: &EngineConfig,
) -> Result<()> {
    if range.step == 0 {
        anyhow::bail!("--step must be at least 1");
    }
    let session = open_session(file, engine)?;
    let track = session.track().context("no track after restore")?;

    let last = track.last_frame();
    let (from, to) = match range.frame {
        Some(frame) => (frame, frame),
        None => {
            let from = range.from.unwrap_or(0);
            let to = range.to.map_or(last, |to| to.min(last));
            if from > to {
                anyhow::bail!("empty range: --from {} is after --to {}", from, to);
            }
            (from, to)
        }
    };

    let step = usize::try_from(range.step).context("--step is too large")?;
    for frame in (from..=to).step_by(step) {
        let payload = sample(track, frame, mode).context("track has no keyframes")?;
        let line = serde_json::to_string(&SampleLine {
            frame,
            payload: &payload,
        })?;
        println!("{}", line);
    }
    Ok(())
}

fn cmd_replay(
    track: &Path,
    actions: &Path,
    output: Option<&Path>,
    engine: &EngineConfig,
) -> Result<()> {
    let script = std::fs::read_to_string(actions)
        .with_context(|| format!("failed to read actions: {}", actions.display()))?;

    println!("🎬 Replaying {} on {}", actions.display(), track.display());
    let doc = match read_document(track)? {
        TrackDocument::Crop(file) => replay_track(file, &script, engine, TrackDocument::Crop)?,
        TrackDocument::Highlight(file) => {
            replay_track(file, &script, engine, TrackDocument::Highlight)?
        }
    };

    match output {
        Some(path) => {
            write_document(path, &doc)?;
            println!("   💾 Saved: {}", path.display());
        }
        None => println!("   (dry run, pass -o to save the result)"),
    }
    Ok(())
}

fn replay_track<P: KeyframePayload>(
    file: TrackFile<P>,
    script: &str,
    engine: &EngineConfig,
    wrap: fn(TrackFile<P>) -> TrackDocument,
) -> Result<TrackDocument> {
    let actions: Vec<Action<P>> =
        serde_json::from_str(script).context("failed to parse actions")?;
    let framerate = file.framerate;
    let mut session = open_session(file, engine)?;

    let (mut applied, mut skipped, mut rejected) = (0usize, 0usize, 0usize);
    for (index, action) in actions.into_iter().enumerate() {
        let name = action.name();
        let outcome = session
            .dispatch(action)
            .with_context(|| format!("action #{} ({}) failed", index + 1, name))?;
        let icon = match outcome {
            Outcome::Applied => {
                applied += 1;
                "✓"
            }
            Outcome::NoOp(_) => {
                skipped += 1;
                "·"
            }
            Outcome::Rejected(_) => {
                rejected += 1;
                "✗"
            }
        };
        println!("   {} #{} {} → {}", icon, index + 1, name, outcome);
    }
    println!(
        "   {} applied, {} no-op, {} rejected",
        applied, skipped, rejected
    );

    let total_frames = session
        .track()
        .context("replay left no track loaded (ends with RESET?)")?
        .total_frames();
    // An unfinished trim is saved as END_TRIM would leave the track.
    let keyframes = session
        .persisted(PersistFilter::All)
        .context("failed to serialize track")?;
    Ok(wrap(TrackFile {
        total_frames,
        framerate,
        keyframes,
    }))
}

fn cmd_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    EngineConfig::default()
        .save_to_file(path)
        .with_context(|| format!("failed to write config: {}", path.display()))?;
    println!("⚙️  Wrote default configuration: {}", path.display());
    Ok(())
}

fn cmd_info(engine: &EngineConfig, source: Option<&Path>) -> Result<()> {
    let keyframes = &engine.keyframes;
    println!("⚽ Touchline Keyframe Engine");
    println!("   Version:        {}", env!("CARGO_PKG_VERSION"));
    println!(
        "   Config:         {}",
        source
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string())
    );
    println!();
    println!("   Tolerance:      {} frames", keyframes.frame_tolerance);
    println!("   Duplicates:     {:?}", keyframes.duplicate_policy);
    println!("   Invariants:     {:?}", keyframes.invariant_policy);
    println!("   Trim retention: {:?}", keyframes.trim_retention);
    println!("   Undo depth:     {}", keyframes.history_depth);
    println!("   Interpolation:  {}", engine.interpolation.mode);
    Ok(())
}
