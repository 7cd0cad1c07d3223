use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use rectfit::{
    ExportArtifact, ExportKind, PrecomputedEngine, Session, SourceImage, TimelineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "rectfit", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export one step as a PNG snapshot.
    Frame(FrameArgs),
    /// Export the sequence as an animated GIF.
    Gif(GifArgs),
    /// Export every step as PNGs inside a ZIP archive.
    Zip(ZipArgs),
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// Captured engine output: a JSON array of SVG strings or a directory of `.svg` files.
    #[arg(long)]
    frames: PathBuf,

    /// Timeline config JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source photograph; sets the fallback scene size and the output file base name.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Rectangle count reported to the engine.
    #[arg(long, default_value_t = 100)]
    target_count: u32,

    /// Directory the export is written into.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Step to export (1-based); the final step when omitted.
    #[arg(long)]
    step: Option<i64>,
}

#[derive(Parser, Debug)]
struct GifArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Playback speed hint; higher values sample fewer steps.
    #[arg(long)]
    speed: Option<f64>,
}

#[derive(Parser, Debug)]
struct ZipArgs {
    #[command(flatten)]
    input: InputArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Gif(args) => cmd_gif(args),
        Command::Zip(args) => cmd_zip(args),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut session = load_session(&args.input)?;
    if let Some(step) = args.step {
        session.seek(step);
    }
    let artifact = pollster::block_on(session.export_snapshot(&mut log_progress))?;
    write_artifact(&artifact, &args.input.out_dir)
}

fn cmd_gif(args: GifArgs) -> anyhow::Result<()> {
    let mut session = load_session(&args.input)?;
    if let Some(speed) = args.speed {
        session.set_speed(speed)?;
    }
    let artifact = pollster::block_on(session.export_animated(&mut log_progress))?;
    write_artifact(&artifact, &args.input.out_dir)
}

fn cmd_zip(args: ZipArgs) -> anyhow::Result<()> {
    let session = load_session(&args.input)?;
    let artifact = pollster::block_on(session.export_archive(&mut log_progress))?;
    write_artifact(&artifact, &args.input.out_dir)
}

fn load_session(input: &InputArgs) -> anyhow::Result<Session> {
    let config = match &input.config {
        Some(path) => TimelineConfig::from_json_path(path)?,
        None => TimelineConfig::default(),
    };

    let source = match &input.source {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read source image '{}'", path.display()))?;
            SourceImage::decode(&bytes, &config.limits)?
        }
        // Captured output carries its own sizes; a blank canvas stands in for the photo.
        None => SourceImage::from_rgba(
            config.default_size,
            vec![255; config.default_size.rgba_len()],
        )?,
    };

    let mut engine = PrecomputedEngine::from_path(&input.frames)?;
    let mut session = Session::new(config)?;
    session.set_source_name(input.source.as_deref().and_then(file_name));
    let frames = session.run(&mut engine, 0, input.target_count, &source)?;
    tracing::info!(frames, "loaded captured sequence");
    Ok(session)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn log_progress(kind: ExportKind, fraction: f32) {
    tracing::debug!(%kind, percent = (fraction * 100.0).round(), "export progress");
}

fn write_artifact(artifact: &ExportArtifact, out_dir: &Path) -> anyhow::Result<()> {
    let path = artifact.write_to_dir(out_dir)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
