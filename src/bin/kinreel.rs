use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kinreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse the markup and write the PNG frame sequence, nothing else.
    Frames(CommonArgs),
    /// Full run: frames plus the assembled video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Working root containing the markup file and asset directories.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Markup file, relative to the root.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// JSON config file; explicit flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font file tried before the built-in candidates.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output video path, relative to the root.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frames(args) => cmd_frames(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn resolve_config(args: &CommonArgs) -> anyhow::Result<kinreel::Config> {
    let mut cfg = match &args.config {
        Some(path) => kinreel::Config::from_json_file(path)?,
        None => kinreel::Config::default(),
    };
    if let Some(root) = &args.root {
        cfg.root = root.clone();
    }
    if let Some(markup) = &args.in_path {
        cfg.markup = markup.clone();
    }
    if let Some(font) = &args.font {
        cfg.font_candidates.insert(0, font.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_frames(args: CommonArgs) -> anyhow::Result<()> {
    let cfg = resolve_config(&args)?;
    let edges = kinreel::load_edges(&cfg)?;
    let paths = kinreel::generate_frames(&cfg, &edges)?;
    eprintln!(
        "wrote {} frames to {}",
        paths.len(),
        cfg.frames_path().display()
    );
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = resolve_config(&args.common)?;
    if let Some(out) = args.out {
        cfg.output = out;
    }

    let cancel = kinreel::CancelToken::new();
    let out = kinreel::render_video(&cfg, &cancel)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
