use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfpane::ViewerConfig;
use pdfpane::panic_handler::initialize_panic_handler;
use pdfpane::pdf::{Bitmap, ContainerSize, InputSource, MupdfBackend};
use pdfpane::settings::EngineSettings;
use pdfpane::surface::Surface;
use pdfpane::viewer::ViewportController;

#[derive(Parser)]
#[command(name = "pdfpane", version, about = "Headless PDF viewer engine")]
struct Cli {
    /// Where log output goes
    #[arg(long, global = true, default_value = "pdfpane.log")]
    log_file: PathBuf,

    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    /// Engine settings file instead of the one in the config directory
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out and render a document, then print the interaction result
    Render(RenderArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// PDF file to display
    pdf: PathBuf,

    /// Host configuration as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 800.0)]
    container_width: f32,

    #[arg(long, default_value_t = 600.0)]
    container_height: f32,

    /// Scroll offset applied after mounting
    #[arg(long)]
    scroll: Option<f32>,

    /// Click at X,Y in viewport coordinates
    #[arg(long, value_parser = parse_point)]
    click: Option<(f32, f32)>,

    /// Directory for page PNGs and surface.json
    #[arg(long)]
    out: Option<PathBuf>,

    /// How long to wait for rendering to finish
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x {x:?}: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y {y:?}: {e}"))?;
    Ok((x, y))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = File::create(&cli.log_file)
        .with_context(|| format!("creating log file {}", cli.log_file.display()))?;
    WriteLogger::init(cli.log_level, Config::default(), log_file)?;
    initialize_panic_handler();

    info!("Starting pdfpane");

    let settings = match &cli.settings {
        Some(path) => EngineSettings::load_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::load(),
    };

    let res = match cli.command {
        Commands::Render(args) => render(&args, settings),
    };
    if let Err(err) = &res {
        error!("Application error: {err:?}");
    }

    info!("Shutting down pdfpane");
    res
}

fn render(args: &RenderArgs, settings: EngineSettings) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ViewerConfig::from_json(&json)?
        }
        None => ViewerConfig::default(),
    };

    let mut viewer = ViewportController::new(MupdfBackend, settings);
    viewer.mount(
        config,
        InputSource::Path(args.pdf.clone()),
        ContainerSize::new(args.container_width, args.container_height),
    )?;
    if let Some(e) = viewer.load_error() {
        bail!("cannot display {}: {e}", args.pdf.display());
    }

    if let Some(top) = args.scroll {
        viewer.scroll_to(top);
    }
    if !viewer.wait_until_idle(Duration::from_secs(args.timeout_secs)) {
        warn!("Rendering did not finish within {}s", args.timeout_secs);
    }
    if let Some((x, y)) = args.click {
        viewer.click(x, y + viewer.scroll_top());
    }

    if let Some(dir) = &args.out {
        write_outputs(&viewer, &viewer.surface(), dir)?;
    }

    println!("{}", viewer.result().to_json()?);
    Ok(())
}

fn write_outputs(
    viewer: &ViewportController<MupdfBackend>,
    surface: &Surface,
    dir: &Path,
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    if let Some(view) = surface.as_viewer() {
        for page in &view.pages {
            if let Some(rendered) = viewer.rendered_page(page.page) {
                let path = dir.join(format!("page-{:03}.png", page.page));
                save_png(&rendered.bitmap, &path)?;
            }
        }
    }

    let path = dir.join("surface.json");
    fs::write(&path, surface.to_json()?).with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote outputs to {}", dir.display());
    Ok(())
}

fn save_png(bitmap: &Bitmap, path: &Path) -> Result<()> {
    let img = image::RgbImage::from_raw(bitmap.width_px, bitmap.height_px, bitmap.pixels.clone())
        .context("bitmap buffer does not match its dimensions")?;
    img.save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
