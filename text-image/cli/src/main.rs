use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{LevelFilter, Log, Metadata, Record};
use text_image_core::format::parse_scale;
use text_image_core::geometry::parse_size;
use text_image_core::threshold::parse_cutoff;
use text_image_core::{Config, Geometry, OutputMode, PixelShape, Session, Smoothing};

/// Command-line front end for the block-text image converter.
#[derive(Parser, Debug)]
#[command(
    name = "text-image",
    about = "Convert images into colored block text for in-game text displays",
    long_about = "Convert images into run-length encoded, colored block text, emitted as \
                  JSON text components, a quoted SNBT string, or a summon text_display command."
)]
struct Cli {
    /// Path to the input image.
    input: PathBuf,
    /// Optional path to write the output. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// JSON file with default settings; flags given on the command line win.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Grid width in characters; empty or non-positive derives it from the image.
    #[arg(short = 'W', long)]
    width: Option<String>,
    /// Grid height before cell-shape correction.
    #[arg(short = 'H', long)]
    height: Option<String>,
    /// Let width and height vary independently of the image ratio.
    #[arg(long, action = ArgAction::SetTrue)]
    free_aspect: bool,
    /// Cell shape used to correct the grid height.
    #[arg(long, value_name = "square|font")]
    pixel_shape: Option<PixelShape>,
    /// Resampling quality.
    #[arg(long, value_name = "off|low|medium|high")]
    smoothing: Option<Smoothing>,
    /// Alpha below this value becomes a blank cell (0-255).
    #[arg(short = 'c', long, value_parser = lenient_cutoff)]
    cutoff: Option<u8>,
    /// Drop trailing blanks on every row (also left-aligns commands).
    #[arg(long, action = ArgAction::SetTrue)]
    strip_trailing: bool,
    /// Output grammar.
    #[arg(short, long, value_name = "json|quoted|command")]
    mode: Option<OutputMode>,
    /// Horizontal scale of the summoned display.
    #[arg(short, long, value_parser = lenient_scale)]
    scale: Option<f64>,
    /// Layer four slightly offset displays to hide gaps between glyphs.
    #[arg(long, action = ArgAction::SetTrue)]
    fill_gaps: bool,
    /// Render large grids without asking.
    #[arg(short = 'y', long, action = ArgAction::SetTrue)]
    yes: bool,
    /// Print debug info about each pipeline stage.
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,
}

fn lenient_cutoff(value: &str) -> Result<u8, String> {
    Ok(parse_cutoff(value))
}

fn lenient_scale(value: &str) -> Result<f64, String> {
    Ok(parse_scale(value))
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!(
                "[text-image] {}: {}",
                record.level().as_str().to_lowercase(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(debug: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        });
    }
}

/// Asks on the terminal before rendering a large grid.
fn prompt_large_output(geometry: &Geometry) -> bool {
    eprint!(
        "You are trying to generate a very large image ({} x {} = {} pixels), are you sure? [y/N] ",
        geometry.width,
        geometry.height,
        geometry.cells()
    );
    io::stderr().flush().ok();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(width) = &cli.width {
        config.width = parse_size(width);
    }
    if let Some(height) = &cli.height {
        config.height = parse_size(height);
    }
    if cli.free_aspect {
        config.lock_aspect = false;
    }
    if let Some(shape) = cli.pixel_shape {
        config.shape = shape;
    }
    if let Some(smoothing) = cli.smoothing {
        config.smoothing = smoothing;
    }
    if let Some(cutoff) = cli.cutoff {
        config.cutoff = cutoff;
    }
    if cli.strip_trailing {
        config.strip_trailing_blank = true;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(scale) = cli.scale {
        config.scale = scale;
    }
    if cli.fill_gaps {
        config.fill_gaps = true;
    }

    Ok(config)
}

fn main() {
    if let Err(err) = run() {
        eprintln!("[text-image] error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let mut config = build_config(&cli)?;
    log::debug!("options: {:?}", config);

    let bytes = fs::read(&cli.input)
        .with_context(|| format!("failed to read input file: {}", cli.input.display()))?;

    let mut session = Session::new();
    session
        .load(&bytes)
        .with_context(|| format!("failed to load image: {}", cli.input.display()))?;

    let rendering = if cli.yes {
        session.regenerate(&mut config, &mut |_: &Geometry| true)?
    } else {
        session.regenerate(&mut config, &mut prompt_large_output)?
    };

    eprintln!("[text-image] {}", rendering.geometry.size_label());

    match cli.output {
        Some(path) => {
            fs::write(&path, rendering.text)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            println!("{}", rendering.text);
        }
    }

    Ok(())
}
