mod app;
mod config;
mod geo;
mod input;
mod lighting;
mod overlay;
mod projection;
mod render;
mod settings;
mod sim;
mod terminal;
mod theme;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use config::{RunConfig, SnapshotConfig};
use geo::atlas::AtlasSource;
use settings::Settings;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netwatch")]
#[command(author = "Terminal Art Generator")]
#[command(version = "0.1.0")]
#[command(about = "Animated cyber-attack globe for the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive globe (default)
    Run {
        #[command(flatten)]
        globe: GlobeArgs,

        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,
    },

    /// Render a single frame to a PNG file without a terminal
    Snapshot {
        #[command(flatten)]
        globe: GlobeArgs,

        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,

        /// Simulation ticks to run before rendering
        #[arg(long, default_value = "120")]
        ticks: u32,

        /// Image width in logical pixels
        #[arg(long, default_value = "800")]
        width: u32,

        /// Image height in logical pixels
        #[arg(long, default_value = "600")]
        height: u32,

        /// Device pixels per logical pixel, at most 8 (sides cap at 4096 device pixels)
        #[arg(long, default_value = "1")]
        density: u32,
    },

    /// List the built-in themes
    Themes,
}

#[derive(Args, Debug, Default)]
struct GlobeArgs {
    /// Colour theme: cyber, light, matrix, midnight, geography
    #[arg(short = 'T', long)]
    theme: Option<String>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Degrees of rotation per frame (0-1)
    #[arg(short, long)]
    rotation_speed: Option<f64>,

    /// Maximum number of live attacks (0-50)
    #[arg(short, long)]
    intensity: Option<usize>,

    /// Number of satellites (0-20)
    #[arg(long)]
    satellites: Option<usize>,

    /// Initial zoom (0.5-3)
    #[arg(short, long)]
    zoom: Option<f64>,

    /// Hide the latitude/longitude grid
    #[arg(long)]
    no_graticule: bool,

    /// Hide satellites and draw satellite relays as plain arcs
    #[arg(long)]
    no_satellites: bool,

    /// Pick attack endpoints anywhere instead of major hubs
    #[arg(long)]
    global: bool,

    /// Start with rotation and satellites paused
    #[arg(long)]
    paused: bool,

    /// Do not load country outlines
    #[arg(long)]
    no_geography: bool,

    /// TopoJSON world atlas to load (URL or file path)
    #[arg(long, value_name = "PATH|URL", conflicts_with = "no_geography")]
    geography: Option<String>,

    /// WLED controller address for lighting sync
    #[arg(long, value_name = "IP")]
    wled: Option<String>,
}

impl GlobeArgs {
    /// Command-line values override whatever the config file set.
    fn apply(&self, config: &mut RunConfig) {
        if let Some(theme) = &self.theme {
            config.theme_id = theme.to_lowercase();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        let globe = &mut config.globe;
        if let Some(v) = self.rotation_speed {
            globe.rotation_speed = v;
        }
        if let Some(v) = self.intensity {
            globe.attack_intensity = v;
        }
        if let Some(v) = self.satellites {
            globe.satellite_count = v;
        }
        if let Some(v) = self.zoom {
            globe.zoom = v;
        }
        if self.no_graticule {
            globe.show_graticule = false;
        }
        if self.no_satellites {
            globe.show_satellites = false;
        }
        if self.global {
            globe.major_cities_only = false;
        }
        if self.paused {
            globe.is_playing = false;
        }
        *globe = globe.clamped();

        if self.no_geography {
            config.geography = None;
        } else if let Some(source) = &self.geography {
            config.geography = Some(AtlasSource::parse(source));
        }
        if self.wled.is_some() {
            config.lighting.ip = self.wled.clone();
        }
    }
}

fn log_path() -> Option<PathBuf> {
    Some(dirs::cache_dir()?.join("netwatch").join("netwatch.log"))
}

fn open_log_file() -> Option<File> {
    let path = log_path()?;
    fs::create_dir_all(path.parent()?).ok()?;
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Interactive mode owns the screen, so its log goes to a file.
fn init_logging(to_file: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if to_file {
        match open_log_file() {
            Some(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            None => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    let _ = builder.try_init();
}

fn base_config() -> RunConfig {
    let mut config = RunConfig::default();
    Settings::load().apply(&mut config);
    config
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run {
        globe: GlobeArgs::default(),
        fps: None,
        frames: None,
    });

    match command {
        Commands::Run { globe, fps, frames } => {
            init_logging(true);
            let mut config = base_config();
            globe.apply(&mut config);
            if let Some(fps) = fps {
                config.fps = fps;
            }
            config.frames = frames;
            app::run(config)?;
        }
        Commands::Snapshot {
            globe,
            out,
            ticks,
            width,
            height,
            density,
        } => {
            init_logging(false);
            let mut run = base_config();
            globe.apply(&mut run);
            app::run_snapshot(SnapshotConfig {
                run,
                out,
                ticks,
                width,
                height,
                density,
            })?;
        }
        Commands::Themes => {
            for theme in theme::THEMES.iter() {
                println!("{:<10} {}", theme.id, theme.name);
            }
        }
    }

    Ok(())
}
