mod pipeline;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use framecast_core::FramecastConfig;

#[derive(Parser)]
#[command(
    name = "framecast",
    version,
    about = "Framecast — offloaded canvas rendering exposed as a live video stream",
    long_about = "Framecast hands a canvas surface to a background renderer thread,\nanimates it on every display refresh and captures it as a live video track."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and report render/capture/playback progress
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Seconds to run for; 0 runs until Ctrl+C
        #[arg(long, default_value_t = 5.0)]
        duration: f64,

        /// Seconds between progress reports
        #[arg(long, default_value_t = 1.0)]
        report_every: f64,
    },

    /// Start the pipeline, print the stream info panel and exit
    Describe {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Print the metadata as JSON instead of HTML
        #[arg(long)]
        json: bool,
    },

    /// Save the first captured frame as a PNG and exit
    Snapshot {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output PNG path
        #[arg(short, long, default_value = "framecast.png")]
        output: PathBuf,

        /// Seconds to wait for a captured frame
        #[arg(long, default_value_t = 5.0)]
        wait: f64,
    },

    /// Write the default configuration to a TOML file
    InitConfig {
        /// Destination path (e.g. framecast.toml)
        #[arg()]
        path: PathBuf,
    },

    /// Display version info
    Info,
}

/// Options shared by commands that start the pipeline.
#[derive(Args, Debug, Default)]
pub struct PipelineArgs {
    /// Path to a framecast.toml configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Canvas width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Capture frame rate in frames per second
    #[arg(long, conflicts_with = "capture_on_commit")]
    frame_rate: Option<f64>,

    /// Capture a frame on every commit instead of at a fixed rate
    #[arg(long)]
    capture_on_commit: bool,

    /// Display refresh rate driving the animation, in Hz
    #[arg(long)]
    refresh_rate: Option<f64>,

    /// Font file used for the label
    #[arg(long)]
    font: Option<PathBuf>,

    /// Simulate a host that blocks autoplay
    #[arg(long)]
    no_autoplay: bool,
}

impl PipelineArgs {
    /// Load the config file (or defaults) and apply command-line overrides.
    pub fn resolve_config(&self) -> Result<FramecastConfig> {
        let mut config = match &self.config {
            Some(path) => FramecastConfig::load_from_file(path)
                .with_context(|| format!("failed to load config: {}", path.display()))?,
            None => FramecastConfig::default(),
        };
        if let Some(width) = self.width {
            config.canvas.width = width;
        }
        if let Some(height) = self.height {
            config.canvas.height = height;
        }
        if self.capture_on_commit {
            config.stream.frame_rate = None;
        } else if let Some(rate) = self.frame_rate {
            config.stream.frame_rate = Some(rate);
        }
        if let Some(rate) = self.refresh_rate {
            config.render.refresh_rate = rate;
        }
        if let Some(font) = &self.font {
            config.render.font_path = Some(font.clone());
        }
        if self.no_autoplay {
            config.playback.autoplay_allowed = false;
        }
        if config.canvas.width == 0 || config.canvas.height == 0 {
            anyhow::bail!(
                "canvas size must be non-zero, got {}x{}",
                config.canvas.width,
                config.canvas.height
            );
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            pipeline,
            duration,
            report_every,
        } => {
            let config = pipeline.resolve_config()?;
            pipeline::runtime()?.block_on(pipeline::cmd_run(config, duration, report_every))
        }
        Commands::Describe { pipeline, json } => {
            let config = pipeline.resolve_config()?;
            pipeline::runtime()?.block_on(pipeline::cmd_describe(config, json))
        }
        Commands::Snapshot {
            pipeline,
            output,
            wait,
        } => {
            let config = pipeline.resolve_config()?;
            pipeline::runtime()?.block_on(pipeline::cmd_snapshot(config, &output, wait))
        }
        Commands::InitConfig { path } => cmd_init_config(&path),
        Commands::Info => cmd_info(),
    }
}

fn cmd_init_config(path: &std::path::Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("'{}' already exists", path.display());
    }
    FramecastConfig::default()
        .save_to_file(path)
        .with_context(|| format!("failed to write config: {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn cmd_info() -> Result<()> {
    let defaults = FramecastConfig::default();
    println!("Framecast");
    println!("   Version:    {}", env!("CARGO_PKG_VERSION"));
    println!("   Renderer:   CPU, background worker thread");
    println!(
        "   Canvas:     {}x{} @ {} Hz refresh",
        defaults.canvas.width, defaults.canvas.height, defaults.render.refresh_rate
    );
    println!(
        "   Capture:    {} FPS",
        defaults
            .stream
            .frame_rate
            .map_or_else(|| "on commit".to_string(), |r| r.to_string())
    );
    Ok(())
}
