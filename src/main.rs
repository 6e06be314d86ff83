// SPDX-License-Identifier: GPL-3.0-only

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use depthstats::DisplayMode;
use depthstats::backends::SourceKind;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "depthstats")]
#[command(about = "Live depth statistics for Kinect-class depth sensors")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: <config dir>/depthstats/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    monitor: MonitorArgs,
}

impl Cli {
    /// Reject monitor options placed in front of a subcommand
    ///
    /// They would otherwise be parsed and silently ignored.
    fn check(self) -> Result<Self, clap::Error> {
        if self.command.is_some() && self.monitor != MonitorArgs::default() {
            return Err(Cli::command().error(
                ErrorKind::ArgumentConflict,
                "monitor options go after the subcommand, or are used without one",
            ));
        }
        Ok(self)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show live statistics from a depth device (default)
    Monitor(MonitorArgs),

    /// Show statistics for a recorded raw frame dump
    Replay {
        /// Dump file (consecutive little-endian u16 frames)
        file: PathBuf,

        /// Frame width in pixels
        #[arg(long, default_value_t = depthstats::depth::KINECT_FRAME_WIDTH)]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value_t = depthstats::depth::KINECT_FRAME_HEIGHT)]
        height: u32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Record raw frames from a depth device into a dump
    Record {
        /// Output file
        file: PathBuf,

        /// Number of frames to record
        #[arg(short = 'n', long, default_value = "30")]
        frames: u64,

        #[command(flatten)]
        device: DeviceArgs,
    },

    /// List depth devices
    List,
}

#[derive(Args, Default, Debug, PartialEq)]
struct MonitorArgs {
    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    device: DeviceArgs,
}

/// How statistics are reported
#[derive(Args, Default, Debug, PartialEq)]
pub struct OutputArgs {
    /// Output mode
    #[arg(short, long, value_enum)]
    pub mode: Option<DisplayMode>,

    /// Flag frames with more than this percentage of invalid pixels
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub threshold: Option<u32>,

    /// Stop after this many frames
    #[arg(short = 'n', long)]
    pub frames: Option<u64>,

    /// Print plain text even when stdout is a terminal
    #[arg(long)]
    pub plain: bool,

    /// Sysfs LED directory used as degradation indicator
    #[arg(long)]
    pub led: Option<PathBuf>,
}

/// Which device to capture from
#[derive(Args, Default, Debug, PartialEq)]
pub struct DeviceArgs {
    /// Driver stack
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// V4L2 device node or freedepth device index
    #[arg(short, long)]
    pub device: Option<String>,

    /// Tilt the sensor to this angle (degrees) before capturing
    #[arg(long, allow_negative_numbers = true, conflicts_with = "no_tilt")]
    pub tilt: Option<i8>,

    /// Leave the tilt motor alone
    #[arg(long)]
    pub no_tilt: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so numeric output on stdout stays pipeable.
    // Set RUST_LOG to control the level, e.g. RUST_LOG=depthstats=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse().check().unwrap_or_else(|e| e.exit());
    let config = depthstats::Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Monitor(args)) => cli::monitor(config, &args.output, &args.device)?,
        Some(Commands::Replay {
            file,
            width,
            height,
            output,
        }) => cli::replay(config, &file, width, height, &output)?,
        Some(Commands::Record {
            file,
            frames,
            device,
        }) => cli::record(config, &file, frames, &device)?,
        Some(Commands::List) => cli::list_devices(),
        None => cli::monitor(config, &cli.monitor.output, &cli.monitor.device)?,
    }

    Ok(())
}
