//! Arc Welder CLI - Command-line interface for the arc-welder library
//!
//! Usage:
//!   arc-welder-cli weld <input.gcode> -o <output.gcode> [options]
//!   arc-welder-cli weld <input.gcode> --config welder.json
//!   arc-welder-cli info <input.gcode>

use anyhow::{Context, Result};
use arc_welder::{parse_line, PositionTracker, SegmentStatistics, Welder, WelderConfig};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use std::fs;
use std::path::PathBuf;

/// Compresses runs of G0/G1 moves in 3D-printer G-code into G2/G3 arcs
#[derive(Parser, Debug)]
#[command(name = "arc-welder-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress runs of linear moves into arc commands
    Weld {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output G-code file (default: <input>.aw.gcode)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Welder configuration file (JSON format); flags override its values
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Maximum deviation from the original path in mm (default: 0.05)
        #[arg(long, value_name = "MM")]
        resolution: Option<f64>,

        /// Maximum arc radius in mm (default: 1000000)
        #[arg(long, value_name = "MM")]
        max_radius: Option<f64>,

        /// Treat G90/G91 as also switching the extruder mode
        #[arg(long)]
        g90_influences_extruder: bool,

        /// Unwritten-command buffer capacity (default: 1000)
        #[arg(long, value_name = "COMMANDS")]
        buffer_size: Option<usize>,

        /// Seconds between progress updates (default: 1)
        #[arg(long, value_name = "SECONDS")]
        progress_interval: Option<f64>,

        /// Print the segment statistics table after welding
        #[arg(long)]
        stats: bool,
    },

    /// Display information about a G-code file
    Info {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Weld {
            input,
            output,
            config,
            resolution,
            max_radius,
            g90_influences_extruder,
            buffer_size,
            progress_interval,
            stats,
        } => cmd_weld(
            input,
            output,
            config,
            resolution,
            max_radius,
            g90_influences_extruder,
            buffer_size,
            progress_interval,
            stats,
        ),
        Commands::Info { input } => cmd_info(input),
    }
}

/// Load the welder configuration from a JSON file, or use the defaults.
fn load_config(path: Option<&PathBuf>) -> Result<WelderConfig> {
    match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {}", p.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file {}", p.display()))
        }
        None => Ok(WelderConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_weld(
    input: PathBuf,
    output: Option<PathBuf>,
    config_file: Option<PathBuf>,
    resolution: Option<f64>,
    max_radius: Option<f64>,
    g90_influences_extruder: bool,
    buffer_size: Option<usize>,
    progress_interval: Option<f64>,
    stats: bool,
) -> Result<()> {
    let mut config = load_config(config_file.as_ref())?;
    if let Some(resolution) = resolution {
        config.resolution_mm = resolution;
    }
    if let Some(max_radius) = max_radius {
        config.max_radius_mm = max_radius;
    }
    if g90_influences_extruder {
        config.g90_g91_influences_extruder = true;
    }
    if let Some(buffer_size) = buffer_size {
        config.buffer_size = buffer_size;
    }
    if let Some(interval) = progress_interval {
        config.notification_period_seconds = interval;
    }

    let output_path = output.unwrap_or_else(|| input.with_extension("aw.gcode"));
    info!(
        "Welding {} -> {}",
        input.display(),
        output_path.display()
    );

    // Create progress bar
    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let result = Welder::new(&input, &output_path, config)
        .with_progress(|p| {
            progress.set_position(p.percent_complete as u64);
            progress.set_message(format!(
                "{} arcs, {} points compressed",
                p.arcs_created, p.points_compressed
            ));
            true
        })
        .process();

    progress.finish_and_clear();

    if !result.success {
        anyhow::bail!("{}", result.message);
    }

    println!("{}", result.message);
    println!(
        "Source: {} bytes, target: {} bytes ({:.1}% reduction)",
        result.progress.source_file_size,
        result.progress.target_file_size,
        result.progress.compression_percent
    );
    if stats {
        println!();
        println!("{}", result.progress.statistics.to_table());
    }
    Ok(())
}

fn cmd_info(input: PathBuf) -> Result<()> {
    let text = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let mut tracker = PositionTracker::new(false);
    let mut statistics = SegmentStatistics::new();
    let mut lines: u64 = 0;
    let mut gcodes: u64 = 0;
    let mut motions: u64 = 0;

    for line in text.lines() {
        lines += 1;
        let cmd = parse_line(line);
        if cmd.command.is_some() {
            gcodes += 1;
        }
        let update = tracker.apply(&cmd);
        if update.is_motion {
            motions += 1;
            statistics.update_source(update.pre.distance_xyz(&update.post));
        }
    }

    println!("File: {}", input.display());
    println!("  Lines: {}", lines);
    println!("  Gcodes: {}", gcodes);
    println!("  Motion commands: {}", motions);
    println!(
        "  Total travel: {:.3}mm over {} segments",
        statistics.total_length_source(),
        statistics.total_count_source()
    );
    println!();
    println!("{}", statistics.to_table());
    Ok(())
}
