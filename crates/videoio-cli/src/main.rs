// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

mod capture;
mod devices;
mod error;
mod metrics;
mod modes;
mod playout;
mod utils;

use clap::{Parser, Subcommand};
use error::result_to_exit_code;
use std::process::ExitCode;

/// VideoIO CLI - Capture/playback card discovery, playout and capture tool
#[derive(Parser)]
#[command(name = "videoio")]
#[command(version)]
#[command(about = "VideoIO CLI - Capture/playback card discovery, playout and capture tool")]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (use RUST_LOG=trace for per-frame detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Use the built-in simulated cards instead of the hardware driver
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cards and the inputs that currently carry a usable signal
    Devices(devices::Args),

    /// List video modes grouped by resolution and frame rate
    Modes(modes::Args),

    /// Play a test pattern out of an output channel
    Playout(playout::Args),

    /// Capture frames from an input channel
    Capture(capture::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Devices(args) => devices::execute(args, cli.json, cli.simulate),
        Commands::Modes(args) => modes::execute(args, cli.json),
        Commands::Playout(args) => playout::execute(args, cli.json, cli.simulate),
        Commands::Capture(args) => capture::execute(args, cli.json, cli.simulate),
    };

    result_to_exit_code(result)
}

/// Initialize env_logger based on verbosity flags
fn init_logging(verbose: bool, quiet: bool) {
    let env = env_logger::Env::default();

    let env = if quiet {
        env.default_filter_or("error")
    } else if verbose {
        env.default_filter_or("debug")
    } else {
        env.default_filter_or("info")
    };

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::debug!("Logging initialized");
}
