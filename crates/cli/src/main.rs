// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `warden`: thin admin front-end for `wardend`. Session control (prompts,
//! permission decisions, live output) belongs to the mobile client over
//! StreamMux, not this CLI — see [`commands`].

mod client;
mod color;
mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use warden_daemon::config::Config;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "warden", version = VERSION, styles = color::styles())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start wardend if it isn't already running.
    Start {
        /// Run in the foreground instead of detaching.
        #[arg(long)]
        foreground: bool,
    },
    /// Request an orderly shutdown of a running wardend.
    Stop,
    /// Report wardend's health and active sessions.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Tail wardend's structured log file.
    Logs {
        /// Number of recent lines to show.
        #[arg(short = 'n', long, default_value_t = 200)]
        lines: usize,
        /// Keep polling for new lines.
        #[arg(short, long)]
        follow: bool,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        if let Some(exit) = err.downcast_ref::<ExitError>() {
            eprintln!("{exit}");
            std::process::exit(exit.code);
        }
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    match cli.command {
        Command::Start { foreground } => commands::start(&config, foreground).await,
        Command::Stop => commands::stop(&config).await,
        Command::Status { json } => commands::status(&config, json).await,
        Command::Logs { lines, follow, json } => commands::logs(&config, lines, follow, json).await,
    }
}
