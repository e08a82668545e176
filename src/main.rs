use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use adsb_flights::log_format::TargetFirstFormat;

mod commands;

use commands::{CheckHeaderArgs, ProcessArgs, handle_check_header, handle_process};

#[derive(Parser)]
#[command(name = "adsb-flights")]
#[command(about = "Clean raw ADS-B logger files into flight-labelled waypoint tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process logger files into cleaned waypoint CSVs
    Process(ProcessArgs),
    /// Validate input headers without processing any rows
    CheckHeader(CheckHeaderArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so that --stdout output stays clean
    let ansi = std::io::stderr().is_terminal();
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(ansi)
                .with_writer(std::io::stderr)
                .event_format(TargetFirstFormat { ansi }),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Process(args) => handle_process(args),
        Commands::CheckHeader(args) => handle_check_header(args),
    }
}
