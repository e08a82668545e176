use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{error, info};

use adsb_flights::config::DEFAULT_GAP_THRESHOLD_SECONDS;
use adsb_flights::pipeline::destination_accepts_many;
use adsb_flights::{
    AltitudeUnit, ConfigError, FlightDateBasis, OutputDestination, PipelineConfig,
    PipelineConfigFile, SourceClock, process_file,
};

#[derive(Args, Debug, Default)]
pub struct ProcessArgs {
    /// TOML config file; command line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logger/site label written to every output row
    #[arg(long)]
    pub site: Option<String>,

    /// Park or study-area code used in output file names
    #[arg(long)]
    pub park: Option<String>,

    /// Idle seconds between two reports that start a new flight
    #[arg(long, value_name = "SECONDS")]
    pub gap_threshold: Option<i64>,

    /// Clock the logger was set to: `utc` or an IANA zone such as `America/Denver`
    #[arg(long)]
    pub clock: Option<String>,

    /// Date used in flight identifiers: `run-start` or `waypoint`
    #[arg(long)]
    pub flight_date: Option<FlightDateBasis>,

    /// Unit of the output altitude column: `meters` or `feet`
    #[arg(long)]
    pub altitude_unit: Option<AltitudeUnit>,

    /// Directory receiving `ADSB_<park>_<site>_<input>.csv` files
    #[arg(long, conflicts_with_all = ["output", "stdout"])]
    pub output_dir: Option<PathBuf>,

    /// Exact output file (single input only)
    #[arg(long, conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write the table to standard output (single input only)
    #[arg(long)]
    pub stdout: bool,

    /// Also write a JSON run report next to each output
    #[arg(long)]
    pub report: bool,

    /// Raw logger files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

/// Merge command line flags over the config file layer
pub fn build_config(
    args: &ProcessArgs,
    file: PipelineConfigFile,
) -> std::result::Result<PipelineConfig, ConfigError> {
    let clock = args
        .clock
        .as_deref()
        .or(file.clock.as_deref())
        .ok_or(ConfigError::MissingClock)
        .and_then(SourceClock::parse)?;

    let site = args
        .site
        .clone()
        .or(file.site)
        .ok_or(ConfigError::EmptySite)?;

    let output = if args.stdout {
        OutputDestination::Stdout
    } else if let Some(path) = &args.output {
        OutputDestination::File(path.clone())
    } else {
        let dir = args
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        OutputDestination::Directory(dir)
    };

    let config = PipelineConfig {
        gap_threshold_seconds: args
            .gap_threshold
            .or(file.gap_threshold_seconds)
            .unwrap_or(DEFAULT_GAP_THRESHOLD_SECONDS),
        site,
        park: args.park.clone().or(file.park),
        clock,
        flight_date: args.flight_date.or(file.flight_date).unwrap_or_default(),
        altitude_unit: args.altitude_unit.or(file.altitude_unit).unwrap_or_default(),
        output,
        write_report: args.report || file.write_report.unwrap_or(false),
    };
    config.validate()?;
    Ok(config)
}

pub fn handle_process(args: ProcessArgs) -> Result<()> {
    let file = match &args.config {
        Some(path) => PipelineConfigFile::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => PipelineConfigFile::default(),
    };
    let config = build_config(&args, file).context("Invalid configuration")?;

    if args.inputs.len() > 1 && !destination_accepts_many(&config.output) {
        anyhow::bail!(
            "{} inputs given but the destination holds a single table; use --output-dir",
            args.inputs.len()
        );
    }

    info!(
        "Processing {} input(s) for site {} with clock {} and a {}s gap threshold",
        args.inputs.len(),
        config.site,
        config.clock,
        config.gap_threshold_seconds
    );

    let mut failed = 0;
    for path in &args.inputs {
        match process_file(path, &config) {
            Ok(processed) => {
                if let Some(output) = processed.output {
                    info!("{} -> {}", path.display(), output.display());
                }
            }
            Err(e) => {
                failed += 1;
                error!("Failed to process {}: {}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} inputs failed", failed, args.inputs.len());
    }
    Ok(())
}
