//! End-to-end processing of one input file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span};

use crate::config::{OutputDestination, PipelineConfig};
use crate::error::Result;
use crate::flags::decode_records;
use crate::loader::load_records;
use crate::output::{self, OutputRecord};
use crate::report::{PipelineReport, StageStats};
use crate::screener::screen;
use crate::segmenter::{Flight, group_flights, segment};
use crate::simplifier::simplify;

/// Result of running every stage over one input
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub records: Vec<OutputRecord>,
    pub flights: Vec<Flight>,
    pub report: PipelineReport,
}

/// Where a processed file's artifacts ended up
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub output: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
    pub report: PipelineReport,
}

/// Run all stages in memory over `reader`
pub fn run_pipeline<R: Read>(
    reader: R,
    input_name: &str,
    config: &PipelineConfig,
) -> Result<PipelineOutcome> {
    config.validate()?;
    let started = Instant::now();

    let raw = load_records(reader, input_name)?;
    let load_stats = raw.stats;

    let flagged = decode_records(raw);
    let decode_stats = flagged.stats;

    let screened = screen(flagged, &config.clock);
    let screening_stats = screened.stats;

    let segmented = segment(
        screened.waypoints,
        config.gap_threshold(),
        config.flight_date,
    );
    let segment_stats = segmented.stats;

    let simplified = simplify(segmented.waypoints, &config.site);

    let flights = group_flights(&simplified.waypoints);
    let records = simplified
        .waypoints
        .iter()
        .map(|row| OutputRecord::new(row, &simplified.site, config.altitude_unit))
        .collect();

    let report = PipelineReport::new(
        input_name,
        &config.site,
        StageStats {
            load: &load_stats,
            decode: &decode_stats,
            screening: &screening_stats,
            segment: &segment_stats,
            simplify: &simplified.stats,
        },
        started.elapsed().as_secs_f64(),
    );

    Ok(PipelineOutcome {
        records,
        flights,
        report,
    })
}

/// Process one input file and write its output (and report, when enabled)
pub fn process_file(path: &Path, config: &PipelineConfig) -> Result<ProcessedFile> {
    config.validate()?;

    let input_name = path.display().to_string();
    let span = info_span!("input", file = %input_name);
    let _entered = span.enter();

    info!("Processing {}", input_name);
    let file = File::open(path)?;
    let outcome = run_pipeline(BufReader::new(file), &input_name, config)?;
    outcome.report.log();

    let file_name = output::output_file_name(config.park.as_deref(), &config.site, path);
    let written = output::write_output(&outcome.records, &config.output, &file_name)?;

    let report_file = match (&written, config.write_report) {
        (Some(out), true) => {
            let report_file = output::report_path(out);
            output::write_report(&outcome.report, &report_file)?;
            Some(report_file)
        }
        (None, true) => {
            // stdout carries the table, so the report goes next to the input
            let report_file = output::report_path(&path.with_file_name(&file_name));
            output::write_report(&outcome.report, &report_file)?;
            Some(report_file)
        }
        (_, false) => None,
    };

    Ok(ProcessedFile {
        output: written,
        report_file,
        report: outcome.report,
    })
}

/// Process several inputs independently; one failure does not stop the rest
pub fn process_files(
    paths: &[PathBuf],
    config: &PipelineConfig,
) -> Vec<(PathBuf, Result<ProcessedFile>)> {
    paths
        .iter()
        .map(|path| (path.clone(), process_file(path, config)))
        .collect()
}

/// Whether the destination can hold more than one input's output
pub fn destination_accepts_many(destination: &OutputDestination) -> bool {
    matches!(destination, OutputDestination::Directory(_))
}
