//! Run diagnostics.
//!
//! A [`PipelineReport`] is assembled from the stats each stage returns. It is
//! logged at the end of a run and can be written next to the output as JSON.

use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::flags::DecodeStats;
use crate::loader::LoadStats;
use crate::screener::ScreeningStats;
use crate::segmenter::SegmentStats;
use crate::simplifier::SimplifyStats;

/// `part` as a percentage of `whole`; 0 for an empty denominator
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub input: String,
    pub site: String,

    pub invalid_tslc_pct: f64,
    pub duplicate_pct: f64,
    pub invalid_altitude_pct: f64,
    pub invalid_coord_pct: f64,
    pub simplified_pct: f64,
    pub aircraft_count: usize,
    pub flight_count: usize,

    pub invalid_latlon_pct: f64,
    pub invalid_coord_range_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_altitude_pct: Option<f64>,

    pub data_lines: usize,
    pub malformed_lines: usize,
    pub embedded_headers: usize,
    pub decode_failures: usize,
    pub missing_value_rows: usize,
    pub coercion_failures: usize,
    pub singleton_rows: usize,
    pub singleton_flights: usize,

    pub rows_in: usize,
    pub rows_out: usize,
    pub elapsed_seconds: f64,
}

/// Stats returned by each stage of one run
#[derive(Debug, Clone, Copy)]
pub struct StageStats<'a> {
    pub load: &'a LoadStats,
    pub decode: &'a DecodeStats,
    pub screening: &'a ScreeningStats,
    pub segment: &'a SegmentStats,
    pub simplify: &'a SimplifyStats,
}

impl PipelineReport {
    pub fn new(input: &str, site: &str, stats: StageStats<'_>, elapsed_seconds: f64) -> Self {
        let screening = stats.screening;
        Self {
            input: input.to_string(),
            site: site.to_string(),
            invalid_tslc_pct: round2(screening.invalid_tslc_pct()),
            duplicate_pct: round2(screening.duplicate_pct()),
            invalid_altitude_pct: round2(screening.invalid_altitude_pct()),
            invalid_coord_pct: round2(screening.invalid_coord_pct()),
            simplified_pct: round2(stats.simplify.removed_pct()),
            aircraft_count: stats.simplify.aircraft,
            flight_count: stats.simplify.flights,
            invalid_latlon_pct: round2(screening.invalid_latlon_pct()),
            invalid_coord_range_pct: round2(screening.invalid_coord_range_pct()),
            pressure_altitude_pct: screening.pressure_altitude_pct().map(round2),
            data_lines: stats.load.data_lines,
            malformed_lines: stats.load.malformed_lines,
            embedded_headers: stats.load.embedded_headers,
            decode_failures: stats.decode.decode_failures,
            missing_value_rows: screening.missing_values.removed,
            coercion_failures: screening.coercion_failures.removed,
            singleton_rows: stats.segment.input_rows - stats.simplify.input_rows
                + stats.simplify.singleton_rows,
            singleton_flights: stats.segment.singleton_flights
                + stats.simplify.singleton_flights,
            rows_in: stats.load.records,
            rows_out: stats.simplify.output_rows,
            elapsed_seconds: round2(elapsed_seconds),
        }
    }

    /// Emit the summary through tracing
    pub fn log(&self) {
        info!("{}", self);
        if let Some(pct) = self.pressure_altitude_pct {
            info!("{:.2}% of coerced rows report pressure altitude", pct);
        }
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows in, {} rows out, {} aircraft, {} flights in {:.2}s; \
             invalid tslc {:.2}%, duplicates {:.2}%, invalid altitude {:.2}%, \
             invalid coordinates {:.2}%, simplified {:.2}%",
            self.rows_in,
            self.rows_out,
            self.aircraft_count,
            self.flight_count,
            self.elapsed_seconds,
            self.invalid_tslc_pct,
            self.duplicate_pct,
            self.invalid_altitude_pct,
            self.invalid_coord_pct,
            self.simplified_pct
        )
    }
}
