//! Validity, type and range screening of decoded records.
//!
//! The steps run in a fixed order and each one counts what it removes, so the
//! loss percentages are attributable to a single cause.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::SourceClock;
use crate::error::TypeCoercionError;
use crate::flags::{FlaggedRecord, FlaggedTable};
use crate::loader::RawFields;
use crate::report::percent;
use crate::waypoint::Waypoint;

/// Fixed-point scale factors of the upstream transponder decoder
pub const LATLON_SCALE: f64 = 1e7;
pub const ALTITUDE_SCALE: f64 = 1e3;
pub const MOTION_SCALE: f64 = 1e2;

/// Cell values the logger (or a spreadsheet round trip) uses for "no data"
const MISSING_MARKERS: &[&str] = &["-", "", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// TSLC values accepted as a fresh report, in seconds
const VALID_TSLC: std::ops::RangeInclusive<i64> = 1..=2;

/// Rows entering one filter and how many it removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub input: usize,
    pub removed: usize,
}

impl StageCount {
    fn new(input: usize, output: usize) -> Self {
        Self {
            input,
            removed: input - output,
        }
    }

    /// Share of this filter's input that it removed
    pub fn pct(&self) -> f64 {
        percent(self.removed, self.input)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScreeningStats {
    pub input_rows: usize,
    /// Rows whose `valid_LATLON` flag is false
    pub invalid_latlon_flags: usize,
    /// Rows whose `valid_ALTITUDE` flag is false
    pub invalid_altitude_flags: usize,
    pub flag_filter: StageCount,
    pub missing_values: StageCount,
    pub coercion_failures: StageCount,
    pub invalid_tslc: StageCount,
    pub invalid_coords: StageCount,
    pub duplicates: StageCount,
    /// Coerced rows reporting pressure altitude, when the file has an altType column
    pub pressure_altitude_rows: Option<usize>,
    pub coerced_rows: usize,
}

impl ScreeningStats {
    pub fn invalid_latlon_pct(&self) -> f64 {
        percent(self.invalid_latlon_flags, self.input_rows)
    }

    pub fn invalid_altitude_pct(&self) -> f64 {
        percent(self.invalid_altitude_flags, self.input_rows)
    }

    pub fn invalid_tslc_pct(&self) -> f64 {
        self.invalid_tslc.pct()
    }

    pub fn invalid_coord_range_pct(&self) -> f64 {
        self.invalid_coords.pct()
    }

    /// Flag-based and range-based coordinate losses combined
    pub fn invalid_coord_pct(&self) -> f64 {
        self.invalid_latlon_pct() + self.invalid_coord_range_pct()
    }

    pub fn duplicate_pct(&self) -> f64 {
        self.duplicates.pct()
    }

    pub fn pressure_altitude_pct(&self) -> Option<f64> {
        self.pressure_altitude_rows
            .map(|rows| percent(rows, self.coerced_rows))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScreenedTable {
    pub waypoints: Vec<Waypoint>,
    pub stats: ScreeningStats,
}

fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

fn has_missing_required(fields: &RawFields) -> bool {
    [
        &fields.time,
        &fields.aircraft_id,
        &fields.lat,
        &fields.lon,
        &fields.altitude,
        &fields.heading,
        &fields.hor_velocity,
        &fields.ver_velocity,
        &fields.tslc,
    ]
    .into_iter()
    .any(|value| is_missing(value))
}

fn parse_int(field: &'static str, value: &str) -> Result<i64, TypeCoercionError> {
    value
        .parse::<i64>()
        .map_err(|_| TypeCoercionError::NotAnInteger {
            field,
            value: value.to_string(),
        })
}

/// Epoch seconds, integral or fractional
fn parse_epoch(value: &str) -> Result<(i64, u32), TypeCoercionError> {
    if let Ok(seconds) = value.parse::<i64>() {
        return Ok((seconds, 0));
    }

    let invalid = || TypeCoercionError::InvalidEpoch {
        value: value.to_string(),
    };
    let seconds = value.parse::<f64>().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds.abs() > i64::MAX as f64 {
        return Err(invalid());
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    Ok((whole as i64, nanos))
}

/// Integer coercion, epoch conversion and rescaling of one row
fn to_waypoint(record: FlaggedRecord, clock: &SourceClock) -> Result<Waypoint, TypeCoercionError> {
    let fields = record.fields;

    let lat = parse_int("lat", &fields.lat)?;
    let lon = parse_int("lon", &fields.lon)?;
    let altitude = parse_int("altitude", &fields.altitude)?;
    let heading = parse_int("heading", &fields.heading)?;
    let hor_velocity = parse_int("hor_velocity", &fields.hor_velocity)?;
    let ver_velocity = parse_int("ver_velocity", &fields.ver_velocity)?;
    let tslc = parse_int("tslc", &fields.tslc)?;
    let alt_type = fields
        .alt_type
        .as_deref()
        .filter(|value| !is_missing(value))
        .and_then(|value| value.parse::<i64>().ok());

    let (seconds, nanos) = parse_epoch(&fields.time)?;
    let time = clock.resolve(seconds, nanos)?;

    Ok(Waypoint {
        source_line: fields.source_line,
        aircraft_id: fields.aircraft_id,
        time,
        lat: lat as f64 / LATLON_SCALE,
        lon: lon as f64 / LATLON_SCALE,
        altitude: altitude as f64 / ALTITUDE_SCALE,
        heading: heading as f64 / MOTION_SCALE,
        horizontal_velocity: hor_velocity as f64 / MOTION_SCALE,
        vertical_velocity: ver_velocity as f64 / MOTION_SCALE,
        tslc,
        alt_type,
        flags: record.flags,
    })
}

fn has_valid_coords(waypoint: &Waypoint) -> bool {
    waypoint.lat < 90.0 && waypoint.lat > -90.0 && waypoint.lon < 180.0 && waypoint.lon > -180.0
}

/// Keep the last occurrence of each (time, aircraft, position) key, in input order
fn drop_duplicates(waypoints: Vec<Waypoint>) -> Vec<Waypoint> {
    let keep: Vec<bool> = {
        let mut last_seen = HashMap::with_capacity(waypoints.len());
        for (i, waypoint) in waypoints.iter().enumerate() {
            last_seen.insert(waypoint.duplicate_key(), i);
        }
        waypoints
            .iter()
            .enumerate()
            .map(|(i, waypoint)| last_seen.get(&waypoint.duplicate_key()) == Some(&i))
            .collect()
    };

    waypoints
        .into_iter()
        .zip(keep)
        .filter_map(|(waypoint, keep)| keep.then_some(waypoint))
        .collect()
}

/// Run every screening step over a decoded table
pub fn screen(table: FlaggedTable, clock: &SourceClock) -> ScreenedTable {
    let records = table.records;
    let mut stats = ScreeningStats {
        input_rows: records.len(),
        invalid_latlon_flags: records.iter().filter(|r| !r.flags.valid_latlon).count(),
        invalid_altitude_flags: records.iter().filter(|r| !r.flags.valid_altitude).count(),
        ..Default::default()
    };

    // 1. validity flags
    let before = records.len();
    let records: Vec<FlaggedRecord> = records
        .into_iter()
        .filter(|r| r.flags.has_valid_position())
        .collect();
    stats.flag_filter = StageCount::new(before, records.len());

    // 2. missing values
    let before = records.len();
    let records: Vec<FlaggedRecord> = records
        .into_iter()
        .filter(|r| !has_missing_required(&r.fields))
        .collect();
    stats.missing_values = StageCount::new(before, records.len());

    // 3-5. coercion, timestamps, rescaling
    let before = records.len();
    let has_alt_type = records.iter().any(|r| r.fields.alt_type.is_some());
    let waypoints: Vec<Waypoint> = records
        .into_iter()
        .filter_map(|record| {
            let line = record.fields.source_line;
            to_waypoint(record, clock)
                .map_err(|e| debug!("line {}: {}", line, e))
                .ok()
        })
        .collect();
    stats.coercion_failures = StageCount::new(before, waypoints.len());
    stats.coerced_rows = waypoints.len();
    if has_alt_type {
        stats.pressure_altitude_rows =
            Some(waypoints.iter().filter(|w| w.alt_type == Some(0)).count());
    }

    // 6. TSLC freshness
    let before = waypoints.len();
    let waypoints: Vec<Waypoint> = waypoints
        .into_iter()
        .filter(|w| VALID_TSLC.contains(&w.tslc))
        .collect();
    stats.invalid_tslc = StageCount::new(before, waypoints.len());

    // 7. coordinate range, boundaries rejected
    let before = waypoints.len();
    let waypoints: Vec<Waypoint> = waypoints.into_iter().filter(has_valid_coords).collect();
    stats.invalid_coords = StageCount::new(before, waypoints.len());

    // 8. duplicates
    let before = waypoints.len();
    let waypoints = drop_duplicates(waypoints);
    stats.duplicates = StageCount::new(before, waypoints.len());

    info!(
        "Screened {} rows down to {}: flags -{}, missing -{}, coercion -{}, tslc -{}, coords -{}, duplicates -{}",
        stats.input_rows,
        waypoints.len(),
        stats.flag_filter.removed,
        stats.missing_values.removed,
        stats.coercion_failures.removed,
        stats.invalid_tslc.removed,
        stats.invalid_coords.removed,
        stats.duplicates.removed
    );

    ScreenedTable { waypoints, stats }
}
