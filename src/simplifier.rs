//! Removal of consecutive repeated positions from the labelled table.
//!
//! A row is dropped when its aircraft, position, altitude, heading and site
//! all equal those of the row directly before it in the sorted table. The
//! comparison ignores flight boundaries, so a flight can lose rows until it
//! is left with a single waypoint (or none); such flights are dropped here as
//! well, and the final aircraft and flight counts describe what remains.

use serde::Serialize;
use tracing::info;

use crate::report::percent;
use crate::segmenter::{LabeledWaypoint, count_distinct_flights, drop_singleton_flights};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimplifyStats {
    pub input_rows: usize,
    /// Rows repeating the previous row's position
    pub removed: usize,
    /// Rows of flights left with a single waypoint after repeats were removed
    pub singleton_rows: usize,
    pub singleton_flights: usize,
    pub output_rows: usize,
    /// Distinct aircraft in the final table
    pub aircraft: usize,
    /// Distinct flights in the final table
    pub flights: usize,
}

impl SimplifyStats {
    pub fn removed_pct(&self) -> f64 {
        percent(self.removed, self.input_rows)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimplifiedTable {
    pub site: String,
    pub waypoints: Vec<LabeledWaypoint>,
    pub stats: SimplifyStats,
}

fn same_position(a: &LabeledWaypoint, b: &LabeledWaypoint) -> bool {
    a.waypoint.aircraft_id == b.waypoint.aircraft_id
        && a.waypoint.position_bits() == b.waypoint.position_bits()
}

fn count_distinct_aircraft(waypoints: &[LabeledWaypoint]) -> usize {
    let mut ids: Vec<&str> = waypoints
        .iter()
        .map(|w| w.waypoint.aircraft_id.as_str())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

/// Drop rows that repeat the previous row's position, then flights left too short
pub fn simplify(waypoints: Vec<LabeledWaypoint>, site: &str) -> SimplifiedTable {
    let input_rows = waypoints.len();

    // Every row of a run carries the same site, so only the position is compared
    let keep: Vec<bool> = std::iter::once(true)
        .chain(waypoints.windows(2).map(|pair| !same_position(&pair[0], &pair[1])))
        .take(input_rows)
        .collect();

    let waypoints: Vec<LabeledWaypoint> = waypoints
        .into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();
    let removed = input_rows - waypoints.len();

    let before = waypoints.len();
    let (waypoints, singleton_flights) = drop_singleton_flights(waypoints);

    let stats = SimplifyStats {
        input_rows,
        removed,
        singleton_rows: before - waypoints.len(),
        singleton_flights,
        output_rows: waypoints.len(),
        aircraft: count_distinct_aircraft(&waypoints),
        flights: count_distinct_flights(&waypoints),
    };
    info!(
        "Simplified {} rows to {} ({:.2}% sequential duplicates, {} flights left with one waypoint dropped)",
        input_rows,
        waypoints.len(),
        stats.removed_pct(),
        stats.singleton_flights
    );

    SimplifiedTable {
        site: site.to_string(),
        waypoints,
        stats,
    }
}
