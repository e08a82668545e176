//! Flight segmentation.
//!
//! Waypoints are sorted by aircraft and time, and each aircraft's sequence is
//! cut wherever two consecutive reports are at least the gap threshold apart.
//! Each run gets a `<aircraft>_<n>_<YYYYMMDD>` identifier; runs with a single
//! waypoint carry no trajectory and are discarded.

use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::FlightDateBasis;
use crate::waypoint::{FlightId, Waypoint};

/// Waypoint with its flight assignment
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledWaypoint {
    pub waypoint: Waypoint,
    pub flight_id: FlightId,
    /// Time since the aircraft's previous waypoint; zero for its first
    pub gap: TimeDelta,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentStats {
    pub input_rows: usize,
    pub aircraft: usize,
    /// Flights before singletons are removed
    pub runs: usize,
    pub singleton_flights: usize,
    pub flights: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentedTable {
    /// Sorted by aircraft then time
    pub waypoints: Vec<LabeledWaypoint>,
    pub stats: SegmentStats,
}

/// A complete flight: ordered waypoints sharing one identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    pub flight_id: FlightId,
    pub waypoints: Vec<Waypoint>,
}

impl Flight {
    pub fn aircraft_id(&self) -> &str {
        &self.flight_id.aircraft_id
    }

    pub fn duration(&self) -> TimeDelta {
        match (self.waypoints.first(), self.waypoints.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => TimeDelta::zero(),
        }
    }
}

/// Sort by (aircraft, time); equal keys keep their input order
pub fn sort_waypoints(waypoints: &mut [Waypoint]) {
    waypoints.sort_by(|a, b| {
        a.aircraft_id
            .cmp(&b.aircraft_id)
            .then_with(|| a.time.cmp(&b.time))
    });
}

/// Label every waypoint with its flight and drop single-waypoint flights
pub fn segment(
    mut waypoints: Vec<Waypoint>,
    threshold: TimeDelta,
    date_basis: FlightDateBasis,
) -> SegmentedTable {
    let input_rows = waypoints.len();
    sort_waypoints(&mut waypoints);

    let mut labeled: Vec<LabeledWaypoint> = Vec::with_capacity(waypoints.len());
    let mut aircraft = 0;
    let mut runs = 0;

    // (aircraft, sequence, run start date) of the run being built
    let mut current: Option<(String, u32, NaiveDate)> = None;
    let mut previous_time = None;

    for waypoint in waypoints {
        let same_aircraft = current
            .as_ref()
            .is_some_and(|(id, _, _)| *id == waypoint.aircraft_id);

        let gap = match previous_time {
            Some(previous) if same_aircraft => waypoint.time - previous,
            _ => TimeDelta::zero(),
        };

        let (sequence, run_date) = match current.take() {
            Some((_, sequence, run_date)) if same_aircraft && gap < threshold => {
                (sequence, run_date)
            }
            Some((_, sequence, _)) if same_aircraft => {
                log_split(&waypoint, gap);
                runs += 1;
                (sequence + 1, waypoint.date())
            }
            _ => {
                aircraft += 1;
                runs += 1;
                (1, waypoint.date())
            }
        };

        let date = match date_basis {
            FlightDateBasis::RunStart => run_date,
            FlightDateBasis::Waypoint => waypoint.date(),
        };

        previous_time = Some(waypoint.time);
        current = Some((waypoint.aircraft_id.clone(), sequence, run_date));
        labeled.push(LabeledWaypoint {
            flight_id: FlightId::new(waypoint.aircraft_id.clone(), sequence, date),
            waypoint,
            gap,
        });
    }

    let (waypoints, singleton_flights) = drop_singleton_flights(labeled);
    let flights = count_distinct_flights(&waypoints);

    info!(
        "Segmented {} waypoints from {} aircraft into {} flights ({} single-waypoint flights dropped)",
        input_rows, aircraft, flights, singleton_flights
    );

    SegmentedTable {
        waypoints,
        stats: SegmentStats {
            input_rows,
            aircraft,
            runs,
            singleton_flights,
            flights,
        },
    }
}

fn log_split(waypoint: &Waypoint, gap: TimeDelta) {
    debug!(
        "{}: gap of {}s at line {} starts a new flight",
        waypoint.aircraft_id,
        gap.num_seconds(),
        waypoint.source_line
    );
}

/// Remove every flight with fewer than two rows; returns the kept rows and the flights removed
pub(crate) fn drop_singleton_flights(
    labeled: Vec<LabeledWaypoint>,
) -> (Vec<LabeledWaypoint>, usize) {
    let mut members: HashMap<FlightId, usize> = HashMap::new();
    for row in &labeled {
        *members.entry(row.flight_id.clone()).or_default() += 1;
    }
    let singletons = members.values().filter(|&&count| count < 2).count();
    if singletons == 0 {
        return (labeled, 0);
    }

    let kept = labeled
        .into_iter()
        .filter(|row| members.get(&row.flight_id).is_some_and(|&count| count >= 2))
        .collect();
    (kept, singletons)
}

pub(crate) fn count_distinct_flights(waypoints: &[LabeledWaypoint]) -> usize {
    let mut ids: Vec<&FlightId> = waypoints.iter().map(|w| &w.flight_id).collect();
    ids.sort();
    ids.dedup();
    ids.len()
}

/// Collect a labelled table into flights, in identifier order
pub fn group_flights(waypoints: &[LabeledWaypoint]) -> Vec<Flight> {
    let mut flights: Vec<Flight> = Vec::new();
    let mut index: HashMap<&FlightId, usize> = HashMap::new();

    for row in waypoints {
        match index.get(&row.flight_id) {
            Some(&i) => flights[i].waypoints.push(row.waypoint.clone()),
            None => {
                index.insert(&row.flight_id, flights.len());
                flights.push(Flight {
                    flight_id: row.flight_id.clone(),
                    waypoints: vec![row.waypoint.clone()],
                });
            }
        }
    }

    flights.sort_by(|a, b| a.flight_id.cmp(&b.flight_id));
    flights
}
