use chrono::{DateTime, FixedOffset, NaiveDate};
use std::fmt;

use crate::flags::ValidityFlags;

/// One screened aircraft position report, in physical units
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// 1-based line number in the input file
    pub source_line: u64,
    /// ICAO 24-bit address as logged (hex string)
    pub aircraft_id: String,
    pub time: DateTime<FixedOffset>,
    /// Decimal degrees
    pub lat: f64,
    /// Decimal degrees
    pub lon: f64,
    /// Metres
    pub altitude: f64,
    /// Degrees
    pub heading: f64,
    pub horizontal_velocity: f64,
    pub vertical_velocity: f64,
    /// Seconds since the transponder last refreshed this report
    pub tslc: i64,
    /// 0 = pressure altitude, when the logger reports it
    pub alt_type: Option<i64>,
    pub flags: ValidityFlags,
}

impl Waypoint {
    /// Calendar date of the report in the source clock's zone
    pub fn date(&self) -> NaiveDate {
        self.time.date_naive()
    }

    /// Identity used for duplicate detection: time, aircraft and position
    pub fn duplicate_key(&self) -> (i64, u32, &str, [u64; 4]) {
        (
            self.time.timestamp(),
            self.time.timestamp_subsec_nanos(),
            self.aircraft_id.as_str(),
            self.position_bits(),
        )
    }

    /// Exact bit patterns of lat, lon, altitude and heading
    pub fn position_bits(&self) -> [u64; 4] {
        [
            self.lat.to_bits(),
            self.lon.to_bits(),
            self.altitude.to_bits(),
            self.heading.to_bits(),
        ]
    }
}

/// `<aircraft>_<run>_<YYYYMMDD>` flight identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlightId {
    pub aircraft_id: String,
    /// Per-aircraft run counter, starting at 1
    pub sequence: u32,
    pub date: NaiveDate,
}

impl FlightId {
    pub fn new(aircraft_id: impl Into<String>, sequence: u32, date: NaiveDate) -> Self {
        Self {
            aircraft_id: aircraft_id.into(),
            sequence,
            date,
        }
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.aircraft_id,
            self.sequence,
            self.date.format("%Y%m%d")
        )
    }
}
