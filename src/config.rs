use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, TypeCoercionError};

/// Idle time between two reports of the same aircraft that starts a new flight (15 minutes)
pub const DEFAULT_GAP_THRESHOLD_SECONDS: i64 = 900;

/// How the logger's epoch-second TIME values relate to real time.
///
/// Loggers are initialised by local operators, so the epoch value may encode
/// either true UTC or the local wall clock of the receiver site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClock {
    /// Epoch seconds are true UTC
    Utc,
    /// Epoch seconds encode local wall-clock time in the given zone
    Local(Tz),
}

impl SourceClock {
    /// Parse `utc` (any case) or an IANA zone name such as `America/Denver`
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingClock);
        }
        if trimmed.eq_ignore_ascii_case("utc") {
            return Ok(SourceClock::Utc);
        }
        trimmed
            .parse::<Tz>()
            .map(SourceClock::Local)
            .map_err(|e| ConfigError::UnknownTimezone {
                name: trimmed.to_string(),
                reason: e.to_string(),
            })
    }

    /// Resolve an epoch value into an absolute timestamp carrying its UTC offset.
    ///
    /// For local clocks the epoch is read as wall time; on a DST overlap the
    /// earlier instant is used, and wall times skipped by a DST jump fail.
    pub fn resolve(
        &self,
        seconds: i64,
        nanos: u32,
    ) -> Result<DateTime<FixedOffset>, TypeCoercionError> {
        let as_utc = DateTime::from_timestamp(seconds, nanos).ok_or_else(|| {
            TypeCoercionError::InvalidEpoch {
                value: seconds.to_string(),
            }
        })?;

        match self {
            SourceClock::Utc => Ok(as_utc.fixed_offset()),
            SourceClock::Local(tz) => tz
                .from_local_datetime(&as_utc.naive_utc())
                .earliest()
                .map(|local| local.fixed_offset())
                .ok_or_else(|| TypeCoercionError::UnresolvableTime {
                    seconds,
                    clock: self.to_string(),
                }),
        }
    }
}

impl fmt::Display for SourceClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceClock::Utc => write!(f, "UTC"),
            SourceClock::Local(tz) => write!(f, "{}", tz.name()),
        }
    }
}

impl FromStr for SourceClock {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceClock::parse(s)
    }
}

/// Which waypoint's calendar date goes into a flight identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlightDateBasis {
    /// Date of the first waypoint of the run
    #[default]
    RunStart,
    /// Date of each waypoint; a flight spanning midnight gets two identifiers
    Waypoint,
}

impl FromStr for FlightDateBasis {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run-start" | "run_start" => Ok(FlightDateBasis::RunStart),
            "waypoint" => Ok(FlightDateBasis::Waypoint),
            other => Err(ConfigError::InvalidFile {
                path: "<command line>".to_string(),
                reason: format!("unknown flight date basis '{}'", other),
            }),
        }
    }
}

/// Unit of the emitted altitude column. Rescaled logger altitude is in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AltitudeUnit {
    #[default]
    Meters,
    Feet,
}

impl AltitudeUnit {
    pub fn from_meters(&self, meters: f64) -> f64 {
        match self {
            AltitudeUnit::Meters => meters,
            AltitudeUnit::Feet => meters * 3.28084,
        }
    }
}

impl FromStr for AltitudeUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "meters" | "metres" | "m" => Ok(AltitudeUnit::Meters),
            "feet" | "ft" => Ok(AltitudeUnit::Feet),
            other => Err(ConfigError::InvalidFile {
                path: "<command line>".to_string(),
                reason: format!("unknown altitude unit '{}'", other),
            }),
        }
    }
}

/// Where the cleaned waypoint table goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDestination {
    /// Write `ADSB_<park>_<site>_<input stem>.csv` into this directory
    Directory(PathBuf),
    /// Write exactly this file
    File(PathBuf),
    Stdout,
}

/// Everything a run needs, passed explicitly into each stage
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub gap_threshold_seconds: i64,
    /// Logger/site label attached to every output row
    pub site: String,
    /// Optional park/study-area code used in output file names
    pub park: Option<String>,
    pub clock: SourceClock,
    pub flight_date: FlightDateBasis,
    pub altitude_unit: AltitudeUnit,
    pub output: OutputDestination,
    /// Also write `<output stem>.report.json`
    pub write_report: bool,
}

impl PipelineConfig {
    pub fn new(site: impl Into<String>, clock: SourceClock) -> Self {
        Self {
            gap_threshold_seconds: DEFAULT_GAP_THRESHOLD_SECONDS,
            site: site.into(),
            park: None,
            clock,
            flight_date: FlightDateBasis::default(),
            altitude_unit: AltitudeUnit::default(),
            output: OutputDestination::Stdout,
            write_report: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gap_threshold_seconds <= 0 {
            return Err(ConfigError::InvalidThreshold(self.gap_threshold_seconds));
        }
        if self.site.trim().is_empty() {
            return Err(ConfigError::EmptySite);
        }
        Ok(())
    }

    pub fn gap_threshold(&self) -> TimeDelta {
        TimeDelta::seconds(self.gap_threshold_seconds)
    }
}

/// Config file layer (TOML). Every field is optional so command line flags can fill gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_threshold_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub park: Option<String>,
    /// `utc` or an IANA zone name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_date: Option<FlightDateBasis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_unit: Option<AltitudeUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_report: Option<bool>,
}

impl PipelineConfigFile {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::InvalidFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
