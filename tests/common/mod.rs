//! Helpers for building logger files in integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use adsb_flights::{PipelineConfig, SourceClock};

/// Header of the current logger firmware
pub const HEADER: &str = "TIME\tICAO_address\tlat\tlon\taltitude\theading\thor_velocity\tver_velocity\tcallsign\tsquawk\ttslc\tvalidFlags";

/// 2021-07-08 12:00:00 UTC
pub const BASE_EPOCH: i64 = 1_625_745_600;

/// One raw logger line, in the logger's fixed-point units
#[derive(Debug, Clone)]
pub struct Row {
    pub time: i64,
    pub icao: String,
    pub lat: i64,
    pub lon: i64,
    pub altitude: i64,
    pub heading: i64,
    pub hor_velocity: i64,
    pub tslc: String,
    pub flags: String,
}

impl Row {
    /// A valid report `offset` seconds after [`BASE_EPOCH`], at a position unique to that offset
    pub fn at(icao: &str, offset: i64) -> Self {
        Row {
            time: BASE_EPOCH + offset,
            icao: icao.to_string(),
            lat: 194_000_000 + offset * 1_000,
            lon: -1_552_000_000,
            altitude: 1_500_000,
            heading: 9_000,
            hor_velocity: 12_000,
            tslc: "1".to_string(),
            flags: "1FF".to_string(),
        }
    }

    pub fn line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t-250\tN12345\t1200\t{}\t{}",
            self.time,
            self.icao,
            self.lat,
            self.lon,
            self.altitude,
            self.heading,
            self.hor_velocity,
            self.tslc,
            self.flags
        )
    }
}

/// Header plus one line per row
pub fn tsv(rows: &[Row]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&row.line());
        out.push('\n');
    }
    out
}

pub fn write_input(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn utc_config(site: &str) -> PipelineConfig {
    PipelineConfig::new(site, SourceClock::Utc)
}
