//! Emission of the cleaned waypoint table and the JSON run report.

use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{AltitudeUnit, OutputDestination};
use crate::error::Result;
use crate::report::PipelineReport;
use crate::segmenter::LabeledWaypoint;

/// Output header, in column order
pub const OUTPUT_COLUMNS: [&str; 11] = [
    "SITE",
    "DATE",
    "ICAO_address",
    "TIME",
    "lat",
    "lon",
    "altitude",
    "heading",
    "hor_velocity",
    "ver_velocity",
    "flight_id",
];

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// One row of the cleaned table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    #[serde(rename = "SITE")]
    pub site: String,
    #[serde(rename = "DATE")]
    pub date: String,
    #[serde(rename = "ICAO_address")]
    pub aircraft_id: String,
    #[serde(rename = "TIME")]
    pub time: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    pub heading: f64,
    pub hor_velocity: f64,
    pub ver_velocity: f64,
    pub flight_id: String,
}

impl OutputRecord {
    pub fn new(row: &LabeledWaypoint, site: &str, altitude_unit: AltitudeUnit) -> Self {
        let waypoint = &row.waypoint;
        Self {
            site: site.to_string(),
            date: waypoint.date().format("%Y%m%d").to_string(),
            aircraft_id: waypoint.aircraft_id.clone(),
            time: waypoint.time.format(TIME_FORMAT).to_string(),
            lat: waypoint.lat,
            lon: waypoint.lon,
            altitude: altitude_unit.from_meters(waypoint.altitude),
            heading: waypoint.heading,
            hor_velocity: waypoint.horizontal_velocity,
            ver_velocity: waypoint.vertical_velocity,
            flight_id: row.flight_id.to_string(),
        }
    }
}

/// `ADSB_<park>_<site>_<input stem>.csv`, or `ADSB_<site>_<stem>.csv` without a park
pub fn output_file_name(park: Option<&str>, site: &str, input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    match park {
        Some(park) => format!("ADSB_{}_{}_{}.csv", park, site, stem),
        None => format!("ADSB_{}_{}.csv", site, stem),
    }
}

/// Path of the JSON report written alongside an output file
pub fn report_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}.report.json", stem))
}

/// Write the header and every record as comma-separated text
pub fn write_records<W: Write>(writer: W, records: &[OutputRecord]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(OUTPUT_COLUMNS)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> Result<()>,
{
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let file = File::create(&temp_path)?;
    if let Err(e) = write(BufWriter::new(file)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Write the table to its destination; returns the file written, if any
pub fn write_output(
    records: &[OutputRecord],
    destination: &OutputDestination,
    file_name: &str,
) -> Result<Option<PathBuf>> {
    let path = match destination {
        OutputDestination::Stdout => {
            write_records(io::stdout().lock(), records)?;
            return Ok(None);
        }
        OutputDestination::Directory(dir) => {
            fs::create_dir_all(dir)?;
            dir.join(file_name)
        }
        OutputDestination::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            path.clone()
        }
    };

    write_atomically(&path, |writer| write_records(writer, records))?;
    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(Some(path))
}

pub fn write_report(report: &PipelineReport, path: &Path) -> Result<()> {
    write_atomically(path, |mut writer| {
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    })?;
    info!("Wrote run report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlightDateBasis, SourceClock};
    use crate::flags::ValidityFlags;
    use crate::segmenter::segment;
    use crate::waypoint::Waypoint;
    use chrono::TimeDelta;

    fn labeled(clock: SourceClock) -> Vec<LabeledWaypoint> {
        let rows = (0..2)
            .map(|i| Waypoint {
                source_line: i + 2,
                aircraft_id: "A1B2C3".to_string(),
                time: clock.resolve(1_625_745_600 + i as i64, 0).unwrap(),
                lat: 19.4,
                lon: -155.2 + i as f64,
                altitude: 1000.0,
                heading: 90.0,
                horizontal_velocity: 120.0,
                vertical_velocity: -2.5,
                tslc: 1,
                alt_type: None,
                flags: ValidityFlags::from_bits(0x1FF),
            })
            .collect();
        segment(rows, TimeDelta::seconds(900), FlightDateBasis::RunStart).waypoints
    }

    #[test]
    fn test_file_names() {
        let input = Path::new("/data/raw/20210708_logger.tsv");
        assert_eq!(
            output_file_name(Some("HAVO"), "KAHUKU", input),
            "ADSB_HAVO_KAHUKU_20210708_logger.csv"
        );
        assert_eq!(
            output_file_name(None, "KAHUKU", input),
            "ADSB_KAHUKU_20210708_logger.csv"
        );
        assert_eq!(
            report_path(Path::new("/out/ADSB_KAHUKU_day.csv")),
            PathBuf::from("/out/ADSB_KAHUKU_day.report.json")
        );
    }

    #[test]
    fn test_record_columns() {
        let rows = labeled(SourceClock::Local(chrono_tz::Pacific::Honolulu));
        let record = OutputRecord::new(&rows[0], "KAHUKU", AltitudeUnit::Feet);

        assert_eq!(record.date, "20210708");
        assert_eq!(record.time, "2021-07-08T12:00:00-10:00");
        assert_eq!(record.flight_id, "A1B2C3_1_20210708");
        assert!((record.altitude - 3280.84).abs() < 1e-9);
    }

    #[test]
    fn test_write_records_header_only_when_empty() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "SITE,DATE,ICAO_address,TIME,lat,lon,altitude,heading,hor_velocity,ver_velocity,flight_id\n"
        );
    }

    #[test]
    fn test_write_output_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<OutputRecord> = labeled(SourceClock::Utc)
            .iter()
            .map(|row| OutputRecord::new(row, "KAHUKU", AltitudeUnit::Meters))
            .collect();

        let destination = OutputDestination::Directory(dir.path().join("out"));
        let path = write_output(&records, &destination, "ADSB_KAHUKU_day.csv")
            .unwrap()
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("KAHUKU,20210708,A1B2C3,2021-07-08T12:00:00+00:00,19.4,"));
        assert!(lines[1].ends_with(",A1B2C3_1_20210708"));
        // no temp file left behind
        assert_eq!(std::fs::read_dir(dir.path().join("out")).unwrap().count(), 1);
    }
}
