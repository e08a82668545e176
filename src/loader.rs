//! Tab-separated logger file reader.
//!
//! Produces one [`RawRecord`] per well-formed data line. Lines with the wrong
//! number of cells and embedded re-header lines (concatenated log files) are
//! dropped and counted; only a missing header aborts the file.

use csv::{ByteRecord, ReaderBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{HeaderError, PipelineError, Result};
use crate::schema::{FieldLayout, Schema, TIME_HEADERS};

/// Cell values of one data line, before any decoding or coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFields {
    /// 1-based line number in the input file
    pub source_line: u64,
    pub time: String,
    pub aircraft_id: String,
    pub lat: String,
    pub lon: String,
    pub altitude: String,
    pub heading: String,
    pub hor_velocity: String,
    pub ver_velocity: String,
    pub tslc: String,
    pub alt_type: Option<String>,
}

/// A data line still carrying its packed validity column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub fields: RawFields,
    pub valid_flags: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Non-blank data lines after the header
    pub data_lines: usize,
    pub records: usize,
    pub malformed_lines: usize,
    pub embedded_headers: usize,
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub schema: Schema,
    pub records: Vec<RawRecord>,
    pub stats: LoadStats,
}

fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader)
}

fn is_blank(record: &ByteRecord) -> bool {
    record.iter().all(|cell| cell.iter().all(u8::is_ascii_whitespace))
}

fn record_line(record: &ByteRecord, fallback: u64) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(fallback)
}

fn utf8_cells(record: &ByteRecord) -> Option<Vec<&str>> {
    record
        .iter()
        .map(|cell| std::str::from_utf8(cell).ok())
        .collect()
}

fn build_record(cells: &[&str], layout: &FieldLayout, source_line: u64) -> RawRecord {
    let cell = |i: usize| cells[i].trim().to_string();
    RawRecord {
        fields: RawFields {
            source_line,
            time: cell(layout.time),
            aircraft_id: cell(layout.aircraft_id),
            lat: cell(layout.lat),
            lon: cell(layout.lon),
            altitude: cell(layout.altitude),
            heading: cell(layout.heading),
            hor_velocity: cell(layout.hor_velocity),
            ver_velocity: cell(layout.ver_velocity),
            tslc: cell(layout.tslc),
            alt_type: layout.alt_type.map(cell),
        },
        valid_flags: cell(layout.valid_flags),
    }
}

/// Read the header and every data line of a logger file
pub fn load_records<R: Read>(reader: R, input_name: &str) -> Result<RawTable> {
    let mut csv = tsv_reader(reader);
    let mut records = csv.byte_records();

    let header = loop {
        match records.next() {
            Some(record) => {
                let record = record?;
                if !is_blank(&record) {
                    break record;
                }
            }
            None => {
                return Err(PipelineError::header(input_name, HeaderError::Empty));
            }
        }
    };

    let header_cells: Vec<String> = header
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .collect();
    let schema =
        Schema::normalize(&header_cells).map_err(|e| PipelineError::header(input_name, e))?;
    let layout = schema.layout().map_err(|e| PipelineError::header(input_name, e))?;

    if !schema.renamed.is_empty() {
        debug!("{}: renamed columns {:?}", input_name, schema.renamed);
    }

    let mut stats = LoadStats::default();
    let mut out = Vec::new();
    let mut last_line = record_line(&header, 1);

    for record in records {
        let record = record?;
        let line = record_line(&record, last_line + 1);
        last_line = line;

        if is_blank(&record) {
            continue;
        }
        stats.data_lines += 1;

        let Some(cells) = utf8_cells(&record) else {
            warn!("{}: line {} is not valid UTF-8, skipping", input_name, line);
            stats.malformed_lines += 1;
            continue;
        };

        if TIME_HEADERS.contains(&cells[0].trim()) {
            debug!("{}: embedded header at line {}, skipping", input_name, line);
            stats.embedded_headers += 1;
            continue;
        }

        if cells.len() != layout.width {
            warn!(
                "{}: line {} has {} fields, expected {}; skipping",
                input_name,
                line,
                cells.len(),
                layout.width
            );
            stats.malformed_lines += 1;
            continue;
        }

        out.push(build_record(&cells, &layout, line));
    }

    stats.records = out.len();
    info!(
        "{}: loaded {} records ({} malformed lines, {} embedded headers dropped)",
        input_name, stats.records, stats.malformed_lines, stats.embedded_headers
    );

    Ok(RawTable {
        schema,
        records: out,
        stats,
    })
}

/// Open and load a logger file from disk
pub fn load_file(path: &Path) -> Result<RawTable> {
    let file = File::open(path)?;
    load_records(BufReader::new(file), &path.display().to_string())
}

/// Normalise only the header line of a file, without reading any data.
///
/// Also accepts files written by this crate; their header carries `TIME`.
pub fn check_header(path: &Path) -> Result<Schema> {
    let input_name = path.display().to_string();
    let file = File::open(path)?;
    let mut csv = tsv_or_csv_reader(BufReader::new(file), path);

    for record in csv.byte_records() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let cells: Vec<String> = record
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect();
        return Schema::normalize(&cells).map_err(|e| PipelineError::header(&input_name, e));
    }

    Err(PipelineError::header(input_name, HeaderError::Empty))
}

fn tsv_or_csv_reader<R: Read>(reader: R, path: &Path) -> csv::Reader<R> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
    } else {
        tsv_reader(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "TIME\tICAO_address\tlat\tlon\taltitude\theading\thor_velocity\tver_velocity\tcallsign\tsquawk\ttslc\tvalidFlags";

    fn line(time: i64, icao: &str) -> String {
        format!("{time}\t{icao}\t194000000\t-1552000000\t1500000\t9000\t12000\t-500\tN123\t1200\t1\t1FF")
    }

    #[test]
    fn test_load_simple_file() {
        let input = format!("{HEADER}\n{}\n{}\n", line(100, "A1B2C3"), line(101, "A1B2C3"));
        let table = load_records(input.as_bytes(), "test.tsv").unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.stats.data_lines, 2);
        let first = &table.records[0];
        assert_eq!(first.fields.time, "100");
        assert_eq!(first.fields.aircraft_id, "A1B2C3");
        assert_eq!(first.fields.lat, "194000000");
        assert_eq!(first.fields.tslc, "1");
        assert_eq!(first.fields.alt_type, None);
        assert_eq!(first.valid_flags, "1FF");
        assert_eq!(first.fields.source_line, 2);
    }

    #[test]
    fn test_embedded_headers_are_dropped() {
        let input = format!(
            "{HEADER}\n{}\n{HEADER}\n{}\n{}\n",
            line(100, "A1B2C3"),
            line(200, "A1B2C3"),
            HEADER.replacen("TIME", "timestamp", 1)
        );
        let table = load_records(input.as_bytes(), "concat.tsv").unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.stats.embedded_headers, 2);
        assert_eq!(table.records[1].fields.source_line, 4);
    }

    #[test]
    fn test_wrong_column_count_is_dropped() {
        let input = format!(
            "{HEADER}\n{}\n100\tA1B2C3\t1\n{}\textra\n{}\n",
            line(100, "A1B2C3"),
            line(101, "A1B2C3"),
            line(102, "A1B2C3")
        );
        let table = load_records(input.as_bytes(), "bad.tsv").unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.stats.malformed_lines, 2);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let input = format!("\n{HEADER}\n\n{}\n\n", line(100, "A1B2C3"));
        let table = load_records(input.as_bytes(), "blank.tsv").unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.stats.malformed_lines, 0);
    }

    #[test]
    fn test_missing_header_is_fatal() {
        let input = format!("{}\n{}\n", line(100, "A1B2C3"), line(101, "A1B2C3"));
        let err = load_records(input.as_bytes(), "noheader.tsv").unwrap_err();
        assert!(err.is_header_error());
        assert!(err.to_string().contains("noheader.tsv"));
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let err = load_records("".as_bytes(), "empty.tsv").unwrap_err();
        assert!(err.is_header_error());
    }

    #[test]
    fn test_legacy_header_with_alt_type() {
        let input = "timestamp\tICAO_address\tlat\tlon\taltitude\theading\thor_velocity\tver_velocity\ttslc\tvalid_flags\talt_type\n\
                     100\tABCDEF\t1\t2\t3\t4\t5\t6\t1\t3\t0\n";
        let table = load_records(input.as_bytes(), "legacy.tsv").unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].fields.alt_type.as_deref(), Some("0"));
        assert_eq!(table.records[0].valid_flags, "3");
    }
}
