//! Decoding of the logger's packed `validFlags` field.
//!
//! The field is a hexadecimal integer whose low 9 bits say which transponder
//! fields the receiver considers reliable. Bits are named MSB to LSB in the
//! order of [`FLAG_NAMES`].

use serde::Serialize;
use tracing::{debug, info};

use crate::error::DecodeError;
use crate::loader::{RawFields, RawTable};

pub const FLAG_NAMES: [&str; 9] = [
    "valid_BARO",
    "valid_VERTICAL_VELOCITY",
    "SIMULATED_REPORT",
    "valid_IDENT",
    "valid_CALLSIGN",
    "valid_VELOCITY",
    "valid_HEADING",
    "valid_ALTITUDE",
    "valid_LATLON",
];

const FLAG_BITS: u32 = 9;
const FLAG_MASK: u64 = (1 << FLAG_BITS) - 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ValidityFlags {
    pub valid_baro: bool,
    pub valid_vertical_velocity: bool,
    pub simulated_report: bool,
    pub valid_ident: bool,
    pub valid_callsign: bool,
    pub valid_velocity: bool,
    pub valid_heading: bool,
    pub valid_altitude: bool,
    pub valid_latlon: bool,
}

impl ValidityFlags {
    /// Decode the packed hex field.
    ///
    /// Values wider than 9 bits keep only their low 9 bits.
    pub fn decode(value: &str) -> Result<Self, DecodeError> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let packed = u64::from_str_radix(digits, 16).map_err(|_| DecodeError {
            value: value.to_string(),
        })?;

        Ok(Self::from_bits((packed & FLAG_MASK) as u16))
    }

    pub fn from_bits(bits: u16) -> Self {
        let bit = |name_index: u32| bits & (1 << (FLAG_BITS - 1 - name_index)) != 0;
        ValidityFlags {
            valid_baro: bit(0),
            valid_vertical_velocity: bit(1),
            simulated_report: bit(2),
            valid_ident: bit(3),
            valid_callsign: bit(4),
            valid_velocity: bit(5),
            valid_heading: bit(6),
            valid_altitude: bit(7),
            valid_latlon: bit(8),
        }
    }

    pub fn bits(&self) -> u16 {
        self.values()
            .iter()
            .fold(0u16, |acc, &set| (acc << 1) | u16::from(set))
    }

    /// Flag values in [`FLAG_NAMES`] order
    pub fn values(&self) -> [bool; 9] {
        [
            self.valid_baro,
            self.valid_vertical_velocity,
            self.simulated_report,
            self.valid_ident,
            self.valid_callsign,
            self.valid_velocity,
            self.valid_heading,
            self.valid_altitude,
            self.valid_latlon,
        ]
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, bool)> {
        FLAG_NAMES.into_iter().zip(self.values())
    }

    /// Position and altitude are both usable
    pub fn has_valid_position(&self) -> bool {
        self.valid_latlon && self.valid_altitude
    }
}

/// A data line with its packed column replaced by decoded flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedRecord {
    pub fields: RawFields,
    pub flags: ValidityFlags,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub input_rows: usize,
    pub decode_failures: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FlaggedTable {
    pub records: Vec<FlaggedRecord>,
    pub stats: DecodeStats,
}

/// Decode every record's validity field; rows whose field is not hex are dropped
pub fn decode_records(table: RawTable) -> FlaggedTable {
    let input_rows = table.records.len();
    let mut decode_failures = 0;

    let records: Vec<FlaggedRecord> = table
        .records
        .into_iter()
        .filter_map(|record| match ValidityFlags::decode(&record.valid_flags) {
            Ok(flags) => Some(FlaggedRecord {
                fields: record.fields,
                flags,
            }),
            Err(e) => {
                debug!("line {}: {}", record.fields.source_line, e);
                decode_failures += 1;
                None
            }
        })
        .collect();

    if decode_failures > 0 {
        info!(
            "Dropped {} of {} rows with undecodable validity flags",
            decode_failures, input_rows
        );
    }

    FlaggedTable {
        records,
        stats: DecodeStats {
            input_rows,
            decode_failures,
        },
    }
}
