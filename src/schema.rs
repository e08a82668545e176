//! Column-name normalisation across logger firmware schema variants.
//!
//! Loggers have shipped at least two header spellings. This module maps
//! whatever header a file carries onto the canonical column set and reports
//! what it had to rename or strip.

use tracing::warn;

use crate::error::HeaderError;

/// Header spellings accepted for the time column; both are also the markers of
/// an embedded re-header row.
pub const TIME_HEADERS: &[&str] = &["TIME", "timestamp"];

/// Columns the logger writes that nothing downstream reads
pub const STRIPPED_COLUMNS: &[&str] = &["squawk", "callsign", "emitter_type", "emitterType"];

/// Logical fields the pipeline knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Time,
    AircraftId,
    Lat,
    Lon,
    Altitude,
    Heading,
    HorVelocity,
    VerVelocity,
    Tslc,
    ValidFlags,
    AltType,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Time,
        Field::AircraftId,
        Field::Lat,
        Field::Lon,
        Field::Altitude,
        Field::Heading,
        Field::HorVelocity,
        Field::VerVelocity,
        Field::Tslc,
        Field::ValidFlags,
        Field::AltType,
    ];

    /// Canonical column name after normalisation
    pub fn canonical(&self) -> &'static str {
        match self {
            Field::Time => "TIME",
            Field::AircraftId => "ICAO_address",
            Field::Lat => "lat",
            Field::Lon => "lon",
            Field::Altitude => "altitude",
            Field::Heading => "heading",
            Field::HorVelocity => "hor_velocity",
            Field::VerVelocity => "ver_velocity",
            Field::Tslc => "tslc",
            Field::ValidFlags => "validFlags",
            Field::AltType => "altType",
        }
    }

    /// Historical spellings that are renamed to the canonical one
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Time => &["timestamp"],
            Field::ValidFlags => &["valid_flags"],
            Field::AltType => &["altitude_type", "alt_type"],
            _ => &[],
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, Field::AltType)
    }

    fn from_header(name: &str) -> Option<(Field, bool)> {
        Field::ALL.iter().find_map(|field| {
            if field.canonical() == name {
                Some((*field, false))
            } else if field.aliases().contains(&name) {
                Some((*field, true))
            } else {
                None
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Name after renaming
    pub name: String,
    /// Position in the source line
    pub index: usize,
    pub field: Option<Field>,
}

/// A normalised header
#[derive(Debug, Clone)]
pub struct Schema {
    /// Number of cells a well-formed line has
    pub width: usize,
    /// Retained columns, in source order
    pub columns: Vec<Column>,
    /// `(source name, canonical name)` for every rename applied
    pub renamed: Vec<(String, &'static str)>,
    /// Unused logger columns that were dropped
    pub stripped: Vec<String>,
}

impl Schema {
    /// Normalise a header line.
    ///
    /// Fails only when no accepted time header is present; other missing
    /// columns are reported by [`Schema::layout`].
    pub fn normalize<S: AsRef<str>>(header: &[S]) -> Result<Schema, HeaderError> {
        let names: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let cell = cell.as_ref();
                let cell = if i == 0 {
                    cell.trim_start_matches('\u{feff}')
                } else {
                    cell
                };
                cell.trim().to_string()
            })
            .collect();

        if names.iter().all(|name| name.is_empty()) {
            return Err(HeaderError::Empty);
        }

        if !names.iter().any(|name| TIME_HEADERS.contains(&name.as_str())) {
            return Err(HeaderError::MissingTimeColumn {
                expected: TIME_HEADERS,
                found: names,
            });
        }

        let mut columns = Vec::with_capacity(names.len());
        let mut renamed = Vec::new();
        let mut stripped = Vec::new();
        let mut bound: Vec<Field> = Vec::new();

        for (index, name) in names.iter().enumerate() {
            if STRIPPED_COLUMNS.contains(&name.as_str()) {
                stripped.push(name.clone());
                continue;
            }

            match Field::from_header(name) {
                Some((field, _)) if bound.contains(&field) => {
                    warn!(
                        "Column '{}' duplicates {}; keeping the earlier column",
                        name,
                        field.canonical()
                    );
                    columns.push(Column {
                        name: name.clone(),
                        index,
                        field: None,
                    });
                }
                Some((field, was_alias)) => {
                    if was_alias {
                        renamed.push((name.clone(), field.canonical()));
                    }
                    bound.push(field);
                    columns.push(Column {
                        name: field.canonical().to_string(),
                        index,
                        field: Some(field),
                    });
                }
                None => columns.push(Column {
                    name: name.clone(),
                    index,
                    field: None,
                }),
            }
        }

        Ok(Schema {
            width: names.len(),
            columns,
            renamed,
            stripped,
        })
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.field == Some(field))
            .map(|c| c.index)
    }

    /// Bind every required field to a source position
    pub fn layout(&self) -> Result<FieldLayout, HeaderError> {
        let missing: Vec<&'static str> = Field::ALL
            .iter()
            .filter(|f| f.is_required() && self.index_of(**f).is_none())
            .map(|f| f.canonical())
            .collect();
        if !missing.is_empty() {
            return Err(HeaderError::MissingColumns { columns: missing });
        }

        // Every required index was checked just above
        let idx = |field: Field| self.index_of(field).unwrap_or_default();
        Ok(FieldLayout {
            time: idx(Field::Time),
            aircraft_id: idx(Field::AircraftId),
            lat: idx(Field::Lat),
            lon: idx(Field::Lon),
            altitude: idx(Field::Altitude),
            heading: idx(Field::Heading),
            hor_velocity: idx(Field::HorVelocity),
            ver_velocity: idx(Field::VerVelocity),
            tslc: idx(Field::Tslc),
            valid_flags: idx(Field::ValidFlags),
            alt_type: self.index_of(Field::AltType),
            width: self.width,
        })
    }
}

/// Source positions of the fields a raw record is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub time: usize,
    pub aircraft_id: usize,
    pub lat: usize,
    pub lon: usize,
    pub altitude: usize,
    pub heading: usize,
    pub hor_velocity: usize,
    pub ver_velocity: usize,
    pub tslc: usize,
    pub valid_flags: usize,
    pub alt_type: Option<usize>,
    pub width: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT_HEADER: &[&str] = &[
        "TIME",
        "ICAO_address",
        "lat",
        "lon",
        "altitude",
        "heading",
        "hor_velocity",
        "ver_velocity",
        "callsign",
        "squawk",
        "tslc",
        "validFlags",
        "altType",
        "emitterType",
    ];

    const LEGACY_HEADER: &[&str] = &[
        "timestamp",
        "ICAO_address",
        "lat",
        "lon",
        "altitude",
        "heading",
        "hor_velocity",
        "ver_velocity",
        "callsign",
        "emitter_type",
        "tslc",
        "valid_flags",
        "alt_type",
    ];

    #[test]
    fn test_current_header_needs_no_renames() {
        let schema = Schema::normalize(CURRENT_HEADER).unwrap();
        assert!(schema.renamed.is_empty());
        assert_eq!(schema.stripped, vec!["callsign", "squawk", "emitterType"]);
        assert_eq!(schema.width, 14);

        let layout = schema.layout().unwrap();
        assert_eq!(layout.time, 0);
        assert_eq!(layout.tslc, 10);
        assert_eq!(layout.valid_flags, 11);
        assert_eq!(layout.alt_type, Some(12));
    }

    #[test]
    fn test_legacy_header_is_renamed() {
        let schema = Schema::normalize(LEGACY_HEADER).unwrap();
        assert_eq!(
            schema.renamed,
            vec![
                ("timestamp".to_string(), "TIME"),
                ("valid_flags".to_string(), "validFlags"),
                ("alt_type".to_string(), "altType"),
            ]
        );
        assert!(schema.column_names().contains(&"TIME"));
        assert!(!schema.column_names().contains(&"callsign"));
        assert!(schema.layout().is_ok());
    }

    #[test]
    fn test_altitude_type_alias() {
        let mut header = CURRENT_HEADER.to_vec();
        header[12] = "altitude_type";
        let schema = Schema::normalize(&header).unwrap();
        assert_eq!(schema.renamed, vec![("altitude_type".to_string(), "altType")]);
    }

    #[test]
    fn test_missing_time_header() {
        let header = ["ICAO_address", "lat", "lon"];
        let err = Schema::normalize(&header).unwrap_err();
        assert!(matches!(err, HeaderError::MissingTimeColumn { .. }));
    }

    #[test]
    fn test_data_line_is_not_a_header() {
        let line = ["1625745600", "A1B2C3", "194000000", "-1552000000"];
        assert!(Schema::normalize(&line).is_err());
    }

    #[test]
    fn test_bom_is_ignored() {
        let mut header = CURRENT_HEADER.to_vec();
        header[0] = "\u{feff}TIME";
        assert!(Schema::normalize(&header).is_ok());
    }

    #[test]
    fn test_missing_required_columns() {
        let header = ["TIME", "ICAO_address", "lat", "lon"];
        let schema = Schema::normalize(&header).unwrap();
        match schema.layout().unwrap_err() {
            HeaderError::MissingColumns { columns } => {
                assert!(columns.contains(&"altitude"));
                assert!(columns.contains(&"validFlags"));
                assert!(!columns.contains(&"altType"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_time_columns_keep_first() {
        let mut header = CURRENT_HEADER.to_vec();
        header.push("timestamp");
        let schema = Schema::normalize(&header).unwrap();
        assert_eq!(schema.index_of(Field::Time), Some(0));
        assert!(schema.renamed.is_empty());
    }
}
