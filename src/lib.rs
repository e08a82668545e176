//! ADS-B flight extraction
//!
//! Turns raw tab-separated ADS-B logger files into cleaned, flight-labelled
//! waypoint tables. Each stage is a pure table-to-table transform that
//! returns its own loss counts; [`pipeline`] chains them and builds the
//! [`report::PipelineReport`].

pub mod config;
pub mod error;
pub mod flags;
pub mod loader;
pub mod log_format;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod screener;
pub mod segmenter;
pub mod simplifier;
pub mod waypoint;

pub use config::{
    AltitudeUnit, FlightDateBasis, OutputDestination, PipelineConfig, PipelineConfigFile,
    SourceClock,
};
pub use error::{ConfigError, HeaderError, PipelineError, Result};
pub use flags::ValidityFlags;
pub use output::OutputRecord;
pub use pipeline::{PipelineOutcome, ProcessedFile, process_file, run_pipeline};
pub use report::PipelineReport;
pub use schema::Schema;
pub use segmenter::Flight;
pub use waypoint::{FlightId, Waypoint};
