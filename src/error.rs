use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Schema-level failures. Any of these aborts the whole input file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("input is empty, no header line found")]
    Empty,

    #[error("no time column (expected one of {expected:?}), found columns {found:?}")]
    MissingTimeColumn {
        expected: &'static [&'static str],
        found: Vec<String>,
    },

    #[error("required columns missing: {columns:?}")]
    MissingColumns { columns: Vec<&'static str> },
}

/// A packed validity field that is not a hexadecimal integer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validity flags '{value}' are not a hexadecimal integer")]
pub struct DecodeError {
    pub value: String,
}

/// A required field that cannot be coerced to its numeric type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeCoercionError {
    #[error("field {field} value '{value}' is not an integer")]
    NotAnInteger { field: &'static str, value: String },

    #[error("time value '{value}' is not an epoch timestamp")]
    InvalidEpoch { value: String },

    #[error("epoch {seconds}s does not map to a single instant in {clock}")]
    UnresolvableTime { seconds: i64, clock: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("gap threshold must be a positive number of seconds, got {0}")]
    InvalidThreshold(i64),

    #[error("site label must not be empty")]
    EmptySite,

    #[error("unknown timezone '{name}': {reason}")]
    UnknownTimezone { name: String, reason: String },

    #[error("no source clock given; pass 'utc' or an IANA zone name")]
    MissingClock,

    #[error("invalid config file {path}: {reason}")]
    InvalidFile { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input {input} rejected: {source}")]
    Header {
        input: String,
        #[source]
        source: HeaderError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn header(input: impl Into<String>, source: HeaderError) -> Self {
        PipelineError::Header {
            input: input.into(),
            source,
        }
    }

    /// True for failures that reject the input file itself rather than the run.
    pub fn is_header_error(&self) -> bool {
        matches!(self, PipelineError::Header { .. })
    }
}
