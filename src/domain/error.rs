//! Domain error types.

use chrono::NaiveDate;
use serde::Serialize;

/// Top-level error type for fundscope.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("insufficient data for {instrument}: have {available}, need {required}")]
    InsufficientData {
        instrument: String,
        available: usize,
        required: usize,
    },

    #[error("division by zero computing {context}")]
    DivisionByZero { context: String },

    #[error("no price for contribution period {period_index} (target {target})")]
    MissingPricePoint {
        period_index: usize,
        target: NaiveDate,
    },

    #[error("no data available for any of {requested} instruments")]
    NoDataAvailable { requested: usize },

    #[error("invalid series {instrument}: {reason}")]
    InvalidSeries { instrument: String, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("data source error for {instrument}: {reason}")]
    DataSource { instrument: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`AnalyticsError`], kept when the error itself is dropped
/// (skipped comparison entries, serialized output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientData,
    DivisionByZero,
    MissingPricePoint,
    NoDataAvailable,
    InvalidSeries,
    InvalidParameter,
    DataSource,
    Config,
    Io,
}

impl AnalyticsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyticsError::InsufficientData { .. } => ErrorKind::InsufficientData,
            AnalyticsError::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            AnalyticsError::MissingPricePoint { .. } => ErrorKind::MissingPricePoint,
            AnalyticsError::NoDataAvailable { .. } => ErrorKind::NoDataAvailable,
            AnalyticsError::InvalidSeries { .. } => ErrorKind::InvalidSeries,
            AnalyticsError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            AnalyticsError::DataSource { .. } => ErrorKind::DataSource,
            AnalyticsError::ConfigParse { .. }
            | AnalyticsError::ConfigMissing { .. }
            | AnalyticsError::ConfigInvalid { .. } => ErrorKind::Config,
            AnalyticsError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        AnalyticsError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&AnalyticsError> for std::process::ExitCode {
    fn from(err: &AnalyticsError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::InvalidParameter | ErrorKind::InvalidSeries => 3,
            ErrorKind::DataSource | ErrorKind::NoDataAvailable => 4,
            ErrorKind::InsufficientData
            | ErrorKind::MissingPricePoint
            | ErrorKind::DivisionByZero => 5,
        };
        std::process::ExitCode::from(code)
    }
}
