//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for quadtrader.
#[derive(Debug, thiserror::Error)]
pub enum QuadtraderError {
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

    #[error("insufficient history for {series}: have {have} points, need {need}")]
    InsufficientHistory {
        series: String,
        have: usize,
        need: usize,
    },

    #[error("series {series} is not strictly increasing by date at {date}")]
    UnorderedSeries { series: String, date: NaiveDate },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("no trading days between {start} and {end}")]
    EmptyDateRange { start: NaiveDate, end: NaiveDate },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuadtraderError {
    pub fn missing(section: &str, key: &str) -> Self {
        QuadtraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        QuadtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the warmup condition the simulator may skip over.
    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, QuadtraderError::InsufficientHistory { .. })
    }
}

impl From<&QuadtraderError> for std::process::ExitCode {
    fn from(err: &QuadtraderError) -> Self {
        let code: u8 = match err {
            QuadtraderError::Io(_) | QuadtraderError::Json(_) => 1,
            QuadtraderError::ConfigParse { .. }
            | QuadtraderError::ConfigMissing { .. }
            | QuadtraderError::ConfigInvalid { .. } => 2,
            QuadtraderError::NoData { .. }
            | QuadtraderError::Data { .. }
            | QuadtraderError::UnorderedSeries { .. } => 3,
            QuadtraderError::InsufficientHistory { .. } | QuadtraderError::EmptyDateRange { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
