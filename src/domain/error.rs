//! Domain error types.

use chrono::NaiveDate;

use super::portfolio::Snapshot;
use super::strategy::Subsystem;

/// Top-level error type for turtletrader.
#[derive(Debug, thiserror::Error)]
pub enum TurtleError {
    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    /// Portfolio value recomputed from a day's snapshot was NaN. The full
    /// snapshot is attached for diagnosis.
    #[error("invalid portfolio value {value} on {date}")]
    InvalidPortfolioValue {
        date: NaiveDate,
        value: f64,
        snapshot: Box<Snapshot>,
    },

    #[error("cash error after {subsystem} fill on {code} at {date}: cash = {cash}")]
    CashError {
        subsystem: Subsystem,
        code: String,
        date: NaiveDate,
        cash: f64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TurtleError> for std::process::ExitCode {
    fn from(err: &TurtleError) -> Self {
        let code: u8 = match err {
            TurtleError::Io(_) => 1,
            TurtleError::ConfigParse { .. }
            | TurtleError::ConfigMissing { .. }
            | TurtleError::ConfigInvalid { .. } => 2,
            TurtleError::Data { .. } => 3,
            TurtleError::NoData { .. } | TurtleError::InsufficientData { .. } => 5,
            TurtleError::InvalidPortfolioValue { .. } | TurtleError::CashError { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
