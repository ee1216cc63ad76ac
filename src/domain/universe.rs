//! Instrument universe: code list parsing and data sufficiency checks.
//!
//! Codes that cannot be loaded, or that have fewer bars than the longest
//! indicator lookback, are skipped with a warning. The run fails only if
//! nothing is left.

use crate::domain::code_data::CodeData;
use crate::domain::error::TurtleError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

/// Instruments that passed validation, in the requested order, with their
/// raw bars already loaded.
#[derive(Debug, Clone)]
pub struct Universe {
    pub data: Vec<CodeData>,
    pub skipped: Vec<SkippedCode>,
}

impl Universe {
    pub fn codes(&self) -> Vec<String> {
        self.data.iter().map(|cd| cd.code.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }
}

pub fn validate_universe(
    data_port: &dyn DataPort,
    codes: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_bars: usize,
) -> Result<Universe, TurtleError> {
    let mut data = Vec::new();
    let mut skipped = Vec::new();
    let requested = codes.len();

    for code in codes {
        let ohlcv = match data_port.fetch_ohlcv(&code, start_date, end_date) {
            Ok(bars) => bars,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", code, e);
                skipped.push(SkippedCode {
                    code,
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if ohlcv.is_empty() {
            eprintln!("warning: skipping {} (no data found)", code);
            skipped.push(SkippedCode {
                code,
                reason: SkipReason::NoData,
            });
            continue;
        }

        if ohlcv.len() < min_bars {
            eprintln!(
                "warning: skipping {} (only {} bars, minimum {} required)",
                code,
                ohlcv.len(),
                min_bars
            );
            skipped.push(SkippedCode {
                code,
                reason: SkipReason::InsufficientBars { bars: ohlcv.len() },
            });
            continue;
        }

        eprintln!("  {}: {} bars [OK]", code, ohlcv.len());
        data.push(CodeData::new(code, ohlcv));
    }

    if data.is_empty() {
        return Err(TurtleError::InsufficientData {
            code: "all".to_string(),
            bars: 0,
            minimum: min_bars,
        });
    }

    if !skipped.is_empty() {
        eprintln!("Backtesting {} of {} codes", data.len(), requested);
    }

    Ok(Universe { data, skipped })
}
