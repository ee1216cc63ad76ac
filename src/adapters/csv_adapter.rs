//! CSV file data adapter.
//!
//! One file per instrument, `<CODE>.csv`, with a header row naming
//! `date,open,high,low,close,volume` in any order. An empty price field is
//! read as NaN and treated downstream as a missing price.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    /// Every bar in the file, sorted by date.
    fn read_all(&self, code: &str) -> Result<Vec<OhlcvBar>, TurtleError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| TurtleError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| TurtleError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let mut index = [0usize; 6];
        for (slot, name) in index.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| TurtleError::Data {
                    reason: format!("missing {} column in {}", name, path.display()),
                })?;
        }

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| TurtleError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let field = |i: usize| record.get(index[i]).unwrap_or("").trim();

            let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d").map_err(|e| {
                TurtleError::Data {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            bars.push(OhlcvBar {
                code: code.to_string(),
                date,
                open: parse_price(field(1), "open")?,
                high: parse_price(field(2), "high")?,
                low: parse_price(field(3), "low")?,
                close: parse_price(field(4), "close")?,
                volume: parse_volume(field(5))?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn parse_price(value: &str, column: &str) -> Result<f64, TurtleError> {
    if value.is_empty() {
        return Ok(f64::NAN);
    }
    value.parse().map_err(|e| TurtleError::Data {
        reason: format!("invalid {} value: {}", column, e),
    })
}

/// Volumes are sometimes written as floats; truncate them.
fn parse_volume(value: &str) -> Result<i64, TurtleError> {
    if value.is_empty() {
        return Ok(0);
    }
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v as i64)
        .ok_or_else(|| TurtleError::Data {
            reason: format!("invalid volume value: {}", value),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TurtleError> {
        let mut bars = self.read_all(code)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TurtleError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TurtleError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TurtleError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TurtleError> {
        let bars = self.read_all(code)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
