#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use turtletrader::domain::backtest::BacktestConfig;
use turtletrader::domain::code_data::CodeData;
use turtletrader::domain::error::TurtleError;
pub use turtletrader::domain::ohlcv::OhlcvBar;
use turtletrader::domain::strategy::BreakoutWindows;
use turtletrader::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TurtleError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(TurtleError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TurtleError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TurtleError> {
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Bar with a fixed high-low range so the one-bar true range is `range`.
pub fn make_bar(code: &str, date: NaiveDate, close: f64, range: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        date,
        open: close,
        high: close,
        low: close - range,
        close,
        volume: 1000,
    }
}

/// Consecutive daily bars from 2024-01-01 with the given closes.
pub fn bars_from_closes(code: &str, closes: &[f64], range: f64) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(code, date(2024, 1, 1) + chrono::Duration::days(i as i64), c, range))
        .collect()
}

/// A steady uptrend from `start_price`, one point per day.
pub fn generate_bars(code: &str, start: NaiveDate, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| OhlcvBar {
            code: code.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: start_price + i as f64,
            high: start_price + i as f64 + 1.0,
            low: start_price + i as f64 - 1.0,
            close: start_price + i as f64,
            volume: 1000,
        })
        .collect()
}

pub fn make_code_data(code: &str, bars: Vec<OhlcvBar>) -> CodeData {
    CodeData::new(code.to_string(), bars)
}

/// Short windows, instantaneous N, longs only.
pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: date(2020, 1, 1),
        end_date: date(2030, 12, 31),
        initial_capital: 100_000.0,
        s1: BreakoutWindows { entry: 3, exit: 4 },
        s2: BreakoutWindows { entry: 50, exit: 50 },
        atr_periods: 1,
        allow_shorting: false,
        ..BacktestConfig::default()
    }
}
