//! Indicator set selection and dispatch.

use std::collections::{HashMap, HashSet};

use crate::domain::backtest::BacktestConfig;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::breakout::{calculate_rolling_max, calculate_rolling_min};
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::strategy::{BreakoutWindows, Subsystem};

/// Breakout levels for one subsystem on one bar. `None` until the
/// lookback window is full; short-side levels stay `None` when shorting is
/// disabled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BreakoutLevels {
    pub entry_long: Option<f64>,
    pub exit_long: Option<f64>,
    pub entry_short: Option<f64>,
    pub exit_short: Option<f64>,
}

pub fn entry_long_type(windows: BreakoutWindows) -> IndicatorType {
    IndicatorType::Max(windows.entry)
}

pub fn exit_long_type(windows: BreakoutWindows) -> IndicatorType {
    IndicatorType::Min(windows.exit)
}

pub fn entry_short_type(windows: BreakoutWindows) -> IndicatorType {
    IndicatorType::Min(windows.entry)
}

pub fn exit_short_type(windows: BreakoutWindows) -> IndicatorType {
    IndicatorType::Max(windows.exit)
}

/// Every indicator the simulation reads for the given configuration.
/// Shared lookbacks collapse to a single series.
pub fn turtle_indicator_types(config: &BacktestConfig) -> Vec<IndicatorType> {
    let mut seen = HashSet::new();
    let mut types = Vec::new();

    for subsystem in Subsystem::ALL {
        let windows = config.windows(subsystem);
        let mut wanted = vec![entry_long_type(windows), exit_long_type(windows)];
        if config.allow_shorting {
            wanted.push(entry_short_type(windows));
            wanted.push(exit_short_type(windows));
        }
        for t in wanted {
            if seen.insert(t.clone()) {
                types.push(t);
            }
        }
    }

    let atr = IndicatorType::Atr(config.atr_periods);
    if seen.insert(atr.clone()) {
        types.push(atr);
    }
    types
}

pub fn compute_indicators(
    bars: &[OhlcvBar],
    types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    types
        .iter()
        .map(|t| {
            let series = match t {
                IndicatorType::Max(period) => calculate_rolling_max(bars, *period),
                IndicatorType::Min(period) => calculate_rolling_min(bars, *period),
                IndicatorType::Atr(period) => calculate_atr(bars, *period),
            };
            (t.clone(), series)
        })
        .collect()
}
