//! Per-instrument series, unified timeline and forward-fill alignment.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::{
    entry_long_type, entry_short_type, exit_long_type, exit_short_type, BreakoutLevels,
};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::strategy::BreakoutWindows;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct CodeData {
    pub code: String,
    pub ohlcv: Vec<OhlcvBar>,
    pub indicators: HashMap<IndicatorType, IndicatorSeries>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl CodeData {
    pub fn new(code: String, ohlcv: Vec<OhlcvBar>) -> Self {
        let date_index = ohlcv
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            code,
            ohlcv,
            indicators: HashMap::new(),
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.ohlcv.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.ohlcv[i])
    }

    pub fn get_bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn indicator_at(&self, indicator_type: &IndicatorType, i: usize) -> Option<f64> {
        self.indicators.get(indicator_type)?.value_at(i)
    }

    /// The volatility measure `N` at bar `i`.
    pub fn n_at(&self, atr_periods: usize, i: usize) -> Option<f64> {
        self.indicator_at(&IndicatorType::Atr(atr_periods), i)
    }

    pub fn breakout_levels(
        &self,
        windows: BreakoutWindows,
        allow_shorting: bool,
        i: usize,
    ) -> BreakoutLevels {
        let mut levels = BreakoutLevels {
            entry_long: self.indicator_at(&entry_long_type(windows), i),
            exit_long: self.indicator_at(&exit_long_type(windows), i),
            ..BreakoutLevels::default()
        };
        if allow_shorting {
            levels.entry_short = self.indicator_at(&entry_short_type(windows), i);
            levels.exit_short = self.indicator_at(&exit_short_type(windows), i);
        }
        levels
    }
}

pub fn build_unified_timeline(codes: &[CodeData]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = codes
        .iter()
        .flat_map(|cd| cd.ohlcv.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}

/// Align an instrument to `timeline`, carrying the last known bar forward
/// over dates it lacks. Dates before its first bar stay absent. A bar with
/// a non-finite close takes the previous bar's prices.
///
/// Indicators are dropped; recompute them on the aligned bars.
pub fn forward_fill(code_data: &CodeData, timeline: &[NaiveDate]) -> CodeData {
    let mut filled: Vec<OhlcvBar> = Vec::with_capacity(timeline.len());
    let mut last_priced: Option<OhlcvBar> = None;

    for &date in timeline {
        let carried = last_priced.as_ref().map(|prev| OhlcvBar {
            date,
            ..prev.clone()
        });
        let bar = match code_data.get_bar(date) {
            Some(bar) if bar.has_price() => bar.clone(),
            Some(bar) => carried.unwrap_or_else(|| bar.clone()),
            None => match carried {
                Some(bar) => bar,
                None => continue,
            },
        };
        if bar.has_price() {
            last_priced = Some(bar.clone());
        }
        filled.push(bar);
    }

    CodeData::new(code_data.code.clone(), filled)
}
