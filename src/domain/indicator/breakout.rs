//! Breakout channels: rolling extremes of close.
//!
//! MAX(n)[i] = max(C[i-n+1..=i]), MIN(n)[i] = min(C[i-n+1..=i]).
//! Warmup: first (n-1) bars are invalid. A window holding a non-finite
//! close is invalid as well.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rolling_max(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_extreme(bars, period, IndicatorType::Max(period), f64::max)
}

pub fn calculate_rolling_min(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_extreme(bars, period, IndicatorType::Min(period), f64::min)
}

fn rolling_extreme(
    bars: &[OhlcvBar],
    period: usize,
    indicator_type: IndicatorType,
    pick: fn(f64, f64) -> f64,
) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let warmup = period.saturating_sub(1);

    for i in 0..bars.len() {
        let window_full = period > 0 && i >= warmup;
        let extreme = if window_full {
            let window = &bars[i + 1 - period..=i];
            if window.iter().all(|b| b.close.is_finite()) {
                window.iter().map(|b| b.close).reduce(pick)
            } else {
                None
            }
        } else {
            None
        };

        values.push(IndicatorPoint {
            date: bars[i].date,
            valid: extreme.is_some(),
            value: extreme.unwrap_or(0.0),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
