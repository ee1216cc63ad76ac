//! Average True Range, the Turtle volatility measure `N`.
//!
//! ATR(n)[i] = sum(TR[i-j] for j in 0..n) / n, with TR taken from a single
//! bar (see `OhlcvBar::true_range`). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let tr_values: Vec<f64> = bars.iter().map(OhlcvBar::true_range).collect();
    let mut values = Vec::with_capacity(bars.len());
    let warmup = period.saturating_sub(1);

    for i in 0..bars.len() {
        let mean = if period > 0 && i >= warmup {
            let window = &tr_values[i + 1 - period..=i];
            let sum: f64 = window.iter().sum();
            Some(sum / period as f64).filter(|v| v.is_finite())
        } else {
            None
        };

        values.push(IndicatorPoint {
            date: bars[i].date,
            valid: mean.is_some(),
            value: mean.unwrap_or(0.0),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
