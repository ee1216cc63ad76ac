//! Performance statistics over the daily log-return series.

use super::portfolio::EquityPoint;
use chrono::NaiveDate;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary record of one run. Ratios that are undefined (no variance, no
/// negative days, fewer than two points) are reported as `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Calendar days.
    pub max_drawdown_duration: i64,
}

impl Metrics {
    pub fn compute(equity_curve: &[EquityPoint], risk_free_rate: f64) -> Self {
        let returns = log_returns(equity_curve);
        if returns.is_empty() {
            return Metrics {
                total_return: 0.0,
                annual_return: 0.0,
                annual_volatility: 0.0,
                sharpe_ratio: 0.0,
                sortino_ratio: 0.0,
                max_drawdown: 0.0,
                max_drawdown_duration: 0,
            };
        }

        let values: Vec<f64> = returns.iter().map(|(_, r)| *r).collect();
        let total_return = values.iter().sum::<f64>().exp() - 1.0;
        let annual_return = (mean(&values) * TRADING_DAYS_PER_YEAR).exp() - 1.0;
        let annual_volatility = sample_stddev(&values) * TRADING_DAYS_PER_YEAR.sqrt();

        let downside: Vec<f64> = values.iter().copied().filter(|r| *r < 0.0).collect();
        let annual_downside = sample_stddev(&downside) * TRADING_DAYS_PER_YEAR.sqrt();

        let excess = annual_return - risk_free_rate;
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&returns);

        Metrics {
            total_return,
            annual_return,
            annual_volatility,
            sharpe_ratio: ratio(excess, annual_volatility),
            sortino_ratio: ratio(excess, annual_downside),
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

/// Daily `ln(v_t / v_{t-1})`, dated by the later day. A non-positive
/// equity value on either side contributes a zero return.
pub fn log_returns(equity_curve: &[EquityPoint]) -> Vec<(NaiveDate, f64)> {
    equity_curve
        .windows(2)
        .map(|w| {
            let (prev, curr) = (w[0].equity, w[1].equity);
            let r = if prev > 0.0 && curr > 0.0 {
                (curr / prev).ln()
            } else {
                0.0
            };
            (w[1].date, r)
        })
        .collect()
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); zero below two values.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Peak-to-trough drawdown of the cumulative log return, as a price ratio,
/// and the longest calendar gap between days sitting at a running peak
/// (the open stretch after the last peak counts too).
fn compute_drawdown(returns: &[(NaiveDate, f64)]) -> (f64, i64) {
    let mut cumulative = 0.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut deepest = 0.0_f64;
    let mut last_peak_date: Option<NaiveDate> = None;
    let mut longest = 0i64;

    for &(date, r) in returns {
        cumulative += r;
        if cumulative >= peak {
            peak = cumulative;
            if let Some(prev) = last_peak_date {
                longest = longest.max((date - prev).num_days());
            }
            last_peak_date = Some(date);
        } else {
            deepest = deepest.max(peak - cumulative);
        }
    }

    if let (Some(last), Some(&(end, _))) = (last_peak_date, returns.last()) {
        longest = longest.max((end - last).num_days());
    }

    (1.0 - (-deepest).exp(), longest)
}
