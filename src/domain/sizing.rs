//! Position sizing and risk reduction.
//!
//! A unit risks `r_max` of portfolio value (split between subsystems by
//! allocation), scaled down in steps as the account falls below its
//! initial capital.

use super::backtest::BacktestConfig;
use super::strategy::Subsystem;

/// Fraction of the full risk budget still in force at `portfolio_value`.
///
/// Every full `risk_reduction_level` of capital lost removes another
/// `risk_reduction_rate`. Clamped at zero: a deep enough drawdown stops new
/// risk rather than inverting it.
pub fn risk_scale(config: &BacktestConfig, portfolio_value: f64) -> f64 {
    let capital_loss = 1.0 - portfolio_value / config.initial_capital;
    if capital_loss > config.risk_reduction_level {
        let steps = (capital_loss / config.risk_reduction_level).floor();
        (1.0 - steps * config.risk_reduction_rate).max(0.0)
    } else {
        1.0
    }
}

/// Dollars a single unit may risk for `subsystem` today.
pub fn unit_risk_budget(config: &BacktestConfig, portfolio_value: f64, subsystem: Subsystem) -> f64 {
    let budget = config.r_max * portfolio_value * config.allocation(subsystem);
    budget * risk_scale(config, portfolio_value)
}

/// floor(budget / (risk_level * n * price)). Zero whenever an input is
/// non-positive or non-finite.
pub fn size_position(n: f64, price: f64, budget: f64, risk_level: f64) -> u64 {
    let denominator = risk_level * n * price;
    if !(n > 0.0 && price > 0.0 && budget > 0.0 && denominator > 0.0) {
        return 0;
    }
    let shares = (budget / denominator).floor();
    if shares.is_finite() && shares > 0.0 {
        shares as u64
    } else {
        0
    }
}

/// Shrink `shares` to what `cash` can pay for at `price`.
pub fn check_cash_balance(shares: u64, price: f64, cash: f64) -> u64 {
    if cash <= shares as f64 * price {
        let affordable = (cash / price).floor();
        if !(affordable.is_finite() && affordable > 0.0) {
            return 0;
        }
        let mut affordable = affordable as u64;
        // cash / price may round up onto an integer we cannot quite pay for.
        if affordable as f64 * price > cash {
            affordable -= 1;
        }
        affordable
    } else {
        shares
    }
}
