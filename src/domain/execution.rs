//! Per-pair entry, pyramid and exit decisions.
//!
//! Each (subsystem, instrument) pair is a small state machine: flat, or
//! open long/short with 1..=unit_limit units. One call decides one pair for
//! one day and settles the resulting cash movement on the account. All
//! fills happen at the day's close.

use chrono::NaiveDate;

use super::backtest::BacktestConfig;
use super::error::TurtleError;
use super::indicator_helpers::BreakoutLevels;
use super::portfolio::Account;
use super::position::{Direction, Position};
use super::sizing::{check_cash_balance, size_position, unit_risk_budget};
use super::strategy::Subsystem;

/// Everything one pair needs to know about the current day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayInput {
    pub date: NaiveDate,
    /// Close, or `None` on a data gap.
    pub price: Option<f64>,
    /// Volatility `N`, or `None` while the ATR window is filling.
    pub n: Option<f64>,
    pub levels: BreakoutLevels,
}

/// Identifies the pair being stepped.
#[derive(Debug, Clone, Copy)]
pub struct Pair<'a> {
    pub subsystem: Subsystem,
    pub instrument: usize,
    pub code: &'a str,
}

/// Advance one pair by one day and return its next position.
///
/// A missing price or unready `N` leaves the position untouched (no mark
/// refresh). Exit is evaluated before pyramiding; the two never happen on
/// the same day.
pub fn run_system(
    account: &mut Account,
    config: &BacktestConfig,
    pair: Pair<'_>,
    day: &DayInput,
    position: Option<Position>,
) -> Result<Option<Position>, TurtleError> {
    let Some(price) = day.price.filter(|p| p.is_finite()) else {
        return Ok(position);
    };
    let Some(n) = day.n else {
        return Ok(position);
    };

    match position {
        None => try_enter(account, config, pair, day, price, n),
        Some(mut pos) => {
            if exit_signal(&pos, &day.levels, price) {
                account.cash += pos.shares as f64 * price;
                if pair.subsystem == Subsystem::S1 {
                    account.last_s1_win[pair.instrument] = pos.is_winning_exit(price);
                }
                return Ok(None);
            }

            if pos.units < config.unit_limit && pos.pyramid_due(price) {
                let shares = unit_shares(account, config, pair.subsystem, price, n);
                if shares > 0 {
                    account.cash -= shares as f64 * price;
                    verify_cash(account, pair, day.date)?;
                    pos.add_unit(shares, price, n, config.risk_level);
                }
            }

            pos.mark(price);
            Ok(Some(pos))
        }
    }
}

fn try_enter(
    account: &mut Account,
    config: &BacktestConfig,
    pair: Pair<'_>,
    day: &DayInput,
    price: f64,
    n: f64,
) -> Result<Option<Position>, TurtleError> {
    let direction = if day.levels.entry_long == Some(price) {
        Direction::Long
    } else if config.allow_shorting && day.levels.entry_short == Some(price) {
        Direction::Short
    } else {
        return Ok(None);
    };

    if pair.subsystem == Subsystem::S1 && account.last_s1_win[pair.instrument] {
        account.last_s1_win[pair.instrument] = false;
        return Ok(None);
    }

    let shares = unit_shares(account, config, pair.subsystem, price, n);
    if shares == 0 {
        return Ok(None);
    }

    account.cash -= shares as f64 * price;
    verify_cash(account, pair, day.date)?;
    Ok(Some(Position::open(
        direction,
        shares,
        price,
        n,
        config.risk_level,
    )))
}

/// Shares for one new unit: risk-sized, then cut to available cash.
fn unit_shares(
    account: &Account,
    config: &BacktestConfig,
    subsystem: Subsystem,
    price: f64,
    n: f64,
) -> u64 {
    let budget = unit_risk_budget(config, account.portfolio_value, subsystem);
    let sized = size_position(n, price, budget, config.risk_level);
    if sized == 0 {
        return 0;
    }
    check_cash_balance(sized, price, account.cash)
}

fn exit_signal(pos: &Position, levels: &BreakoutLevels, price: f64) -> bool {
    let breakout = if pos.long {
        levels.exit_long
    } else {
        levels.exit_short
    };
    breakout == Some(price) || pos.stop_hit(price)
}

fn verify_cash(account: &Account, pair: Pair<'_>, date: NaiveDate) -> Result<(), TurtleError> {
    if account.cash.is_nan() || account.cash < 0.0 {
        return Err(TurtleError::CashError {
            subsystem: pair.subsystem,
            code: pair.code.to_string(),
            date,
            cash: account.cash,
        });
    }
    Ok(())
}
