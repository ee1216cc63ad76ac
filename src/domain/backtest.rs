//! Backtest configuration and the portfolio simulation loop.
//!
//! The loop walks the unified timeline in order. For each date, each
//! instrument, and each subsystem (S1 then S2) it steps the pair's state
//! machine, then snapshots every position with end-of-day cash and
//! revalues the portfolio. Cash is one pool shared by every pair, so the
//! pass is strictly sequential.

use chrono::NaiveDate;

use super::code_data::{build_unified_timeline, forward_fill, CodeData};
use super::config_validation::validate_params;
use super::error::TurtleError;
use super::execution::{run_system, DayInput, Pair};
use super::indicator_helpers::{compute_indicators, turtle_indicator_types};
use super::portfolio::{Account, EquityPoint, History, PositionBook};
use super::strategy::{BreakoutWindows, Subsystem};

/// Immutable run parameters. Build once, validate once.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub risk_free_rate: f64,
    /// Stop distance in multiples of `N`.
    pub risk_level: f64,
    /// Fraction of portfolio value one unit may risk.
    pub r_max: f64,
    pub s1: BreakoutWindows,
    pub s2: BreakoutWindows,
    pub atr_periods: usize,
    /// S2 receives the remainder.
    pub s1_allocation: f64,
    pub risk_reduction_rate: f64,
    pub risk_reduction_level: f64,
    pub unit_limit: u32,
    pub allow_shorting: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap_or_default(),
            initial_capital: 10_000.0,
            risk_free_rate: 0.02,
            risk_level: 2.0,
            r_max: 0.02,
            s1: BreakoutWindows { entry: 20, exit: 10 },
            s2: BreakoutWindows { entry: 55, exit: 20 },
            atr_periods: 20,
            s1_allocation: 0.5,
            risk_reduction_rate: 0.1,
            risk_reduction_level: 0.2,
            unit_limit: 5,
            allow_shorting: true,
        }
    }
}

impl BacktestConfig {
    pub fn windows(&self, subsystem: Subsystem) -> BreakoutWindows {
        match subsystem {
            Subsystem::S1 => self.s1,
            Subsystem::S2 => self.s2,
        }
    }

    pub fn allocation(&self, subsystem: Subsystem) -> f64 {
        match subsystem {
            Subsystem::S1 => self.s1_allocation,
            Subsystem::S2 => 1.0 - self.s1_allocation,
        }
    }

    /// Bars needed before every indicator is defined.
    pub fn longest_lookback(&self) -> usize {
        [
            self.s1.entry,
            self.s1.exit,
            self.s2.entry,
            self.s2.exit,
            self.atr_periods,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), TurtleError> {
        validate_params(self)
    }
}

/// Instruments aligned to one timeline with their indicators computed.
#[derive(Debug, Clone)]
pub struct PreparedUniverse {
    pub series: Vec<CodeData>,
    pub timeline: Vec<NaiveDate>,
}

impl PreparedUniverse {
    pub fn codes(&self) -> Vec<String> {
        self.series.iter().map(|cd| cd.code.clone()).collect()
    }

    /// Close of instrument `i` on `date`, if it has a priced bar.
    pub fn close(&self, i: usize, date: NaiveDate) -> Option<f64> {
        self.series
            .get(i)?
            .get_bar(date)
            .filter(|b| b.has_price())
            .map(|b| b.close)
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub history: History,
    pub universe: PreparedUniverse,
    pub final_cash: f64,
    pub final_value: f64,
}

impl BacktestResult {
    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        self.history.equity_curve()
    }
}

/// Align raw instrument data to the union timeline (forward-filled) and
/// compute the indicator set `config` needs.
pub fn prepare_universe(raw: &[CodeData], config: &BacktestConfig) -> PreparedUniverse {
    let timeline = build_unified_timeline(raw);
    let types = turtle_indicator_types(config);
    let series = raw
        .iter()
        .map(|cd| {
            let mut aligned = forward_fill(cd, &timeline);
            aligned.indicators = compute_indicators(&aligned.ohlcv, &types);
            aligned
        })
        .collect();
    PreparedUniverse { series, timeline }
}

/// Validate `config`, prepare `raw`, and simulate.
pub fn run_backtest(
    raw: &[CodeData],
    config: &BacktestConfig,
) -> Result<BacktestResult, TurtleError> {
    config.validate()?;
    let universe = prepare_universe(raw, config);
    simulate(universe, config)
}

/// Simulate over an already prepared universe, restricted to
/// `start_date..=end_date`. The config is validated first.
pub fn simulate(
    universe: PreparedUniverse,
    config: &BacktestConfig,
) -> Result<BacktestResult, TurtleError> {
    config.validate()?;
    let instruments = universe.series.len();
    let mut account = Account::new(config.initial_capital, instruments);
    let mut book = PositionBook::new(instruments);
    let mut history = History::new(universe.codes());

    let dates = universe
        .timeline
        .iter()
        .copied()
        .filter(|d| *d >= config.start_date && *d <= config.end_date);

    for date in dates {
        for (i, cd) in universe.series.iter().enumerate() {
            let bar_index = cd.get_bar_index(date);
            for subsystem in Subsystem::ALL {
                let day = day_input(cd, bar_index, date, subsystem, config);
                let pair = Pair {
                    subsystem,
                    instrument: i,
                    code: &cd.code,
                };
                let next = run_system(&mut account, config, pair, &day, book.get(subsystem, i))?;
                book.set(subsystem, i, next);
            }
        }
        account.close_day(date, &book, &mut history)?;
    }

    Ok(BacktestResult {
        history,
        universe,
        final_cash: account.cash,
        final_value: account.portfolio_value,
    })
}

fn day_input(
    cd: &CodeData,
    bar_index: Option<usize>,
    date: NaiveDate,
    subsystem: Subsystem,
    config: &BacktestConfig,
) -> DayInput {
    match bar_index {
        Some(i) => DayInput {
            date,
            price: Some(cd.ohlcv[i].close).filter(|p| p.is_finite()),
            n: cd.n_at(config.atr_periods, i),
            levels: cd.breakout_levels(config.windows(subsystem), config.allow_shorting, i),
        },
        None => DayInput {
            date,
            price: None,
            n: None,
            levels: Default::default(),
        },
    }
}
