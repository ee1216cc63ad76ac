//! CSV report adapter.
//!
//! Writes three tables into an output directory: `equity.csv` (one row per
//! simulated day), `transactions.csv` (one row per exit) and `summary.csv`
//! (metric/value pairs).

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TurtleError;
use crate::domain::metrics::Metrics;
use crate::domain::position::Direction;
use crate::domain::transaction::{TradeStats, Transaction};
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const EQUITY_FILE: &str = "equity.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct EquityRow {
    date: String,
    cash: f64,
    positions: f64,
    equity: f64,
}

#[derive(Serialize)]
struct TransactionRow<'a> {
    date: String,
    system: String,
    code: &'a str,
    direction: Direction,
    units: u32,
    entry_price: f64,
    exit_price: f64,
    shares: u64,
    #[serde(rename = "return")]
    return_pct: f64,
}

#[derive(Serialize)]
struct SummaryRow {
    metric: &'static str,
    value: String,
}

fn write_err(path: &Path, e: csv::Error) -> TurtleError {
    TurtleError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), TurtleError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| write_err(path, e))?;
    for row in rows {
        wtr.serialize(row).map_err(|e| write_err(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

fn summary_rows(result: &BacktestResult, metrics: &Metrics, stats: &TradeStats) -> Vec<SummaryRow> {
    let row = |metric, value: String| SummaryRow { metric, value };
    vec![
        row("total_return", format!("{:.6}", metrics.total_return)),
        row("annual_return", format!("{:.6}", metrics.annual_return)),
        row("annual_volatility", format!("{:.6}", metrics.annual_volatility)),
        row("sharpe_ratio", format!("{:.6}", metrics.sharpe_ratio)),
        row("sortino_ratio", format!("{:.6}", metrics.sortino_ratio)),
        row("max_drawdown", format!("{:.6}", metrics.max_drawdown)),
        row("max_drawdown_duration", metrics.max_drawdown_duration.to_string()),
        row("final_cash", format!("{:.2}", result.final_cash)),
        row("final_value", format!("{:.2}", result.final_value)),
        row("total_trades", stats.total.to_string()),
        row("trades_won", stats.won.to_string()),
        row("trades_lost", stats.lost.to_string()),
        row("win_rate", format!("{:.6}", stats.win_rate)),
    ]
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        transactions: &[Transaction],
        output_path: &str,
    ) -> Result<(), TurtleError> {
        let dir = Path::new(output_path);
        fs::create_dir_all(dir)?;

        let equity = result.history.snapshots.iter().map(|s| {
            let positions = s.positions.open_value();
            EquityRow {
                date: s.date.to_string(),
                cash: s.cash,
                positions,
                equity: s.cash + positions,
            }
        });
        write_rows(&dir.join(EQUITY_FILE), equity)?;

        let txs = transactions.iter().map(|t| TransactionRow {
            date: t.date.to_string(),
            system: t.subsystem.to_string(),
            code: &t.code,
            direction: t.direction,
            units: t.units,
            entry_price: t.entry_price,
            exit_price: t.exit_price,
            shares: t.shares,
            return_pct: t.return_pct,
        });
        write_rows(&dir.join(TRANSACTIONS_FILE), txs)?;

        let stats = TradeStats::from_transactions(transactions);
        write_rows(&dir.join(SUMMARY_FILE), summary_rows(result, metrics, &stats))?;

        Ok(())
    }
}
