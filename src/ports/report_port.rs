//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TurtleError;
use crate::domain::metrics::Metrics;
use crate::domain::transaction::Transaction;

/// Port for persisting the outputs of a run.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        transactions: &[Transaction],
        output_path: &str,
    ) -> Result<(), TurtleError>;
}
