//! Closed-trade log derived from the recorded history.

use chrono::NaiveDate;

use super::backtest::PreparedUniverse;
use super::portfolio::History;
use super::position::Direction;
use super::strategy::Subsystem;

/// One exit (or trim): a day on which a pair's share count fell.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub subsystem: Subsystem,
    pub code: String,
    pub direction: Direction,
    pub units: u32,
    /// Average entry on the day before the exit.
    pub entry_price: f64,
    /// Close on the exit day.
    pub exit_price: f64,
    /// Shares held the day before the exit.
    pub shares: u64,
    /// `exit_price / entry_price - 1`, not sign-adjusted for shorts.
    pub return_pct: f64,
}

impl Transaction {
    pub fn is_win(&self) -> bool {
        match self.direction {
            Direction::Long => self.exit_price > self.entry_price,
            Direction::Short => self.exit_price < self.entry_price,
        }
    }

    pub fn is_loss(&self) -> bool {
        match self.direction {
            Direction::Long => self.exit_price < self.entry_price,
            Direction::Short => self.exit_price > self.entry_price,
        }
    }
}

/// Walk every pair's daily position table (S1 pairs first, instruments in
/// universe order) and emit a record wherever shares drop from the prior day.
pub fn extract_transactions(history: &History, universe: &PreparedUniverse) -> Vec<Transaction> {
    let mut out = Vec::new();
    for subsystem in Subsystem::ALL {
        for (i, code) in history.codes.iter().enumerate() {
            let series = history.position_series(subsystem, i);
            for pair in series.windows(2) {
                let (Some(prev), (date, today)) = (pair[0].1, pair[1]) else {
                    continue;
                };
                let today_shares = today.map_or(0, |p| p.shares);
                if today_shares >= prev.shares {
                    continue;
                }
                let Some(exit_price) = universe.close(i, date) else {
                    continue;
                };
                out.push(Transaction {
                    date,
                    subsystem,
                    code: code.clone(),
                    direction: prev.direction(),
                    units: prev.units,
                    entry_price: prev.entry_price,
                    exit_price,
                    shares: prev.shares,
                    return_pct: exit_price / prev.entry_price - 1.0,
                });
            }
        }
    }
    out
}

/// Win/loss counts over a transaction log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeStats {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub win_rate: f64,
}

impl TradeStats {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let total = transactions.len();
        let won = transactions.iter().filter(|t| t.is_win()).count();
        let lost = transactions.iter().filter(|t| t.is_loss()).count();
        let win_rate = if total > 0 {
            won as f64 / total as f64
        } else {
            0.0
        };
        TradeStats {
            total,
            won,
            lost,
            win_rate,
        }
    }
}
