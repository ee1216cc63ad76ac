//! Account state, daily snapshots and the recorded history.

use chrono::NaiveDate;

use super::error::TurtleError;
use super::position::Position;
use super::strategy::Subsystem;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Fixed-shape table of positions keyed by (subsystem, instrument index).
/// `None` means flat.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionBook {
    instruments: usize,
    slots: Vec<Option<Position>>,
}

impl PositionBook {
    pub fn new(instruments: usize) -> Self {
        PositionBook {
            instruments,
            slots: vec![None; Subsystem::ALL.len() * instruments],
        }
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments
    }

    fn slot(&self, subsystem: Subsystem, instrument: usize) -> usize {
        assert!(instrument < self.instruments, "instrument index out of range");
        subsystem.index() * self.instruments + instrument
    }

    pub fn get(&self, subsystem: Subsystem, instrument: usize) -> Option<Position> {
        self.slots[self.slot(subsystem, instrument)]
    }

    pub fn set(&mut self, subsystem: Subsystem, instrument: usize, position: Option<Position>) {
        let idx = self.slot(subsystem, instrument);
        self.slots[idx] = position;
    }

    pub fn open_positions(&self) -> impl Iterator<Item = (Subsystem, usize, &Position)> + '_ {
        Subsystem::ALL.into_iter().flat_map(move |s| {
            (0..self.instruments).filter_map(move |i| {
                self.slots[s.index() * self.instruments + i]
                    .as_ref()
                    .map(|p| (s, i, p))
            })
        })
    }

    /// Sum of mark values across every open position.
    pub fn open_value(&self) -> f64 {
        self.slots.iter().flatten().map(|p| p.value).sum()
    }
}

/// One recorded day: every pair's position plus end-of-day cash.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub positions: PositionBook,
}

impl Snapshot {
    pub fn portfolio_value(&self) -> f64 {
        self.cash + self.positions.open_value()
    }
}

/// Mutable per-run accounting state.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub initial_capital: f64,
    /// Recomputed once per day after every pair has been processed.
    pub portfolio_value: f64,
    /// Per instrument: the last S1 exit was a win, so skip the next S1 entry.
    pub last_s1_win: Vec<bool>,
}

impl Account {
    pub fn new(initial_capital: f64, instruments: usize) -> Self {
        Account {
            cash: initial_capital,
            initial_capital,
            portfolio_value: initial_capital,
            last_s1_win: vec![false; instruments],
        }
    }

    /// Snapshot the book, refresh `portfolio_value` and append the day to
    /// `history`. A NaN portfolio value aborts with the snapshot attached.
    pub fn close_day(
        &mut self,
        date: NaiveDate,
        book: &PositionBook,
        history: &mut History,
    ) -> Result<(), TurtleError> {
        let snapshot = Snapshot {
            date,
            cash: self.cash,
            positions: book.clone(),
        };
        let value = snapshot.portfolio_value();
        if value.is_nan() {
            return Err(TurtleError::InvalidPortfolioValue {
                date,
                value,
                snapshot: Box::new(snapshot),
            });
        }
        self.portfolio_value = value;
        history.snapshots.push(snapshot);
        Ok(())
    }
}

/// Append-only day-by-day record of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub codes: Vec<String>,
    pub snapshots: Vec<Snapshot>,
}

impl History {
    pub fn new(codes: Vec<String>) -> Self {
        History {
            codes,
            snapshots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        self.snapshots
            .iter()
            .map(|s| EquityPoint {
                date: s.date,
                equity: s.portfolio_value(),
            })
            .collect()
    }

    /// Daily position (or flat) of a single pair.
    pub fn position_series(
        &self,
        subsystem: Subsystem,
        instrument: usize,
    ) -> Vec<(NaiveDate, Option<Position>)> {
        self.snapshots
            .iter()
            .map(|s| (s.date, s.positions.get(subsystem, instrument)))
            .collect()
    }
}
