//! Open trade state for one (subsystem, instrument) pair.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "Long"),
            Direction::Short => write!(f, "Short"),
        }
    }
}

/// A position is `Copy`: snapshots hold it by value, so mutating today's
/// position never reaches a recorded day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub units: u32,
    /// Share count, always positive; direction lives in `long`.
    pub shares: u64,
    /// Share-weighted average fill across all units.
    pub entry_price: f64,
    pub stop_price: f64,
    /// `N` at first entry; spacing for pyramid adds.
    pub entry_n: f64,
    pub value: f64,
    pub long: bool,
}

impl Position {
    /// One-unit position filled at `price`, stop `risk_level * n` away.
    pub fn open(direction: Direction, shares: u64, price: f64, n: f64, risk_level: f64) -> Self {
        let long = direction == Direction::Long;
        Position {
            units: 1,
            shares,
            entry_price: price,
            stop_price: stop_for(long, price, n, risk_level),
            entry_n: n,
            value: shares as f64 * price,
            long,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.long {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    pub fn stop_hit(&self, price: f64) -> bool {
        if self.long {
            price <= self.stop_price
        } else {
            price >= self.stop_price
        }
    }

    /// Price has moved one `entry_n` in our favour from the average entry.
    pub fn pyramid_due(&self, price: f64) -> bool {
        if self.long {
            price >= self.entry_price + self.entry_n
        } else {
            price <= self.entry_price - self.entry_n
        }
    }

    /// Exit at `price` is at least break-even against the average entry.
    pub fn is_winning_exit(&self, price: f64) -> bool {
        if self.long {
            price >= self.entry_price
        } else {
            price <= self.entry_price
        }
    }

    /// Add a unit of `shares` filled at `price`. The stop moves to the new
    /// fill using the current `n`; `entry_n` is kept from the first entry.
    pub fn add_unit(&mut self, shares: u64, price: f64, n: f64, risk_level: f64) {
        let old_shares = self.shares as f64;
        let new_shares = shares as f64;
        self.entry_price =
            (self.entry_price * old_shares + price * new_shares) / (old_shares + new_shares);
        self.shares += shares;
        self.stop_price = stop_for(self.long, price, n, risk_level);
        self.units += 1;
    }

    pub fn mark(&mut self, price: f64) {
        self.value = self.shares as f64 * price;
    }
}

fn stop_for(long: bool, price: f64, n: f64, risk_level: f64) -> f64 {
    if long {
        price - risk_level * n
    } else {
        price + risk_level * n
    }
}
