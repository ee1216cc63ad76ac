//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// max(|high - low|, |close - low|, |low - close|)
    ///
    /// Single-bar range: the previous close plays no part.
    pub fn true_range(&self) -> f64 {
        let hl = (self.high - self.low).abs();
        let cl = (self.close - self.low).abs();
        let lc = (self.low - self.close).abs();
        hl.max(cl).max(lc)
    }

    /// A close that can drive decisions. NaN or infinite closes are data gaps.
    pub fn has_price(&self) -> bool {
        self.close.is_finite()
    }
}
