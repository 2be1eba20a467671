//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One close observation for a single symbol, as delivered by a price source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Close bar for a single symbol on a single day.
///
/// Bars are produced by the feed after alignment and are immutable once emitted.
/// A forward-filled bar carries the last observed close of its symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
}

impl Bar {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            close,
        }
    }

    /// A bar can be priced against only if its close is finite and positive.
    pub fn is_tradable(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
