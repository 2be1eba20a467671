//! Price source trait and structured error types.
//!
//! Acquisition and persistence live outside the engine. A `PriceSource` hands the
//! feed one ascending series of `(date, close)` points per symbol; where those
//! points come from (CSV, database, network) is the implementor's business.

use crate::domain::PricePoint;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("I/O error reading '{symbol}': {reason}")]
    Io { symbol: String, reason: String },

    #[error("malformed data for '{symbol}': {reason}")]
    Parse { symbol: String, reason: String },
}

/// Narrow interface to the data acquisition layer.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// All available close observations for `symbol`, sorted ascending by date,
    /// at most one per date.
    fn load(&self, symbol: &str) -> Result<Vec<PricePoint>, SourceError>;
}

/// Source backed by series already held in memory (tests, synthetic data).
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    series: HashMap<String, Vec<PricePoint>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        self.series.insert(symbol.into(), points);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, points: Vec<PricePoint>) {
        self.series.insert(symbol.into(), points);
    }
}

impl PriceSource for InMemorySource {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn load(&self, symbol: &str) -> Result<Vec<PricePoint>, SourceError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                symbol: symbol.to_string(),
            })
    }
}
