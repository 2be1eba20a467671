//! Bar feed: replays aligned history one time step per call.
//!
//! The feed owns the shared clock. Each `advance()` pops the next global date,
//! pops exactly one aligned close per symbol, appends a bar to every symbol's
//! bounded history buffer and pushes one `Market` event. If any symbol runs out
//! before the global date axis does, the feed stops for every symbol at once:
//! it never emits a date for which a tracked symbol has no aligned value.

use super::align::forward_fill_align;
use super::source::{PriceSource, SourceError};
use crate::domain::{Bar, Event, MarketEvent, PricePoint};
use crate::engine::queue::EventQueue;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::{debug, info};

/// Bars retained per symbol when no capacity is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Fatal construction errors. A feed that fails to build never starts.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no symbols configured")]
    EmptyUniverse,

    #[error("no data for '{symbol}' after start-date filter")]
    NoData { symbol: String },

    #[error("series for '{symbol}' is not sorted ascending at {date}")]
    Unsorted { symbol: String, date: NaiveDate },

    #[error("series for '{symbol}' has two rows on {date}")]
    DuplicateDate { symbol: String, date: NaiveDate },

    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

/// Construction options for a feed.
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    /// Drop observations before this date (inclusive filter).
    pub start_date: Option<NaiveDate>,
    /// Bounded history length per symbol.
    pub history_capacity: usize,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            start_date: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Read access to the latest known close per symbol.
///
/// The portfolio values and sizes positions through this view, which keeps it
/// testable against a plain price map.
pub trait PriceView {
    fn latest_close(&self, symbol: &str) -> Option<f64>;
}

impl PriceView for HashMap<String, f64> {
    fn latest_close(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).copied()
    }
}

pub struct BarFeed {
    symbols: Vec<String>,
    dates: std::vec::IntoIter<NaiveDate>,
    closes: HashMap<String, std::vec::IntoIter<f64>>,
    history: HashMap<String, VecDeque<Bar>>,
    capacity: usize,
    current_date: Option<NaiveDate>,
    running: bool,
    total_steps: usize,
    steps: usize,
}

impl BarFeed {
    /// Build a feed from raw per-symbol series.
    ///
    /// Every configured symbol must have at least one row on or after
    /// `opts.start_date`; otherwise construction fails with `FeedError::NoData`.
    pub fn new(
        mut series: HashMap<String, Vec<PricePoint>>,
        symbols: &[String],
        opts: FeedOptions,
    ) -> Result<Self, FeedError> {
        if symbols.is_empty() {
            return Err(FeedError::EmptyUniverse);
        }

        for symbol in symbols {
            let points = series.entry(symbol.clone()).or_default();
            if let Some(start) = opts.start_date {
                points.retain(|p| p.date >= start);
            }
            if points.is_empty() {
                return Err(FeedError::NoData {
                    symbol: symbol.clone(),
                });
            }
            validate_series(symbol, points)?;
        }

        let aligned = forward_fill_align(&series, symbols);
        let capacity = opts.history_capacity.max(1);

        info!(
            symbols = symbols.len(),
            steps = aligned.len(),
            first = ?aligned.dates.first(),
            "bar feed ready"
        );

        let total_steps = aligned.len();
        let mut closes = HashMap::with_capacity(symbols.len());
        let mut history = HashMap::with_capacity(symbols.len());
        for (symbol, column) in aligned.closes {
            closes.insert(symbol.clone(), column.into_iter());
            history.insert(symbol, VecDeque::with_capacity(capacity));
        }

        Ok(Self {
            symbols: aligned.symbols,
            dates: aligned.dates.into_iter(),
            closes,
            history,
            capacity,
            current_date: None,
            running: true,
            total_steps,
            steps: 0,
        })
    }

    /// Build a feed by loading every symbol from `source`.
    pub fn from_source(
        source: &dyn PriceSource,
        symbols: &[String],
        opts: FeedOptions,
    ) -> Result<Self, FeedError> {
        let mut series = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let points = source.load(symbol)?;
            debug!(source = source.name(), %symbol, rows = points.len(), "loaded series");
            series.insert(symbol.clone(), points);
        }
        Self::new(series, symbols, opts)
    }

    /// Advance the clock by one step.
    ///
    /// Returns `false` once the feed is exhausted; no event is pushed then.
    /// On success exactly one `Market` event is pushed onto `events`.
    pub fn advance(&mut self, events: &mut EventQueue) -> bool {
        if !self.running {
            return false;
        }

        let Some(date) = self.dates.next() else {
            self.running = false;
            return false;
        };

        // Pop one value per symbol before touching any buffer, so an exhausted
        // symbol stops the whole feed without a half-applied step.
        let mut row = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            match self.closes.get_mut(symbol).and_then(Iterator::next) {
                Some(close) => row.push(close),
                None => {
                    self.running = false;
                    return false;
                }
            }
        }

        for (symbol, close) in self.symbols.iter().zip(row) {
            if let Some(buffer) = self.history.get_mut(symbol) {
                if buffer.len() == self.capacity {
                    buffer.pop_front();
                }
                buffer.push_back(Bar::new(symbol.clone(), date, close));
            }
        }

        self.current_date = Some(date);
        self.steps += 1;
        events.push(Event::Market(MarketEvent { date }));
        true
    }

    /// Most recent bar for `symbol`, if the feed has advanced at least once.
    pub fn latest(&self, symbol: &str) -> Option<&Bar> {
        self.history.get(symbol).and_then(VecDeque::back)
    }

    /// Bounded recent history for `symbol`, oldest first.
    pub fn history(&self, symbol: &str) -> Option<&VecDeque<Bar>> {
        self.history.get(symbol)
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_date
    }

    /// Whether another `advance()` may still succeed.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of successful advances so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of aligned rows the feed was built with.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn history_capacity(&self) -> usize {
        self.capacity
    }
}

impl PriceView for BarFeed {
    fn latest_close(&self, symbol: &str) -> Option<f64> {
        self.latest(symbol).map(|bar| bar.close)
    }
}

fn validate_series(symbol: &str, points: &[PricePoint]) -> Result<(), FeedError> {
    for window in points.windows(2) {
        let (prev, next) = (window[0].date, window[1].date);
        if next == prev {
            return Err(FeedError::DuplicateDate {
                symbol: symbol.to_string(),
                date: next,
            });
        }
        if next < prev {
            return Err(FeedError::Unsorted {
                symbol: symbol.to_string(),
                date: next,
            });
        }
    }
    Ok(())
}
